//! Publication item data structure.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Display text used when a publication date cannot be determined.
pub const UNKNOWN_DATE: &str = "Unknown";

/// Separator for the identity key. Not expected to occur in titles or URLs
/// in a way that would make two distinct items collide.
const IDENTITY_SEPARATOR: char = '|';

/// The single most-recent publication fetched from the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Publication title
    pub title: String,

    /// Full URL to the publication
    pub link: String,

    /// Publication date as displayed by the source ("Unknown" if absent)
    pub date: String,
}

impl Item {
    /// Build an item, enforcing the validity invariant: both title and link
    /// must be non-empty. An empty date falls back to [`UNKNOWN_DATE`].
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        date: impl Into<String>,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        let link = link.into().trim().to_string();
        let date = date.into().trim().to_string();

        if title.is_empty() {
            return Err(AppError::extract("item has an empty title"));
        }
        if link.is_empty() {
            return Err(AppError::extract("item has an empty link"));
        }

        let date = if date.is_empty() {
            UNKNOWN_DATE.to_string()
        } else {
            date
        };

        Ok(Self { title, link, date })
    }

    /// Stable equality fingerprint. The date is deliberately excluded so a
    /// source correcting only its displayed date does not read as a new item.
    pub fn identity_key(&self) -> String {
        format!("{}{}{}", self.title, IDENTITY_SEPARATOR, self.link)
    }

    /// Whether two items are the same publication.
    pub fn same_as(&self, other: &Item) -> bool {
        self.identity_key() == other.identity_key()
    }
}
