// src/detect.rs

//! Change classification and the relevance filter.
//!
//! `classify` decides whether the fetched item is new; the filter decides
//! whether a new item is worth alerting on. The two outcomes are kept
//! independent: a changed-but-filtered item still advances the baseline.

use crate::models::Item;

/// Outcome of comparing the fetched item against the stored baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// No baseline exists yet (first run, or state was lost)
    FirstObservation,
    /// Same identity key as the baseline
    Unchanged,
    /// Different identity key from the baseline
    Changed,
}

impl Change {
    /// Whether this outcome makes the current item the new baseline.
    pub fn is_new(&self) -> bool {
        matches!(self, Change::FirstObservation | Change::Changed)
    }
}

/// Classify the fetched item against the previous baseline.
///
/// Pure comparison on identity keys; the date never participates, so a
/// source correcting only its displayed date classifies as `Unchanged`.
pub fn classify(current: &Item, previous: Option<&Item>) -> Change {
    match previous {
        None => Change::FirstObservation,
        Some(prev) if current.same_as(prev) => Change::Unchanged,
        Some(_) => Change::Changed,
    }
}

/// Keyword gate deciding whether a new item triggers a notification.
///
/// An empty keyword set means every new item is notifiable.
#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive substring match of the title against any keyword.
    pub fn is_notifiable(&self, item: &Item) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let title = item.title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k))
    }
}
