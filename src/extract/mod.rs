// src/extract/mod.rs

//! Item extraction strategies.
//!
//! Raw source content arrives in two shapes: a structured API response
//! (primary channel) and free-form listing markup (secondary channel).
//! Both strategies produce the same [`Item`] or report failure; neither
//! is allowed to yield a partially-populated item.

mod api;
mod page;

pub use api::ApiExtractor;
pub use page::PageExtractor;

use crate::error::Result;
use crate::models::Item;

/// Turns raw source content into the latest [`Item`].
pub trait ContentExtractor {
    fn extract(&self, raw: &str) -> Result<Item>;
}
