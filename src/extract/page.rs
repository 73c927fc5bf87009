// src/extract/page.rs

//! Markup extraction strategy.
//!
//! Pulls the first matching entry out of listing markup using configured
//! CSS selectors. Title and link are required; the date degrades to
//! `"Unknown"` when the source omits it.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Item, PageSelectors};
use crate::utils::resolve_url;

use super::ContentExtractor;

/// Extracts an [`Item`] from listing-page markup.
pub struct PageExtractor {
    base: Url,
    row: Selector,
    title: Selector,
    link: Selector,
    link_attr: String,
    date: Selector,
    date_label: String,
}

impl PageExtractor {
    /// Build an extractor, parsing all configured selectors up front.
    pub fn new(selectors: &PageSelectors, base_url: &str) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base_url)?,
            row: Self::parse_selector(&selectors.row_selector)?,
            title: Self::parse_selector(&selectors.title_selector)?,
            link: Self::parse_selector(&selectors.link_selector)?,
            link_attr: selectors.link_attr.clone(),
            date: Self::parse_selector(&selectors.date_selector)?,
            date_label: selectors.date_label.clone(),
        })
    }

    /// Extract from an entry fragment rather than a full document.
    ///
    /// Used for the markup fragments embedded in API records. The fragment
    /// may or may not carry the row wrapper element itself.
    pub fn extract_fragment(&self, fragment: &str) -> Result<Item> {
        let document = Html::parse_fragment(fragment);
        let root = document.root_element();
        match root.select(&self.row).next() {
            Some(entry) => self.extract_entry(&entry),
            None => self.extract_entry(&root),
        }
    }

    /// Resolve a possibly-relative href against the source's base URL.
    pub fn resolve(&self, href: &str) -> String {
        resolve_url(&self.base, href)
    }

    fn extract_entry(&self, entry: &ElementRef) -> Result<Item> {
        let title = entry
            .select(&self.title)
            .next()
            .map(|el| el.text().collect::<String>())
            .ok_or_else(|| AppError::extract("entry has no title heading"))?;

        let href = entry
            .select(&self.link)
            .find_map(|el| el.value().attr(&self.link_attr))
            .ok_or_else(|| AppError::extract("entry has no link"))?;
        let link = self.resolve(href);

        // Date lookup is independent of title/link: first a time-like
        // element, then the text following the configured label.
        let date = entry
            .select(&self.date)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.date_after_label(entry))
            .unwrap_or_default();

        Item::new(title, link, date)
    }

    fn date_after_label(&self, entry: &ElementRef) -> Option<String> {
        if self.date_label.is_empty() {
            return None;
        }
        let text: String = entry.text().collect::<Vec<_>>().join("\n");
        let idx = text.find(&self.date_label)?;
        let after = &text[idx + self.date_label.len()..];
        after
            .trim_start_matches([':', ' ', '\t', '\n', '\r'])
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

impl ContentExtractor for PageExtractor {
    fn extract(&self, raw: &str) -> Result<Item> {
        let document = Html::parse_document(raw);
        let entry = document
            .select(&self.row)
            .next()
            .ok_or_else(|| AppError::extract("no entry matched the row selector"))?;
        self.extract_entry(&entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageSelectors, UNKNOWN_DATE};

    fn extractor() -> PageExtractor {
        PageExtractor::new(&PageSelectors::default(), "https://example.org").unwrap()
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(PageExtractor::parse_selector("li.views-row").is_ok());
        assert!(PageExtractor::parse_selector("tr:has(a)").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(PageExtractor::parse_selector("[[invalid").is_err());
    }

    #[test]
    fn extracts_first_entry_from_document() {
        let html = r#"
            <html><body><ul>
              <li class="views-row">
                <h3><a href="/pubs/outlook-2025">Energy Market Outlook 2025</a></h3>
                <span>Published date</span> <time>31 August 2025</time>
              </li>
              <li class="views-row">
                <h3><a href="/pubs/older">Older Report</a></h3>
              </li>
            </ul></body></html>
        "#;
        let item = extractor().extract(html).unwrap();
        assert_eq!(item.title, "Energy Market Outlook 2025");
        assert_eq!(item.link, "https://example.org/pubs/outlook-2025");
        assert_eq!(item.date, "31 August 2025");
    }

    #[test]
    fn resolves_relative_links_against_base() {
        let html = r#"<li class="views-row"><h3><a href="/pubs/1">Report</a></h3></li>"#;
        let item = extractor().extract_fragment(html).unwrap();
        assert_eq!(item.link, "https://example.org/pubs/1");
    }

    #[test]
    fn missing_date_yields_unknown() {
        let html = r#"<li class="views-row"><h3><a href="/pubs/1">Report</a></h3></li>"#;
        let item = extractor().extract_fragment(html).unwrap();
        assert_eq!(item.date, UNKNOWN_DATE);
    }

    #[test]
    fn date_falls_back_to_label_text() {
        let html = r#"
            <li class="views-row">
              <h3><a href="/pubs/1">Report</a></h3>
              <div><span>Published date:</span> 12 March 2025</div>
            </li>
        "#;
        let item = extractor().extract_fragment(html).unwrap();
        assert_eq!(item.date, "12 March 2025");
    }

    #[test]
    fn missing_title_is_an_error() {
        let html = r#"<li class="views-row"><a href="/pubs/1">no heading</a></li>"#;
        assert!(extractor().extract_fragment(html).is_err());
    }

    #[test]
    fn missing_link_is_an_error() {
        let html = r#"<li class="views-row"><h3>Report</h3></li>"#;
        assert!(extractor().extract_fragment(html).is_err());
    }

    #[test]
    fn no_matching_row_is_an_error() {
        let html = "<html><body><p>maintenance page</p></body></html>";
        assert!(extractor().extract(html).is_err());
    }

    #[test]
    fn fragment_without_row_wrapper_still_extracts() {
        let html = r#"<h3><a href="https://example.org/pubs/2">Bare Fragment</a></h3>"#;
        let item = extractor().extract_fragment(html).unwrap();
        assert_eq!(item.title, "Bare Fragment");
    }
}
