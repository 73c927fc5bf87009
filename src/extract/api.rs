// src/extract/api.rs

//! Structured extraction strategy.
//!
//! Maps the first record of the API response to an [`Item`]. Records either
//! carry the fields directly or embed an entity-escaped markup fragment of
//! the entry, in which case extraction is delegated to [`PageExtractor`].

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ApiFields, Item};
use crate::utils::entities;

use super::{ContentExtractor, PageExtractor};

/// Extracts an [`Item`] from a structured API response.
pub struct ApiExtractor {
    fields: ApiFields,
    page: PageExtractor,
}

impl ApiExtractor {
    pub fn new(fields: ApiFields, page: PageExtractor) -> Self {
        Self { fields, page }
    }

    /// The first record of the response, honoring the configured array key.
    fn first_record<'a>(&self, value: &'a Value) -> Result<&'a Value> {
        let records = if self.fields.records.is_empty() {
            value
        } else {
            value.get(&self.fields.records).ok_or_else(|| {
                AppError::extract(format!(
                    "response has no '{}' field",
                    self.fields.records
                ))
            })?
        };

        match records {
            Value::Array(entries) => entries
                .first()
                .ok_or_else(|| AppError::extract("response contains no records")),
            record @ Value::Object(_) => Ok(record),
            _ => Err(AppError::extract("records field is neither array nor object")),
        }
    }
}

impl ContentExtractor for ApiExtractor {
    fn extract(&self, raw: &str) -> Result<Item> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::extract(format!("response is not valid JSON: {e}")))?;
        let record = self.first_record(&value)?;

        // Direct field mapping takes precedence over the embedded fragment.
        let title = record.get(&self.fields.title).and_then(Value::as_str);
        let link = record.get(&self.fields.link).and_then(Value::as_str);
        if let (Some(title), Some(link)) = (title, link) {
            let date = record
                .get(&self.fields.date)
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Item::new(title, self.page.resolve(link), date);
        }

        if let Some(fragment) = record.get(&self.fields.fragment).and_then(Value::as_str) {
            return self.page.extract_fragment(&entities::decode(fragment));
        }

        Err(AppError::extract(
            "record has neither title/link fields nor a markup fragment",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageSelectors, UNKNOWN_DATE};

    fn extractor() -> ApiExtractor {
        let page = PageExtractor::new(&PageSelectors::default(), "https://example.org").unwrap();
        ApiExtractor::new(ApiFields::default(), page)
    }

    #[test]
    fn maps_direct_fields() {
        let raw = r#"{
            "results": [
                {"title": "Energy Market Outlook 2025",
                 "url": "/pubs/outlook-2025",
                 "date": "31 August 2025"},
                {"title": "Older", "url": "/pubs/older", "date": "1 May 2024"}
            ]
        }"#;
        let item = extractor().extract(raw).unwrap();
        assert_eq!(item.title, "Energy Market Outlook 2025");
        assert_eq!(item.link, "https://example.org/pubs/outlook-2025");
        assert_eq!(item.date, "31 August 2025");
    }

    #[test]
    fn missing_date_field_becomes_unknown() {
        let raw = r#"{"results": [{"title": "Report", "url": "/pubs/1"}]}"#;
        let item = extractor().extract(raw).unwrap();
        assert_eq!(item.date, UNKNOWN_DATE);
    }

    #[test]
    fn decodes_and_extracts_embedded_fragment() {
        let raw = r#"{
            "results": [
                {"rendered": "&lt;h3&gt;&lt;a href=\"/pubs/1\"&gt;Fragment Report&lt;/a&gt;&lt;/h3&gt;&lt;time&gt;2 June 2025&lt;/time&gt;"}
            ]
        }"#;
        let item = extractor().extract(raw).unwrap();
        assert_eq!(item.title, "Fragment Report");
        assert_eq!(item.link, "https://example.org/pubs/1");
        assert_eq!(item.date, "2 June 2025");
    }

    #[test]
    fn top_level_array_when_records_key_empty() {
        let page = PageExtractor::new(&PageSelectors::default(), "https://example.org").unwrap();
        let fields = ApiFields {
            records: String::new(),
            ..ApiFields::default()
        };
        let extractor = ApiExtractor::new(fields, page);

        let raw = r#"[{"title": "Report", "url": "https://example.org/pubs/1"}]"#;
        let item = extractor.extract(raw).unwrap();
        assert_eq!(item.link, "https://example.org/pubs/1");
    }

    #[test]
    fn empty_records_is_an_error() {
        assert!(extractor().extract(r#"{"results": []}"#).is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(extractor().extract("<html>not json</html>").is_err());
    }

    #[test]
    fn record_without_fields_or_fragment_is_an_error() {
        let raw = r#"{"results": [{"id": 7}]}"#;
        assert!(extractor().extract(raw).is_err());
    }
}
