// src/utils/entities.rs

//! HTML text-entity decoding.
//!
//! API responses embed entry markup as entity-escaped strings. The fragment
//! must be unescaped before it can be parsed as HTML.

/// Decode the standard named entities plus numeric character references.
///
/// Single left-to-right pass; decoded output is never rescanned, so
/// double-escaped input like `&amp;lt;` yields `&lt;` rather than `<`.
pub fn decode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        match decode_entity(rest) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode one entity at the start of `s` (which begins with `&`).
/// Returns the decoded text and the number of bytes consumed.
fn decode_entity(s: &str) -> Option<(String, usize)> {
    let end = s.find(';')?;
    // Entities are short; a distant semicolon means this '&' is literal text.
    if end > 10 {
        return None;
    }
    let name = &s[1..end];
    let consumed = end + 1;

    let decoded = match name {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        "nbsp" => " ".to_string(),
        "amp" => "&".to_string(),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?.to_string()
        }
    };

    Some((decoded, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_entities() {
        assert_eq!(
            decode("&lt;h3&gt;Tom &amp; Jerry&lt;/h3&gt;"),
            "<h3>Tom & Jerry</h3>"
        );
        assert_eq!(decode("&quot;quoted&quot; &apos;x&apos;"), "\"quoted\" 'x'");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode("caf&#233;"), "café");
        assert_eq!(decode("caf&#xE9;"), "café");
    }

    #[test]
    fn leaves_unknown_entities_alone() {
        assert_eq!(decode("&bogus; & plain"), "&bogus; & plain");
    }

    #[test]
    fn handles_trailing_ampersand() {
        assert_eq!(decode("fish &"), "fish &");
    }
}
