//! Markup stripping for job posting text.
//!
//! Postings are scraped HTML fragments. Stripping removes comments,
//! `<script>`/`<style>` blocks and tags, then decodes character entities so
//! only the visible text remains.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{JobCheckError, Result};

static DEFAULT_STRIPPER: LazyLock<HtmlStripper> =
    LazyLock::new(|| HtmlStripper::new().expect("built-in markup patterns should be valid"));

/// Removes markup from text while keeping its inner text.
#[derive(Clone, Debug)]
pub struct HtmlStripper {
    comments: Regex,
    raw_text_blocks: Regex,
    tags: Regex,
    entities: Regex,
}

impl HtmlStripper {
    /// Compile the markup patterns.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| JobCheckError::config(format!("Invalid markup pattern: {e}")))
        };

        Ok(HtmlStripper {
            comments: compile(r"(?s)<!--.*?-->")?,
            raw_text_blocks: compile(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")?,
            tags: compile(r"(?s)</?[A-Za-z!?][^>]*>")?,
            entities: compile(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")?,
        })
    }

    /// The shared stripper with the built-in patterns.
    pub fn shared() -> &'static HtmlStripper {
        &DEFAULT_STRIPPER
    }

    /// Strip markup from `text`.
    ///
    /// Tags are replaced by a single space so text from adjacent block
    /// elements does not run together; whitespace is collapsed later in the
    /// normalization pipeline.
    pub fn strip(&self, text: &str) -> String {
        if !text.contains('<') && !text.contains('&') {
            return text.to_string();
        }

        let without_comments = self.comments.replace_all(text, " ");
        let without_blocks = self.raw_text_blocks.replace_all(&without_comments, " ");
        let without_tags = self.tags.replace_all(&without_blocks, " ");

        self.entities
            .replace_all(&without_tags, |caps: &Captures| {
                decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for HtmlStripper {
    fn default() -> Self {
        DEFAULT_STRIPPER.clone()
    }
}

/// Decode the body of a character reference (the part between `&` and `;`).
fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match body {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        _ => return None,
    };
    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags_keeps_inner_text() {
        let stripper = HtmlStripper::shared();
        let stripped = stripper.strip("<p>Hello <b>World</b></p>");
        assert_eq!(stripped.split_whitespace().collect::<Vec<_>>(), ["Hello", "World"]);
    }

    #[test]
    fn test_adjacent_blocks_do_not_fuse() {
        let stripped = HtmlStripper::shared().strip("<li>Remote</li><li>Flexible</li>");
        assert!(stripped.contains("Remote"));
        assert!(!stripped.contains("RemoteFlexible"));
    }

    #[test]
    fn test_removes_comments_scripts_and_styles() {
        let stripped = HtmlStripper::shared().strip(
            "<!-- tracking --><script>var x = 1;</script><style>p { color: red }</style>Apply",
        );
        assert_eq!(stripped.trim(), "Apply");
    }

    #[test]
    fn test_decodes_entities() {
        let stripped = HtmlStripper::shared().strip("R&amp;D &lt;team&gt; &#36;5k &#x41; &bogus;");
        assert_eq!(stripped, "R&D <team> $5k A &bogus;");
    }

    #[test]
    fn test_comparison_operators_are_not_tags() {
        let stripped = HtmlStripper::shared().strip("salary < 5000 and > 100");
        assert_eq!(stripped, "salary < 5000 and > 100");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(HtmlStripper::shared().strip("plain text"), "plain text");
        assert_eq!(HtmlStripper::shared().strip(""), "");
    }
}
