//! Card text extraction
//!
//! A card is a markdown document with a `<!-- CARD:id -->` marker, a bold or
//! heading product name, a `SKU:` or `Item:` line and a source URL somewhere
//! in the body. Some exports only carry the SKU in the file name
//! (`oak-table-074138-v2.md`). Each field is pulled out by a named rule; rules
//! are tried in order and the first hit per field wins.

use crate::types::CardRecord;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// Card field filled by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Sku,
    Name,
    Url,
}

/// Text a rule runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Content,
    /// File name without its extension
    FileStem,
}

/// One named pattern
#[derive(Debug)]
pub struct ExtractionRule {
    pub label: &'static str,
    pub field: CardField,
    pub target: RuleTarget,
    pattern: Regex,
}

impl ExtractionRule {
    pub(crate) fn new(label: &'static str, field: CardField, pattern: &str) -> Self {
        Self {
            label,
            field,
            target: RuleTarget::Content,
            pattern: Regex::new(pattern).unwrap(),
        }
    }

    pub(crate) fn on_file_stem(mut self) -> Self {
        self.target = RuleTarget::FileStem;
        self
    }

    /// First capture (or whole match when the pattern has no group), trimmed
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let matched = caps.get(1).or_else(|| caps.get(0))?;
        let value = matched.as_str().trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Every capture in text order, blanks dropped
    pub fn apply_all(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }
}

lazy_static::lazy_static! {
    static ref CARD_RULES: Vec<ExtractionRule> = vec![
        ExtractionRule::new("sku", CardField::Sku, r"(?i)SKU:\s*([A-Z0-9\-_]+)"),
        ExtractionRule::new("item", CardField::Sku, r"(?i)\bItem:\s*(\d{5,7})\b"),
        ExtractionRule::new("filename_sku", CardField::Sku, r"-(\d{5,7})-").on_file_stem(),
        ExtractionRule::new(
            "name_bold",
            CardField::Name,
            r"<!--\s*CARD:[^>]+-->[^#]*##?\s*\*\*([^*]+)\*\*",
        ),
        ExtractionRule::new(
            "name_heading",
            CardField::Name,
            r"<!--\s*CARD:[^>]+-->[^#]*#\s+([^\n]+)",
        ),
        ExtractionRule::new("url", CardField::Url, r"https?://[^\s)]+"),
    ];
}

/// Rules in evaluation order
pub fn card_rules() -> &'static [ExtractionRule] {
    &CARD_RULES
}

/// Looks a rule up by label
pub fn rule(label: &str) -> Option<&'static ExtractionRule> {
    CARD_RULES.iter().find(|r| r.label == label)
}

/// Why a source was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Readable, but no rule produced a SKU, name or URL
    NoIdentifier,
    /// Could not be read or decoded
    Unreadable,
}

/// A source that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub source_name: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ParseFailure {
    pub fn no_identifier(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            kind: FailureKind::NoIdentifier,
            reason: "no SKU, name or URL found".to_string(),
        }
    }

    pub fn unreadable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            kind: FailureKind::Unreadable,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_name, self.reason)
    }
}

impl From<ParseFailure> for crate::error::Error {
    fn from(failure: ParseFailure) -> Self {
        crate::error::Error::Parse {
            source_name: failure.source_name,
            reason: failure.reason,
        }
    }
}

pub(crate) fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

/// Parses one card
///
/// Fails only when no rule yields a SKU, a name or a URL.
pub fn parse_card(file_name: &str, content: &str) -> Result<CardRecord, ParseFailure> {
    let mut card = CardRecord::new(file_name);
    card.raw_text = content.to_string();
    let stem = file_stem(file_name);

    for rule in card_rules() {
        let slot = match rule.field {
            CardField::Sku => &mut card.sku,
            CardField::Name => &mut card.name,
            CardField::Url => &mut card.url,
        };
        if slot.is_some() {
            continue;
        }
        *slot = match rule.target {
            RuleTarget::Content => rule.apply(content),
            RuleTarget::FileStem => rule.apply(stem),
        };
    }

    if card.has_no_identifier() {
        return Err(ParseFailure::no_identifier(file_name));
    }
    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "<!-- CARD:sofa-01 -->\n## **Harlow Sectional Sofa**\n\nSKU: 2676-LSECT\nsource: https://www.example.com/harlow-sectional?ref=1)\n";

    #[test]
    fn test_rule_order() {
        let labels: Vec<&str> = card_rules().iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec!["sku", "item", "filename_sku", "name_bold", "name_heading", "url"]
        );
    }

    #[test]
    fn test_sku_rule() {
        let sku = rule("sku").unwrap();
        assert_eq!(sku.apply("sku: bas-1342_3 more"), Some("bas-1342_3".to_string()));
        assert_eq!(sku.apply("no code here"), None);
    }

    #[test]
    fn test_item_rule() {
        let item = rule("item").unwrap();
        assert_eq!(item.apply("Color: Brass\nItem: 074138\n"), Some("074138".to_string()));
        assert_eq!(item.apply("item:  552211"), Some("552211".to_string()));
        // too short, too long
        assert_eq!(item.apply("Item: 347"), None);
        assert_eq!(item.apply("Item: 12345678"), None);
    }

    #[test]
    fn test_filename_sku_rule() {
        let by_name = rule("filename_sku").unwrap();
        assert_eq!(by_name.target, RuleTarget::FileStem);
        assert_eq!(by_name.apply("oak-table-074138-v2"), Some("074138".to_string()));
        assert_eq!(by_name.apply("oak-table-074138"), None);
    }

    #[test]
    fn test_apply_all_keeps_text_order() {
        let item = ExtractionRule::new("items", CardField::Sku, r"(?i)Item:\s*(\d+)");
        assert_eq!(item.apply_all("Item: 12 / item: 0347"), vec!["12", "0347"]);
        assert!(item.apply_all("none").is_empty());
    }

    #[test]
    fn test_parse_card_sku_from_item_line() {
        let card = parse_card("lamp.md", "<!-- CARD:l -->\n# Arc Lamp\nItem: 074138\n").unwrap();
        assert_eq!(card.sku.as_deref(), Some("074138"));
    }

    #[test]
    fn test_parse_card_sku_from_file_name() {
        let card = parse_card("cane-side-074138-table.md", "no markers here").unwrap();
        assert_eq!(card.sku.as_deref(), Some("074138"));
        assert_eq!(card.name, None);
    }

    #[test]
    fn test_sku_line_beats_item_and_file_name() {
        let text = "<!-- CARD:s -->\n# Sofa\nSKU: 2676-LSECT\nItem: 074138\n";
        let card = parse_card("sofa-552211-x.md", text).unwrap();
        assert_eq!(card.sku.as_deref(), Some("2676-LSECT"));
    }

    #[test]
    fn test_name_rules() {
        let bold = rule("name_bold").unwrap();
        assert_eq!(bold.apply(CARD), Some("Harlow Sectional Sofa".to_string()));

        let heading = rule("name_heading").unwrap();
        let text = "<!-- CARD:x -->\n# Oak Dining Table\nbody";
        assert_eq!(heading.apply(text), Some("Oak Dining Table".to_string()));
        assert_eq!(bold.apply(text), None);
    }

    #[test]
    fn test_url_rule_stops_at_paren() {
        let url = rule("url").unwrap();
        assert_eq!(
            url.apply("[link](https://example.com/item/1) tail"),
            Some("https://example.com/item/1".to_string())
        );
    }

    #[test]
    fn test_parse_card() {
        let card = parse_card("sofa.md", CARD).unwrap();
        assert_eq!(card.file_name, "sofa.md");
        assert_eq!(card.sku.as_deref(), Some("2676-LSECT"));
        assert_eq!(card.name.as_deref(), Some("Harlow Sectional Sofa"));
        assert_eq!(
            card.url.as_deref(),
            Some("https://www.example.com/harlow-sectional?ref=1")
        );
        assert_eq!(card.raw_text, CARD);
    }

    #[test]
    fn test_parse_card_partial_fields() {
        let card = parse_card("lamp.md", "<!-- CARD:l -->\n# Brass Lamp\n").unwrap();
        assert_eq!(card.sku, None);
        assert_eq!(card.url, None);
        assert_eq!(card.name.as_deref(), Some("Brass Lamp"));
    }

    #[test]
    fn test_parse_card_without_identifier() {
        let err = parse_card("empty.md", "just some notes").unwrap_err();
        assert_eq!(err.source_name, "empty.md");
        assert_eq!(err.kind, FailureKind::NoIdentifier);
        let error: crate::error::Error = err.into();
        assert!(matches!(error, crate::error::Error::Parse { .. }));
    }
}
