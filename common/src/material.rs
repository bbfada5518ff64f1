//! Material card matching
//!
//! Material cards (fabrics, leathers, finishes) rarely carry a retailer SKU.
//! They are tied to registry materials through numeric ids instead.
//!
//! ## Strategy order
//! 1. exact_item: an `Item:` number from the card body
//! 2. name_extracted: a number in parentheses in the card name (`Gray Locks (347)`)
//! 3. filename_extracted: a `-digits-` run in the file name
//!
//! Every id is tried as written and with leading zeros stripped. Registry
//! materials are keyed by SKU as written, lower-cased, and both again without
//! leading zeros; the first material per key wins.

use crate::analysis::percent;
use crate::extract::{file_stem, CardField, ExtractionRule, FailureKind, ParseFailure};
use crate::index::VariantIndex;
use crate::types::{present, CanonicalEntity, Keyed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Placeholder id stamped on sample swatch exports
const IGNORED_FILENAME_IDS: &[&str] = &["982416"];

/// Registry attribute naming the material supplier
pub const SUPPLIER_ATTRIBUTE: &str = "supplier_name";

lazy_static::lazy_static! {
    static ref ITEM_RULE: ExtractionRule =
        ExtractionRule::new("item", CardField::Sku, r"(?i)Item:\s*(\d+)");
    static ref NAME_RULE: ExtractionRule =
        ExtractionRule::new("name_bold", CardField::Name, r"\*\*(.+?)\*\*");
    static ref NAME_ID_RULE: ExtractionRule =
        ExtractionRule::new("name_id", CardField::Sku, r"\((\d+)\)");
    static ref SOURCE_URL_RULE: ExtractionRule =
        ExtractionRule::new("source_url", CardField::Url, r"source_url:\s*(.+)");
}

/// One parsed material card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialCard {
    pub file_name: String,
    pub name: Option<String>,
    pub url: Option<String>,
    /// `Item:` numbers in text order
    pub item_numbers: Vec<String>,
    /// Number in parentheses inside the name
    pub name_id: Option<String>,
    /// `-digits-` runs from the file name
    pub filename_ids: Vec<String>,
}

/// Parsed material cards plus the sources that could not be parsed
#[derive(Debug, Clone, Default)]
pub struct MaterialCollection {
    pub cards: Vec<MaterialCard>,
    pub skipped: Vec<ParseFailure>,
}

/// All-digit segments between two dashes; neighbouring runs share their dash
pub fn filename_ids(stem: &str) -> Vec<String> {
    let segments: Vec<&str> = stem.split('-').collect();
    if segments.len() < 3 {
        return Vec::new();
    }

    segments[1..segments.len() - 1]
        .iter()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter(|s| !IGNORED_FILENAME_IDS.contains(*s))
        .map(|s| s.to_string())
        .collect()
}

/// Parses one material card; fails only when there is no name and no id at all
pub fn parse_material_card(file_name: &str, content: &str) -> Result<MaterialCard, ParseFailure> {
    let name = NAME_RULE.apply(content);
    let name_id = name.as_deref().and_then(|name| NAME_ID_RULE.apply(name));
    let filename_ids = filename_ids(file_stem(file_name));

    let card = MaterialCard {
        file_name: file_name.to_string(),
        item_numbers: ITEM_RULE.apply_all(content),
        url: SOURCE_URL_RULE.apply(content),
        name,
        name_id,
        filename_ids,
    };

    if card.name.is_none() && card.item_numbers.is_empty() && card.filename_ids.is_empty() {
        return Err(ParseFailure {
            source_name: file_name.to_string(),
            kind: FailureKind::NoIdentifier,
            reason: "no name, item number or file name id found".to_string(),
        });
    }
    Ok(card)
}

/// Lookup keys for one registry material SKU, duplicates dropped
pub fn material_keys(sku: &str) -> Vec<String> {
    let stripped = sku.trim_start_matches('0');
    let mut keys: Vec<String> = Vec::with_capacity(4);
    for key in [
        sku.to_string(),
        sku.to_lowercase(),
        stripped.to_string(),
        stripped.to_lowercase(),
    ] {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

fn supplier_of(entity: &CanonicalEntity) -> Option<&str> {
    entity
        .attributes
        .get(SUPPLIER_ATTRIBUTE)
        .and_then(serde_json::Value::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialMethod {
    ExactItem,
    NameExtracted,
    FilenameExtracted,
}

impl std::fmt::Display for MaterialMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialMethod::ExactItem => write!(f, "exact_item"),
            MaterialMethod::NameExtracted => write!(f, "name_extracted"),
            MaterialMethod::FilenameExtracted => write!(f, "filename_extracted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialMatch {
    pub card: MaterialCard,
    pub material: CanonicalEntity,
    pub match_method: MaterialMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialStats {
    pub total_cards: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
    pub by_method: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialReport {
    pub stats: MaterialStats,
    pub matches: Vec<MaterialMatch>,
    /// Card files with no material
    pub unmatched: Vec<String>,
}

/// Identifiers of every registry material a card claims
pub fn claimed_materials(matches: &[MaterialMatch]) -> HashSet<String> {
    matches
        .iter()
        .map(|m| m.material.key().to_string())
        .collect()
}

/// Registry material index, optionally narrowed to one supplier
pub struct MaterialMatcher<'a> {
    index: VariantIndex<'a, CanonicalEntity>,
}

impl<'a> MaterialMatcher<'a> {
    pub fn new(entities: &'a [CanonicalEntity], supplier: Option<&str>) -> Self {
        let index = VariantIndex::build(entities, |entity| {
            if supplier.is_some_and(|s| supplier_of(entity) != Some(s)) {
                return Vec::new();
            }
            present(&entity.sku).map(material_keys).unwrap_or_default()
        });
        info!(keys = index.len(), supplier = ?supplier, "built material SKU index");

        Self { index }
    }

    fn lookup(&self, id: &str) -> Option<&'a CanonicalEntity> {
        self.index
            .first(id)
            .or_else(|| self.index.first(id.trim_start_matches('0')))
    }

    pub fn resolve(&self, card: &MaterialCard) -> Option<(&'a CanonicalEntity, MaterialMethod)> {
        if let Some(material) = card.item_numbers.iter().find_map(|id| self.lookup(id)) {
            return Some((material, MaterialMethod::ExactItem));
        }
        if let Some(material) = card.name_id.as_deref().and_then(|id| self.lookup(id)) {
            return Some((material, MaterialMethod::NameExtracted));
        }
        card.filename_ids
            .iter()
            .find_map(|id| self.lookup(id))
            .map(|material| (material, MaterialMethod::FilenameExtracted))
    }

    /// Resolves every card in order
    pub fn run(&self, cards: &[MaterialCard]) -> MaterialReport {
        let mut report = MaterialReport::default();
        report.stats.total_cards = cards.len();

        for card in cards {
            match self.resolve(card) {
                Some((material, method)) => {
                    debug!(card = %card.file_name, material = %material.identifier, %method, "material match");
                    *report.stats.by_method.entry(method.to_string()).or_default() += 1;
                    report.matches.push(MaterialMatch {
                        card: card.clone(),
                        material: material.clone(),
                        match_method: method,
                    });
                }
                None => report.unmatched.push(card.file_name.clone()),
            }
        }

        report.stats.matched = report.matches.len();
        report.stats.unmatched = report.unmatched.len();
        report.stats.match_rate = percent(report.stats.matched, report.stats.total_cards);
        info!(
            matched = report.stats.matched,
            unmatched = report.stats.unmatched,
            "material matching complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn materials() -> Vec<CanonicalEntity> {
        vec![
            CanonicalEntity::new("mat-347")
                .with_sku("0347")
                .with_name("Gray Locks")
                .with_attribute(SUPPLIER_ATTRIBUTE, json!("Acme")),
            CanonicalEntity::new("mat-621")
                .with_sku("621")
                .with_name("Natural Oak")
                .with_attribute(SUPPLIER_ATTRIBUTE, json!("Acme")),
            CanonicalEntity::new("mat-other")
                .with_sku("5150")
                .with_attribute(SUPPLIER_ATTRIBUTE, json!("Elsewhere")),
        ]
    }

    #[test]
    fn test_parse_material_card() {
        let text = "**Gray Locks (347)**\nItem: 0347\nItem: 12\nsource_url: https://acme.com/fabric/347\n";
        let card = parse_material_card("01c6d65e-982416-621-oak.md", text).unwrap();

        assert_eq!(card.name.as_deref(), Some("Gray Locks (347)"));
        assert_eq!(card.item_numbers, vec!["0347", "12"]);
        assert_eq!(card.name_id.as_deref(), Some("347"));
        // sample id dropped
        assert_eq!(card.filename_ids, vec!["621"]);
        assert_eq!(card.url.as_deref(), Some("https://acme.com/fabric/347"));
    }

    #[test]
    fn test_parse_material_card_without_anything() {
        let err = parse_material_card("notes.md", "plain text").unwrap_err();
        assert_eq!(err.kind, FailureKind::NoIdentifier);
        assert_eq!(err.source_name, "notes.md");
    }

    #[test]
    fn test_filename_ids() {
        assert_eq!(filename_ids("swatch-12-34-linen"), vec!["12", "34"]);
        assert_eq!(filename_ids("12-linen"), Vec::<String>::new());
        assert_eq!(filename_ids("a-982416-b"), Vec::<String>::new());
        assert_eq!(filename_ids("a-4x4-b"), Vec::<String>::new());
    }

    #[test]
    fn test_material_keys() {
        assert_eq!(material_keys("0347"), vec!["0347", "347"]);
        assert_eq!(material_keys("00AB"), vec!["00AB", "00ab", "AB", "ab"]);
        assert!(material_keys("000").iter().all(|k| k == "000"));
    }

    #[test]
    fn test_exact_item_strips_leading_zeros() {
        let entities = materials();
        let matcher = MaterialMatcher::new(&entities, None);
        let card = MaterialCard {
            file_name: "a.md".into(),
            item_numbers: vec!["00347".into()],
            ..Default::default()
        };

        let (material, method) = matcher.resolve(&card).unwrap();
        assert_eq!(material.identifier, "mat-347");
        assert_eq!(method, MaterialMethod::ExactItem);
    }

    #[test]
    fn test_name_id_before_filename_id() {
        let entities = materials();
        let matcher = MaterialMatcher::new(&entities, None);
        let card = MaterialCard {
            file_name: "x-621-y.md".into(),
            name: Some("Gray Locks (347)".into()),
            name_id: Some("347".into()),
            filename_ids: vec!["621".into()],
            ..Default::default()
        };
        let (material, method) = matcher.resolve(&card).unwrap();
        assert_eq!(material.identifier, "mat-347");
        assert_eq!(method, MaterialMethod::NameExtracted);

        let by_file = MaterialCard {
            name_id: None,
            ..card
        };
        let (material, method) = matcher.resolve(&by_file).unwrap();
        assert_eq!(material.identifier, "mat-621");
        assert_eq!(method, MaterialMethod::FilenameExtracted);
    }

    #[test]
    fn test_supplier_filter() {
        let entities = materials();
        let card = MaterialCard {
            file_name: "a.md".into(),
            item_numbers: vec!["5150".into()],
            ..Default::default()
        };

        assert!(MaterialMatcher::new(&entities, Some("Acme")).resolve(&card).is_none());
        assert!(MaterialMatcher::new(&entities, None).resolve(&card).is_some());
    }

    #[test]
    fn test_run_stats_and_claims() {
        let entities = materials();
        let matcher = MaterialMatcher::new(&entities, Some("Acme"));
        let cards = vec![
            parse_material_card("a.md", "**Gray Locks**\nItem: 347").unwrap(),
            parse_material_card("b-621-oak.md", "**Oak**").unwrap(),
            parse_material_card("c.md", "**Velvet Blue**").unwrap(),
        ];

        let report = matcher.run(&cards);
        assert_eq!(report.stats.total_cards, 3);
        assert_eq!(report.stats.matched, 2);
        assert_eq!(report.stats.unmatched, 1);
        assert!((report.stats.match_rate - 66.7).abs() < 1e-9);
        assert_eq!(report.stats.by_method.get("exact_item"), Some(&1));
        assert_eq!(report.stats.by_method.get("filename_extracted"), Some(&1));
        assert_eq!(report.unmatched, vec!["c.md"]);

        let claimed = claimed_materials(&report.matches);
        assert_eq!(claimed.len(), 2);
        assert!(claimed.contains("mat-347") && claimed.contains("mat-621"));
    }
}
