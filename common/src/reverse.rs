//! Reverse resolver
//!
//! Walks the registry side: every entity not claimed by a forward match is
//! looked up again against card-side indices, and whatever is still left
//! over becomes an orphan with a heuristic category.
//!
//! ## Strategy order
//! 1. exact_sku (high): strictly normalized SKU equal to a card's
//! 2. sku_base (medium): leading 5-7 digit run in the card SKU variant index
//! 3. exact_name (high): normalized name in the card name index
//! 4. fuzzy_name (low): first card name key with enough shared words

use crate::index::VariantIndex;
use crate::normalizer::{name_tokens, name_words, normalize_name, normalize_sku, sku_variants};
use crate::types::{present, CanonicalEntity, CardRecord, Confidence, Keyed, MatchRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

const SECTIONAL_KEYWORDS: &[&str] = &["laf", "raf", "armless", "corner", "wedge", "cst"];
const ACCESSORY_KEYWORDS: &[&str] = &["mirror", "pillow", "pendant", "sculpture", "art", "decor"];

/// Shared-word requirement for fuzzy name matches
const FUZZY_MIN_SHARED: f64 = 3.0;
const FUZZY_SHARED_RATIO: f64 = 0.7;

lazy_static::lazy_static! {
    static ref SKU_BASE_RE: Regex = Regex::new(r"^(\d{5,7})").unwrap();
    static ref FINISH_SUFFIX_RE: Regex = Regex::new(r"[A-Z]{3}$").unwrap();
    static ref DIMENSION_RE: Regex = Regex::new(r#"\d+["']"#).unwrap();
}

/// Reverse strategy that linked an entity to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseMethod {
    ExactSku,
    SkuBase,
    ExactName,
    FuzzyName,
}

impl ReverseMethod {
    pub fn confidence(self) -> Confidence {
        match self {
            ReverseMethod::ExactSku | ReverseMethod::ExactName => Confidence::High,
            ReverseMethod::SkuBase => Confidence::Medium,
            ReverseMethod::FuzzyName => Confidence::Low,
        }
    }
}

/// Heuristic bucket for an entity nobody claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanCategory {
    SectionalComponent,
    Accessory,
    FinishVariant,
    SizeVariant,
    Unknown,
}

impl std::fmt::Display for OrphanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrphanCategory::SectionalComponent => write!(f, "sectional_component"),
            OrphanCategory::Accessory => write!(f, "accessory"),
            OrphanCategory::FinishVariant => write!(f, "finish_variant"),
            OrphanCategory::SizeVariant => write!(f, "size_variant"),
            OrphanCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// Card identity as written into reverse and style output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub filename: String,
    pub name: Option<String>,
    pub sku: Option<String>,
}

impl From<&CardRecord> for CardRef {
    fn from(card: &CardRecord) -> Self {
        Self {
            filename: card.file_name.clone(),
            name: card.name.clone(),
            sku: card.sku.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverseMatch {
    pub registry_entity: CanonicalEntity,
    pub card: CardRef,
    pub match_method: ReverseMethod,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanRecord {
    #[serde(flatten)]
    pub entity: CanonicalEntity,
    pub category: OrphanCategory,
}

/// Every registry entity lands in exactly one of the three groups
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReverseReport {
    pub claimed: usize,
    pub reverse_matches: Vec<ReverseMatch>,
    pub orphaned: Vec<OrphanRecord>,
    pub orphaned_by_category: BTreeMap<String, usize>,
}

impl ReverseReport {
    /// claimed + reverse-matched + orphaned
    pub fn total(&self) -> usize {
        self.claimed + self.reverse_matches.len() + self.orphaned.len()
    }
}

/// Identifiers of every candidate named by a matched record
pub fn claimed_identifiers(records: &[MatchRecord]) -> HashSet<String> {
    records
        .iter()
        .filter(|record| record.matched)
        .flat_map(|record| record.matches.iter().map(|entity| entity.key().to_string()))
        .collect()
}

/// First matching rule wins: sectional, accessory, finish, size
pub fn categorize_orphan(entity: &CanonicalEntity) -> OrphanCategory {
    let name = present(&entity.name).unwrap_or_default();
    let tokens = name_tokens(name);
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| tokens.contains(*k));

    if has_any(SECTIONAL_KEYWORDS) {
        return OrphanCategory::SectionalComponent;
    }
    if has_any(ACCESSORY_KEYWORDS) {
        return OrphanCategory::Accessory;
    }
    if present(&entity.sku).is_some_and(|sku| FINISH_SUFFIX_RE.is_match(sku)) {
        return OrphanCategory::FinishVariant;
    }
    if DIMENSION_RE.is_match(name) {
        return OrphanCategory::SizeVariant;
    }
    OrphanCategory::Unknown
}

/// Card-side indices for reverse lookups
pub struct ReverseResolver<'a> {
    /// `normalize_sku` of each card SKU
    strict_sku_index: VariantIndex<'a, CardRecord>,
    sku_index: VariantIndex<'a, CardRecord>,
    name_index: VariantIndex<'a, CardRecord>,
}

impl<'a> ReverseResolver<'a> {
    pub fn new(cards: &'a [CardRecord]) -> Self {
        let strict_sku_index = VariantIndex::build(cards, |card| {
            present(&card.sku).map(normalize_sku)
        });
        let sku_index = VariantIndex::build(cards, |card| {
            present(&card.sku).map(sku_variants).unwrap_or_default()
        });
        let name_index = VariantIndex::build(cards, |card| {
            present(&card.name).map(normalize_name)
        });
        info!(
            sku_variants = sku_index.len(),
            name_keys = name_index.len(),
            "built card-side reverse indices"
        );

        Self {
            strict_sku_index,
            sku_index,
            name_index,
        }
    }

    /// Looks one entity up against the card indices
    pub fn resolve_entity(&self, entity: &CanonicalEntity) -> Option<(&'a CardRecord, ReverseMethod)> {
        if let Some(sku) = present(&entity.sku) {
            if let Some(card) = self.strict_sku_index.first(&normalize_sku(sku)) {
                return Some((card, ReverseMethod::ExactSku));
            }

            if let Some(card) = SKU_BASE_RE
                .captures(sku)
                .and_then(|cap| self.sku_index.first(&cap[1]))
            {
                return Some((card, ReverseMethod::SkuBase));
            }
        }

        let name = present(&entity.name)?;

        let key = normalize_name(name);
        if let Some(card) = self.name_index.first(&key) {
            return Some((card, ReverseMethod::ExactName));
        }

        self.fuzzy_name(name)
            .map(|card| (card, ReverseMethod::FuzzyName))
    }

    /// Linear scan over card name keys in insertion order
    fn fuzzy_name(&self, name: &str) -> Option<&'a CardRecord> {
        let words = name_words(name);
        if words.is_empty() {
            return None;
        }
        let required = FUZZY_MIN_SHARED.min(words.len() as f64 * FUZZY_SHARED_RATIO);

        self.name_index.iter().find_map(|(key, cards)| {
            let shared = key.split_whitespace().filter(|w| words.contains(*w)).count();
            (shared >= 1 && shared as f64 >= required)
                .then(|| cards.first().copied())
                .flatten()
        })
    }

    /// Resolves every unclaimed entity in registry order
    pub fn run(&self, registry: &[CanonicalEntity], claimed: &HashSet<String>) -> ReverseReport {
        let mut report = ReverseReport::default();

        for entity in registry {
            if claimed.contains(entity.key()) {
                report.claimed += 1;
                continue;
            }

            match self.resolve_entity(entity) {
                Some((card, method)) => {
                    debug!(entity = %entity.identifier, card = %card.file_name, ?method, "reverse match");
                    report.reverse_matches.push(ReverseMatch {
                        registry_entity: entity.clone(),
                        card: CardRef::from(card),
                        match_method: method,
                        confidence: method.confidence(),
                    });
                }
                None => {
                    let category = categorize_orphan(entity);
                    debug!(entity = %entity.identifier, %category, "orphaned");
                    *report
                        .orphaned_by_category
                        .entry(category.to_string())
                        .or_default() += 1;
                    report.orphaned.push(OrphanRecord {
                        entity: entity.clone(),
                        category,
                    });
                }
            }
        }

        info!(
            claimed = report.claimed,
            reverse_matched = report.reverse_matches.len(),
            orphaned = report.orphaned.len(),
            "reverse pass complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardSet, MatchMethod};

    fn cards() -> Vec<CardRecord> {
        vec![
            CardRecord::new("sofa.md").with_sku("2676-LSECT").with_name("Harlow Sectional Sofa"),
            CardRecord::new("lamp.md").with_sku("074138").with_name("Arc Floor Lamp"),
            CardRecord::new("table.md").with_name("Oak Dining Table Finish"),
            CardRecord::new("chair.md").with_name("Walnut Lounge Chair Low Back"),
        ]
    }

    #[test]
    fn test_exact_sku() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        let entity = CanonicalEntity::new("m1").with_sku("2676 lsect");
        let (card, method) = resolver.resolve_entity(&entity).unwrap();
        assert_eq!(card.file_name, "sofa.md");
        assert_eq!(method, ReverseMethod::ExactSku);
        assert_eq!(method.confidence(), Confidence::High);
    }

    #[test]
    fn test_base_code_is_not_exact_sku() {
        let cards = vec![CardRecord::new("sofa.md").with_sku("2676-WLSECTL-KIT53")];
        let resolver = ReverseResolver::new(&cards);

        // "2676" is only a variant of the card SKU, and too short for sku_base
        let entity = CanonicalEntity::new("m1").with_sku("2676");
        assert!(resolver.resolve_entity(&entity).is_none());

        let exact = CanonicalEntity::new("m2").with_sku("2676_wlsectl_kit53");
        let (_, method) = resolver.resolve_entity(&exact).unwrap();
        assert_eq!(method, ReverseMethod::ExactSku);
    }

    #[test]
    fn test_sku_base() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        let entity = CanonicalEntity::new("m2").with_sku("074138 BRS");
        let (card, method) = resolver.resolve_entity(&entity).unwrap();
        assert_eq!(card.file_name, "lamp.md");
        assert_eq!(method, ReverseMethod::SkuBase);
        assert_eq!(method.confidence(), Confidence::Medium);
    }

    #[test]
    fn test_exact_name_drops_material_suffix() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        let entity = CanonicalEntity::new("m3").with_name("Oak  Dining Table");
        let (card, method) = resolver.resolve_entity(&entity).unwrap();
        assert_eq!(card.file_name, "table.md");
        assert_eq!(method, ReverseMethod::ExactName);
    }

    #[test]
    fn test_fuzzy_name() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        let entity = CanonicalEntity::new("m4").with_name("Walnut Lounge Chair Ottoman");
        let (card, method) = resolver.resolve_entity(&entity).unwrap();
        assert_eq!(card.file_name, "chair.md");
        assert_eq!(method, ReverseMethod::FuzzyName);
        assert_eq!(method.confidence(), Confidence::Low);
    }

    #[test]
    fn test_fuzzy_name_needs_enough_words() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        // 1 shared word of 4, requirement is min(3, 2.8)
        let entity = CanonicalEntity::new("m5").with_name("Walnut Bookcase Tall Narrow");
        assert!(resolver.resolve_entity(&entity).is_none());
    }

    #[test]
    fn test_categorize_orphan() {
        let sectional = CanonicalEntity::new("a").with_name("Harlow LAF Chaise");
        assert_eq!(categorize_orphan(&sectional), OrphanCategory::SectionalComponent);

        let accessory = CanonicalEntity::new("b").with_name("Round Wall Mirror");
        assert_eq!(categorize_orphan(&accessory), OrphanCategory::Accessory);

        let finish = CanonicalEntity::new("c").with_sku("099213BRS").with_name("Arc Lamp");
        assert_eq!(categorize_orphan(&finish), OrphanCategory::FinishVariant);

        let size = CanonicalEntity::new("d").with_name("Jute Rug 8' x 10'");
        assert_eq!(categorize_orphan(&size), OrphanCategory::SizeVariant);

        let unknown = CanonicalEntity::new("e").with_name("Party Bench");
        assert_eq!(categorize_orphan(&unknown), OrphanCategory::Unknown);
    }

    #[test]
    fn test_finish_variant_orphan() {
        let cards: Vec<CardRecord> = Vec::new();
        let resolver = ReverseResolver::new(&cards);
        let registry = vec![CanonicalEntity::new("m9").with_sku("099213BRS").with_name("Arc Lamp")];

        let report = resolver.run(&registry, &HashSet::new());
        assert_eq!(report.orphaned.len(), 1);
        assert_eq!(report.orphaned[0].category, OrphanCategory::FinishVariant);
        assert_eq!(report.orphaned_by_category.get("finish_variant"), Some(&1));
    }

    #[test]
    fn test_claimed_identifiers() {
        let a = CanonicalEntity::new("a");
        let b = CanonicalEntity::new("b");
        let card = CardSet::from(&CardRecord::new("x.md"));
        let records = vec![
            MatchRecord::from_candidates(card.clone(), MatchMethod::SkuFuzzy, Confidence::Medium, &[&a, &b], None),
            MatchRecord::unmatched(card),
        ];
        let claimed = claimed_identifiers(&records);
        assert_eq!(claimed.len(), 2);
        assert!(claimed.contains("a") && claimed.contains("b"));
    }

    #[test]
    fn test_every_entity_lands_once() {
        let cards = cards();
        let resolver = ReverseResolver::new(&cards);
        let registry = vec![
            CanonicalEntity::new("claimed").with_sku("1111"),
            CanonicalEntity::new("rev").with_sku("2676-LSECT"),
            CanonicalEntity::new("orphan1").with_name("Round Wall Mirror"),
            CanonicalEntity::new("orphan2").with_sku("555ABC"),
            CanonicalEntity::new("orphan3"),
        ];
        let claimed: HashSet<String> = ["claimed".to_string()].into_iter().collect();

        let report = resolver.run(&registry, &claimed);
        assert_eq!(report.total(), registry.len());
        assert_eq!(report.claimed, 1);
        assert_eq!(report.reverse_matches.len(), 1);
        assert_eq!(report.orphaned.len(), 3);

        let mut seen: Vec<&str> = report
            .reverse_matches
            .iter()
            .map(|m| m.registry_entity.identifier.as_str())
            .chain(report.orphaned.iter().map(|o| o.entity.identifier.as_str()))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["orphan1", "orphan2", "orphan3", "rev"]);

        let counted: usize = report.orphaned_by_category.values().sum();
        assert_eq!(counted, report.orphaned.len());
    }
}
