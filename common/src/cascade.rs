//! Match cascade
//!
//! Resolves one retailer card against the registry snapshot.
//!
//! ## Strategy order
//! 1. URL exact (high)
//! 2. SKU exact (high)
//! 3. SKU fuzzy through the variant index (confidence by candidate count)
//! 4. Name similarity (confidence by top Jaccard score)
//!
//! The first strategy that yields candidates wins, even when a later one
//! would rate higher. A strategy whose card field is missing is skipped.

use crate::config::MatchConfig;
use crate::error::Result;
use crate::index::VariantIndex;
use crate::normalizer::{jaccard_similarity, normalize_sku, normalize_url, sku_variants};
use crate::types::{
    present, CanonicalEntity, CardCollection, CardRecord, CardSet, Confidence, Keyed, MatchMethod,
    MatchRecord, RunStats,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Name score above which a name match is rated high
const NAME_HIGH_SCORE: f64 = 0.8;
/// Name score above which a name match is rated medium
const NAME_MEDIUM_SCORE: f64 = 0.6;

/// Output of a full run
#[derive(Debug, Clone)]
pub struct MatchRun {
    pub records: Vec<MatchRecord>,
    pub stats: RunStats,
}

/// Registry-side matcher, built once per run
pub struct MatchCascade<'a> {
    config: MatchConfig,
    entities: &'a [CanonicalEntity],
    sku_index: VariantIndex<'a, CanonicalEntity>,
}

impl<'a> MatchCascade<'a> {
    /// Validates the config and indexes every registry SKU variant
    pub fn new(entities: &'a [CanonicalEntity], config: MatchConfig) -> Result<Self> {
        config.validate()?;

        let sku_index = VariantIndex::build(entities, |entity| {
            present(&entity.sku).map(sku_variants).unwrap_or_default()
        });
        info!(
            entities = entities.len(),
            variants = sku_index.len(),
            "built registry SKU variant index"
        );

        Ok(Self {
            config,
            entities,
            sku_index,
        })
    }

    /// Registry entities whose normalized URL equals the card's
    pub fn match_by_url(&self, card_url: &str) -> Vec<&'a CanonicalEntity> {
        let target = normalize_url(card_url);
        if target.is_empty() {
            return Vec::new();
        }

        self.entities
            .iter()
            .filter(|entity| {
                present(&entity.url).is_some_and(|url| normalize_url(url) == target)
            })
            .collect()
    }

    /// Registry entities whose strictly normalized SKU equals the card's
    pub fn match_by_sku_exact(&self, card_sku: &str) -> Vec<&'a CanonicalEntity> {
        let target = normalize_sku(card_sku);
        if target.is_empty() {
            return Vec::new();
        }

        self.entities
            .iter()
            .filter(|entity| {
                present(&entity.sku).is_some_and(|sku| normalize_sku(sku) == target)
            })
            .collect()
    }

    /// Union of index hits for every card SKU variant, deduplicated by identifier
    ///
    /// Variants are visited in sorted order and buckets in insertion order, so
    /// the candidate order is stable across runs.
    pub fn match_by_sku_fuzzy(&self, card_sku: &str) -> Vec<&'a CanonicalEntity> {
        if !self.config.fuzzy_sku_enabled {
            return Vec::new();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates = Vec::new();

        for variant in sku_variants(card_sku) {
            for &entity in self.sku_index.lookup(&variant) {
                if seen.insert(entity.key()) {
                    candidates.push(entity);
                }
            }
        }

        candidates
    }

    /// Name candidates at or above the threshold, best first, capped
    pub fn match_by_name(&self, card_name: &str) -> Vec<(&'a CanonicalEntity, f64)> {
        let mut scored: Vec<(&'a CanonicalEntity, f64)> = self
            .entities
            .iter()
            .filter_map(|entity| {
                let name = present(&entity.name)?;
                let score = jaccard_similarity(card_name, name);
                (score >= self.config.name_similarity_threshold && score > 0.0)
                    .then_some((entity, score))
            })
            .collect();

        // stable sort keeps registry order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config.max_name_candidates);
        scored
    }

    /// Confidence for a fuzzy SKU match; never rises as `count` grows
    pub fn fuzzy_confidence(&self, count: usize) -> Confidence {
        if count <= self.config.max_fuzzy_matches_high {
            Confidence::High
        } else if count <= self.config.max_fuzzy_matches_medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Confidence for a name match from its top score
    pub fn name_confidence(similarity: f64) -> Confidence {
        if similarity > NAME_HIGH_SCORE {
            Confidence::High
        } else if similarity > NAME_MEDIUM_SCORE {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Runs the cascade for one card
    pub fn resolve(&self, card: &CardRecord) -> MatchRecord {
        let cardset = CardSet::from(card);

        // 1. URL
        if let Some(url) = present(&card.url) {
            let found = self.match_by_url(url);
            if !found.is_empty() {
                return MatchRecord::from_candidates(cardset, MatchMethod::Url, Confidence::High, &found, None);
            }
        }

        if let Some(sku) = present(&card.sku) {
            // 2. SKU exact
            let found = self.match_by_sku_exact(sku);
            if !found.is_empty() {
                return MatchRecord::from_candidates(cardset, MatchMethod::Sku, Confidence::High, &found, None);
            }

            // 3. SKU fuzzy
            let found = self.match_by_sku_fuzzy(sku);
            if !found.is_empty() {
                let confidence = self.fuzzy_confidence(found.len());
                return MatchRecord::from_candidates(cardset, MatchMethod::SkuFuzzy, confidence, &found, None);
            }
        }

        // 4. Name
        if let Some(name) = present(&card.name) {
            let scored = self.match_by_name(name);
            if let Some(&(_, top)) = scored.first() {
                let found: Vec<&CanonicalEntity> = scored.iter().map(|(entity, _)| *entity).collect();
                return MatchRecord::from_candidates(
                    cardset,
                    MatchMethod::Name,
                    Self::name_confidence(top),
                    &found,
                    Some(top),
                );
            }
        }

        MatchRecord::unmatched(cardset)
    }

    /// Resolves every card in collection order
    ///
    /// `on_card` sees each card with its record as soon as it is resolved.
    pub fn run<F>(&self, collection: &CardCollection, mut on_card: F) -> MatchRun
    where
        F: FnMut(&CardRecord, &MatchRecord),
    {
        let mut stats = RunStats {
            parsed: collection.cards.len(),
            skipped: collection.skipped.len(),
            ..Default::default()
        };

        let records: Vec<MatchRecord> = collection
            .cards
            .iter()
            .map(|card| {
                let record = self.resolve(card);
                debug!(
                    card = %card.file_name,
                    method = ?record.match_method,
                    confidence = ?record.confidence,
                    candidates = record.candidate_count(),
                    "resolved card"
                );
                stats.tally(&record);
                on_card(card, &record);
                record
            })
            .collect();

        MatchRun { records, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<CanonicalEntity> {
        vec![
            CanonicalEntity::new("m-sect")
                .with_sku("2676-LSECT")
                .with_name("Harlow Left Sectional")
                .with_url("https://www.example.com/harlow-left"),
            CanonicalEntity::new("m-item")
                .with_sku("BAS-1342-3")
                .with_name("Brass Floor Lamp")
                .with_url("example.com/item/123"),
            CanonicalEntity::new("m-table")
                .with_sku("7788-DT")
                .with_name("Oak Dining Table - Gray Finish"),
        ]
    }

    fn cascade(entities: &[CanonicalEntity]) -> MatchCascade<'_> {
        MatchCascade::new(entities, MatchConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let entities = registry();
        let config = MatchConfig {
            name_similarity_threshold: -0.1,
            ..Default::default()
        };
        assert!(MatchCascade::new(&entities, config).is_err());
    }

    #[test]
    fn test_url_match() {
        let entities = registry();
        let cascade = cascade(&entities);
        let card = CardRecord::new("lamp.md").with_url("https://Example.com/Item/123/");

        let record = cascade.resolve(&card);
        assert!(record.matched);
        assert_eq!(record.match_method, Some(MatchMethod::Url));
        assert_eq!(record.confidence, Some(Confidence::High));
        assert_eq!(record.primary().unwrap().identifier, "m-item");
    }

    #[test]
    fn test_sku_exact_strips_prefix() {
        let entities = registry();
        let cascade = cascade(&entities);
        let card = CardRecord::new("lamp.md").with_sku("1342_3");

        let record = cascade.resolve(&card);
        assert_eq!(record.match_method, Some(MatchMethod::Sku));
        assert_eq!(record.confidence, Some(Confidence::High));
        assert_eq!(record.matches.len(), 1);
    }

    #[test]
    fn test_sku_fuzzy_base_code() {
        let entities = registry();
        let cascade = cascade(&entities);
        let card = CardRecord::new("sofa.md").with_sku("2676-WLSECTL-KIT53");

        let record = cascade.resolve(&card);
        assert_eq!(record.match_method, Some(MatchMethod::SkuFuzzy));
        assert_eq!(record.confidence, Some(Confidence::High));
        assert_eq!(record.primary().unwrap().identifier, "m-sect");
    }

    #[test]
    fn test_sku_fuzzy_ambiguous_is_medium() {
        let entities = vec![
            CanonicalEntity::new("a").with_sku("2676-LSECT"),
            CanonicalEntity::new("b").with_sku("2676-RSECT"),
        ];
        let cascade = cascade(&entities);
        let record = cascade.resolve(&CardRecord::new("sofa.md").with_sku("2676-WLSECTL-KIT53"));

        assert_eq!(record.match_method, Some(MatchMethod::SkuFuzzy));
        assert_eq!(record.confidence, Some(Confidence::Medium));
        let ids: Vec<&str> = record.matches.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sku_fuzzy_disabled() {
        let entities = registry();
        let config = MatchConfig {
            fuzzy_sku_enabled: false,
            ..Default::default()
        };
        let cascade = MatchCascade::new(&entities, config).unwrap();
        let record = cascade.resolve(&CardRecord::new("sofa.md").with_sku("2676-WLSECTL-KIT53"));
        assert!(!record.matched);
    }

    #[test]
    fn test_fuzzy_confidence_monotonic() {
        let entities = registry();
        let cascade = cascade(&entities);
        let mut previous = Confidence::High;
        for count in 1..=6 {
            let current = cascade.fuzzy_confidence(count);
            assert!(current <= previous, "confidence rose at {count}");
            previous = current;
        }
        assert_eq!(cascade.fuzzy_confidence(1), Confidence::High);
        assert_eq!(cascade.fuzzy_confidence(3), Confidence::Medium);
        assert_eq!(cascade.fuzzy_confidence(4), Confidence::Low);
    }

    #[test]
    fn test_name_match() {
        let entities = registry();
        let cascade = cascade(&entities);
        let card = CardRecord::new("table.md").with_name("Gray Oak Dining Table");

        let record = cascade.resolve(&card);
        assert_eq!(record.match_method, Some(MatchMethod::Name));
        assert_eq!(record.confidence, Some(Confidence::Medium));
        assert_eq!(record.primary().unwrap().identifier, "m-table");
        assert!((record.similarity.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_name_candidates_capped_and_sorted() {
        let mut entities: Vec<CanonicalEntity> = (0..7)
            .map(|i| CanonicalEntity::new(format!("e{i}")).with_name("Oak Table Walnut"))
            .collect();
        entities.push(CanonicalEntity::new("best").with_name("Oak Table"));
        let cascade = cascade(&entities);

        let scored = cascade.match_by_name("Oak Table");
        assert_eq!(scored.len(), 5);
        assert_eq!(scored[0].0.identifier, "best");
        assert_eq!(scored[1].0.identifier, "e0");
        assert!(scored.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_url_beats_name() {
        let entities = vec![
            CanonicalEntity::new("by-url").with_url("https://shop.com/p/1").with_name("Walnut Bench"),
            CanonicalEntity::new("by-name").with_name("Gray Oak Dining Table"),
        ];
        let cascade = cascade(&entities);
        let card = CardRecord::new("t.md")
            .with_url("shop.com/p/1/")
            .with_name("Gray Oak Dining Table");

        let record = cascade.resolve(&card);
        assert_eq!(record.match_method, Some(MatchMethod::Url));
        assert_eq!(record.primary().unwrap().identifier, "by-url");
    }

    #[test]
    fn test_missing_fields_unmatched() {
        let entities = registry();
        let cascade = cascade(&entities);
        let record = cascade.resolve(&CardRecord::new("blank.md"));
        assert!(!record.matched);
        assert_eq!(record.match_method, None);
        assert_eq!(record.confidence, None);
        assert!(record.matches.is_empty());
    }

    #[test]
    fn test_run_is_deterministic() {
        let entities = registry();
        let collection = CardCollection {
            cards: vec![
                CardRecord::new("a.md").with_sku("2676-WLSECTL-KIT53"),
                CardRecord::new("b.md").with_name("Gray Oak Dining Table"),
                CardRecord::new("c.md").with_sku("nothing-here"),
                CardRecord::new("d.md").with_url("example.com/item/123"),
            ],
            skipped: Vec::new(),
        };

        let mut seen = Vec::new();
        let first = cascade(&entities).run(&collection, |card, record| {
            seen.push((card.file_name.clone(), record.matched));
        });
        let second = cascade(&entities).run(&collection, |_, _| {});
        assert_eq!(first.records, second.records);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[2], ("c.md".to_string(), false));
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.stats.parsed, 4);
        assert_eq!(first.stats.matched, 3);
        assert_eq!(first.stats.unmatched, 1);
    }
}
