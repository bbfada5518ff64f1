//! Style scene extraction
//!
//! Style documents (room scenes, lookbooks) embed product references as
//! `{ "name": "ProductID", "value": "..." }` fragments in their text. Each
//! reference is resolved against a card index and a registry index, and the
//! resolved card files are collected into style associations.
//!
//! ## Resolution order for one token
//! 1. exact token, card side then registry side
//! 2. every lookup variant (sorted), card then registry per variant
//! 3. compact lookup key, card then registry

use crate::error::{Error, Result};
use crate::index::VariantIndex;
use crate::normalizer::{lookup_key, lookup_variants};
use crate::reverse::CardRef;
use crate::types::{present, CanonicalEntity, CardRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

lazy_static::lazy_static! {
    static ref PRODUCT_ID_RE: Regex =
        Regex::new(r#"\{\s*"name"\s*:\s*"ProductID"\s*,\s*"value"\s*:\s*"([^"]+)"\s*\}"#).unwrap();
}

/// One style source document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDocument {
    pub filename: String,
    pub title: String,
    pub url: String,
    pub card_type: String,
    pub text_content: String,
}

impl StyleDocument {
    /// Reads `title`, `url`, `card_type` and `html_extracted.text_content`
    pub fn from_json(filename: &str, json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| Error::Parse {
            source_name: filename.to_string(),
            reason: e.to_string(),
        })?;

        let text = |v: Option<&serde_json::Value>| {
            v.and_then(|v| v.as_str()).unwrap_or_default().to_string()
        };

        let card_type = text(value.get("card_type"));
        Ok(Self {
            filename: filename.to_string(),
            title: text(value.get("title")),
            url: text(value.get("url")),
            card_type: if card_type.is_empty() { "style".to_string() } else { card_type },
            text_content: text(value.pointer("/html_extracted/text_content")),
        })
    }

    pub fn product_ids(&self) -> Vec<String> {
        extract_product_ids(&self.text_content)
    }
}

/// ProductID tokens in document order, duplicates kept
pub fn extract_product_ids(text: &str) -> Vec<String> {
    PRODUCT_ID_RE
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMethod {
    Exact,
    Variant,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    Card,
    Registry,
}

/// Registry identity as written into style output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub model_id: String,
    pub name: Option<String>,
    pub sku: Option<String>,
}

impl From<&CanonicalEntity> for EntityRef {
    fn from(entity: &CanonicalEntity) -> Self {
        Self {
            model_id: entity.identifier.clone(),
            name: entity.name.clone(),
            sku: entity.sku.clone(),
        }
    }
}

/// Outcome for one product reference; at most one side is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResolution {
    pub product_id: String,
    pub card_match: Option<CardRef>,
    pub mb_match: Option<EntityRef>,
    pub match_method: Option<ResolutionMethod>,
}

impl ProductResolution {
    fn unresolved(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            card_match: None,
            mb_match: None,
            match_method: None,
        }
    }

    pub fn side(&self) -> Option<MatchSide> {
        if self.card_match.is_some() {
            Some(MatchSide::Card)
        } else if self.mb_match.is_some() {
            Some(MatchSide::Registry)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAssociation {
    pub title: String,
    pub url: String,
    pub filename: String,
    pub product_count: usize,
    pub products: Vec<ProductResolution>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSummary {
    pub total_styles: usize,
    pub total_product_refs: usize,
    pub matched_to_cards: usize,
    pub matched_to_mb: usize,
    pub unmatched: usize,
}

/// Style seen from a card
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StyleRef {
    pub title: String,
    pub filename: String,
}

/// Cards referenced by more than one style
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleOverlap {
    pub products_with_styles: usize,
    pub products_in_multiple_styles: usize,
    /// (card file, style count), most styles first
    pub top_multi_style: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleReport {
    pub summary: StyleSummary,
    pub styles: Vec<StyleAssociation>,
    /// Card file → styles referencing it, in document order
    pub product_styles: BTreeMap<String, Vec<StyleRef>>,
}

impl StyleReport {
    pub fn styles_for(&self, card_file: &str) -> &[StyleRef] {
        self.product_styles
            .get(card_file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Other card files sharing at least one style, sorted, capped at `limit`
    pub fn related_products(&self, card_file: &str, limit: usize) -> Vec<String> {
        let own: BTreeSet<&StyleRef> = self.styles_for(card_file).iter().collect();
        if own.is_empty() {
            return Vec::new();
        }

        self.product_styles
            .iter()
            .filter(|(file, _)| file.as_str() != card_file)
            .filter(|(_, styles)| styles.iter().any(|s| own.contains(s)))
            .map(|(file, _)| file.clone())
            .take(limit)
            .collect()
    }

    pub fn style_overlap(&self, limit: usize) -> StyleOverlap {
        let mut multi: Vec<(String, usize)> = self
            .product_styles
            .iter()
            .map(|(file, styles)| {
                let distinct: BTreeSet<&StyleRef> = styles.iter().collect();
                (file.clone(), distinct.len())
            })
            .filter(|(_, count)| *count > 1)
            .collect();
        let products_in_multiple_styles = multi.len();

        multi.sort_by(|a, b| b.1.cmp(&a.1));
        multi.truncate(limit);

        StyleOverlap {
            products_with_styles: self.product_styles.len(),
            products_in_multiple_styles,
            top_multi_style: multi,
        }
    }
}

fn index_keys(sku: &Option<String>, name: &Option<String>) -> BTreeSet<String> {
    let mut keys = present(sku).map(lookup_variants).unwrap_or_default();
    if let Some(name) = present(name) {
        keys.insert(lookup_key(name));
    }
    keys
}

/// Card and registry lookup indices for product references
pub struct StyleExtractor<'a> {
    card_index: VariantIndex<'a, CardRecord>,
    registry_index: VariantIndex<'a, CanonicalEntity>,
}

impl<'a> StyleExtractor<'a> {
    pub fn new(cards: &'a [CardRecord], registry: &'a [CanonicalEntity]) -> Self {
        let card_index = VariantIndex::build(cards, |card| index_keys(&card.sku, &card.name));
        let registry_index =
            VariantIndex::build(registry, |entity| index_keys(&entity.sku, &entity.name));
        info!(
            card_keys = card_index.len(),
            registry_keys = registry_index.len(),
            "built style lookup indices"
        );

        Self {
            card_index,
            registry_index,
        }
    }

    fn hit(&self, key: &str, method: ResolutionMethod, product_id: &str) -> Option<ProductResolution> {
        if let Some(card) = self.card_index.first(key) {
            return Some(ProductResolution {
                card_match: Some(CardRef::from(card)),
                match_method: Some(method),
                ..ProductResolution::unresolved(product_id)
            });
        }
        self.registry_index.first(key).map(|entity| ProductResolution {
            mb_match: Some(EntityRef::from(entity)),
            match_method: Some(method),
            ..ProductResolution::unresolved(product_id)
        })
    }

    pub fn resolve_token(&self, product_id: &str) -> ProductResolution {
        self.hit(product_id, ResolutionMethod::Exact, product_id)
            .or_else(|| {
                lookup_variants(product_id)
                    .iter()
                    .find_map(|variant| self.hit(variant, ResolutionMethod::Variant, product_id))
            })
            .or_else(|| self.hit(&lookup_key(product_id), ResolutionMethod::Name, product_id))
            .unwrap_or_else(|| ProductResolution::unresolved(product_id))
    }

    pub fn associate(&self, document: &StyleDocument) -> StyleAssociation {
        let products: Vec<ProductResolution> = document
            .product_ids()
            .iter()
            .map(|token| self.resolve_token(token))
            .collect();

        StyleAssociation {
            title: document.title.clone(),
            url: document.url.clone(),
            filename: document.filename.clone(),
            product_count: products.len(),
            products,
        }
    }

    /// Resolves every document in order and builds the card → styles map
    pub fn run(&self, documents: &[StyleDocument]) -> StyleReport {
        let mut report = StyleReport {
            summary: StyleSummary {
                total_styles: documents.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        for document in documents {
            let association = self.associate(document);
            debug!(style = %document.filename, products = association.product_count, "associated style");

            report.summary.total_product_refs += association.product_count;
            for product in &association.products {
                match product.side() {
                    Some(MatchSide::Card) => report.summary.matched_to_cards += 1,
                    Some(MatchSide::Registry) => report.summary.matched_to_mb += 1,
                    None => report.summary.unmatched += 1,
                }

                if let Some(card) = &product.card_match {
                    let style = StyleRef {
                        title: document.title.clone(),
                        filename: document.filename.clone(),
                    };
                    let styles = report.product_styles.entry(card.filename.clone()).or_default();
                    if !styles.contains(&style) {
                        styles.push(style);
                    }
                }
            }

            report.styles.push(association);
        }

        info!(
            styles = report.summary.total_styles,
            refs = report.summary.total_product_refs,
            unmatched = report.summary.unmatched,
            "style extraction complete"
        );
        report
    }
}
