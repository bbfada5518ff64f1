//! Record types shared by the matcher and the CLI
//!
//! - CanonicalEntity: one registry-side product/material/style
//! - CardRecord: one parsed retailer card
//! - MatchRecord: the cascade result for one card
//! - RunStats: aggregate counts handed back to the caller

use crate::extract::ParseFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identity used for deduplication and claim tracking
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Returns the trimmed field value, or None when absent or blank
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Registry-side record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub identifier: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Dimensions, color, parent, status, kind ...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl CanonicalEntity {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = non_blank(sku);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_blank(url);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

impl Keyed for CanonicalEntity {
    fn key(&self) -> &str {
        &self.identifier
    }
}

/// Retailer-side record parsed from one card file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardRecord {
    pub file_name: String,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub raw_text: String,
}

impl CardRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = non_blank(sku);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_blank(url);
        self
    }

    /// True when the card carries none of SKU, name or URL
    pub fn has_no_identifier(&self) -> bool {
        present(&self.sku).is_none() && present(&self.name).is_none() && present(&self.url).is_none()
    }
}

impl Keyed for CardRecord {
    fn key(&self) -> &str {
        &self.file_name
    }
}

/// Parsed cards plus the sources that could not be parsed
#[derive(Debug, Clone, Default)]
pub struct CardCollection {
    pub cards: Vec<CardRecord>,
    pub skipped: Vec<ParseFailure>,
}

/// Strategy that produced a match, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Url,
    Sku,
    SkuFuzzy,
    Name,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMethod::Url => write!(f, "url"),
            MatchMethod::Sku => write!(f, "sku"),
            MatchMethod::SkuFuzzy => write!(f, "sku_fuzzy"),
            MatchMethod::Name => write!(f, "name"),
        }
    }
}

/// Confidence tier; ordering is low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Card identity as written into match output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    pub file_name: String,
    #[serde(default)]
    pub card_sku: Option<String>,
    #[serde(default)]
    pub card_name: Option<String>,
    #[serde(default)]
    pub card_url: Option<String>,
}

impl From<&CardRecord> for CardSet {
    fn from(card: &CardRecord) -> Self {
        Self {
            file_name: card.file_name.clone(),
            card_sku: card.sku.clone(),
            card_name: card.name.clone(),
            card_url: card.url.clone(),
        }
    }
}

/// Cascade result for one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub cardset: CardSet,
    pub matched: bool,
    pub match_method: Option<MatchMethod>,
    pub confidence: Option<Confidence>,
    /// Top Jaccard score, name matches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub matches: Vec<CanonicalEntity>,
}

impl MatchRecord {
    /// Terminal no-match outcome
    pub fn unmatched(cardset: CardSet) -> Self {
        Self {
            cardset,
            matched: false,
            match_method: None,
            confidence: None,
            similarity: None,
            matches: Vec::new(),
        }
    }

    /// Builds a record from candidates; an empty list yields an unmatched record
    pub fn from_candidates(
        cardset: CardSet,
        method: MatchMethod,
        confidence: Confidence,
        candidates: &[&CanonicalEntity],
        similarity: Option<f64>,
    ) -> Self {
        if candidates.is_empty() {
            return Self::unmatched(cardset);
        }
        Self {
            cardset,
            matched: true,
            match_method: Some(method),
            confidence: Some(confidence),
            similarity,
            matches: candidates.iter().map(|e| (*e).clone()).collect(),
        }
    }

    /// The winning candidate (first in index order)
    pub fn primary(&self) -> Option<&CanonicalEntity> {
        self.matches.first()
    }

    pub fn candidate_count(&self) -> usize {
        self.matches.len()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.matches.len() > 1
    }
}

/// Aggregate counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub parsed: usize,
    pub skipped: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
}

impl RunStats {
    pub fn tally(&mut self, record: &MatchRecord) {
        if record.matched {
            self.matched += 1;
            if record.is_ambiguous() {
                self.ambiguous += 1;
            }
        } else {
            self.unmatched += 1;
        }
    }

    pub fn from_records(records: &[MatchRecord], parsed: usize, skipped: usize) -> Self {
        let mut stats = Self {
            parsed,
            skipped,
            ..Default::default()
        };
        for record in records {
            stats.tally(record);
        }
        stats
    }
}
