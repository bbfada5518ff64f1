//! Matching configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the match cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum Jaccard score for a name candidate
    pub name_similarity_threshold: f64,
    /// Enables the SKU variant strategy
    pub fuzzy_sku_enabled: bool,
    /// Fuzzy candidate count still rated high
    pub max_fuzzy_matches_high: usize,
    /// Fuzzy candidate count still rated medium
    pub max_fuzzy_matches_medium: usize,
    /// Name candidates kept per card
    pub max_name_candidates: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name_similarity_threshold: 0.6,
            fuzzy_sku_enabled: true,
            max_fuzzy_matches_high: 1,
            max_fuzzy_matches_medium: 3,
            max_name_candidates: 5,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.name_similarity_threshold) {
            return Err(Error::Config(format!(
                "name_similarity_threshold must be within [0, 1], got {}",
                self.name_similarity_threshold
            )));
        }
        if self.max_fuzzy_matches_high == 0 {
            return Err(Error::Config("max_fuzzy_matches_high must be at least 1".into()));
        }
        if self.max_fuzzy_matches_medium < self.max_fuzzy_matches_high {
            return Err(Error::Config(format!(
                "max_fuzzy_matches_medium ({}) must not be below max_fuzzy_matches_high ({})",
                self.max_fuzzy_matches_medium, self.max_fuzzy_matches_high
            )));
        }
        if self.max_name_candidates == 0 {
            return Err(Error::Config("max_name_candidates must be at least 1".into()));
        }
        Ok(())
    }
}
