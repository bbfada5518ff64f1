//! JSON result files
//!
//! Every command writes one pretty-printed JSON document stamped with
//! `generated_at` and the retailer name. `match` output is read back by
//! `reverse` and `analyze`, `materials` output by `reverse`, `styles` output
//! by `analyze`.

use crate::error::{CardMatchError, Result};
use crate::registry::SkippedRecord;
use cardmatch_common::analysis::{MatchAnalysis, ProblematicMatches, QualityScore, ReviewEntry, RunComparison};
use cardmatch_common::material::MaterialMatch;
use cardmatch_common::style::StyleOverlap;
use cardmatch_common::{
    MatchRecord, MaterialReport, ParseFailure, ReverseReport, RunStats, SceneReport, StyleReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub generated_at: DateTime<Utc>,
    pub retailer: String,
    pub stats: RunStats,
    pub skipped: Vec<ParseFailure>,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Serialize)]
pub struct MaterialOutput {
    pub generated_at: DateTime<Utc>,
    pub retailer: String,
    pub skipped: Vec<ParseFailure>,
    #[serde(flatten)]
    pub report: MaterialReport,
}

#[derive(Debug, Serialize)]
pub struct ReverseOutput {
    pub generated_at: DateTime<Utc>,
    pub retailer: String,
    /// Snapshot records that never became entities
    pub registry_skipped: Vec<SkippedRecord>,
    pub duplicate_identifiers: usize,
    #[serde(flatten)]
    pub report: ReverseReport,
}

#[derive(Debug, Serialize)]
pub struct StyleOutput {
    pub generated_at: DateTime<Utc>,
    pub retailer: String,
    pub skipped_sources: Vec<ParseFailure>,
    #[serde(flatten)]
    pub report: StyleReport,
    pub style_overlap: StyleOverlap,
}

#[derive(Debug, Serialize)]
pub struct SceneOutput {
    pub generated_at: DateTime<Utc>,
    pub retailer: String,
    #[serde(flatten)]
    pub report: SceneReport,
}

#[derive(Debug, Serialize)]
pub struct AnalysisOutput {
    pub generated_at: DateTime<Utc>,
    pub analysis: MatchAnalysis,
    pub quality: QualityScore,
    pub problematic: ProblematicMatches,
    pub unmatched: Vec<ReviewEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<RunComparison>,
}

/// Only the part of a match file that later commands consume
#[derive(Debug, Deserialize)]
struct MatchFile {
    matches: Vec<MatchRecord>,
}

#[derive(Debug, Deserialize)]
struct MaterialFile {
    matches: Vec<MaterialMatch>,
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads the `matches` array of a `match` output file
pub fn load_matches(path: &Path) -> Result<Vec<MatchRecord>> {
    if !path.exists() {
        return Err(CardMatchError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let file: MatchFile = serde_json::from_str(&content)
        .map_err(|e| CardMatchError::InvalidMatches(format!("{}: {}", path.display(), e)))?;
    Ok(file.matches)
}

/// Reads the `matches` array of a `materials` output file
pub fn load_material_matches(path: &Path) -> Result<Vec<MaterialMatch>> {
    if !path.exists() {
        return Err(CardMatchError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let file: MaterialFile = serde_json::from_str(&content)
        .map_err(|e| CardMatchError::InvalidMatches(format!("{}: {}", path.display(), e)))?;
    Ok(file.matches)
}

/// Reads a `styles` output file
pub fn load_style_report(path: &Path) -> Result<StyleReport> {
    if !path.exists() {
        return Err(CardMatchError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
