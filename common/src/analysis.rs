//! Match analysis
//!
//! Aggregates over a finished set of MatchRecords: summary statistics,
//! review queues for questionable matches, a 0-100 quality score and a
//! comparison between two runs. Percentages are rounded to one decimal.

use crate::style::StyleReport;
use crate::types::{Confidence, MatchMethod, MatchRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Candidate count from which a match goes to the review queue
pub const MANY_MATCHES: usize = 4;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_products: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleCoverage {
    pub with_styles: usize,
    pub without_styles: usize,
    pub style_coverage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchAnalysis {
    pub summary: MatchSummary,
    pub confidence: BTreeMap<Confidence, usize>,
    pub methods: BTreeMap<MatchMethod, usize>,
    /// Candidate count → number of matched cards
    pub multiple_matches: BTreeMap<usize, usize>,
    pub styles: StyleCoverage,
}

impl MatchAnalysis {
    pub fn confidence_count(&self, tier: Confidence) -> usize {
        self.confidence.get(&tier).copied().unwrap_or(0)
    }
}

/// Summary statistics; style coverage is zero without a style report
pub fn analyze_matches(records: &[MatchRecord], styles: Option<&StyleReport>) -> MatchAnalysis {
    let mut analysis = MatchAnalysis::default();
    analysis.summary.total_products = records.len();

    for record in records.iter().filter(|r| r.matched) {
        analysis.summary.matched += 1;
        if let Some(confidence) = record.confidence {
            *analysis.confidence.entry(confidence).or_default() += 1;
        }
        if let Some(method) = record.match_method {
            *analysis.methods.entry(method).or_default() += 1;
        }
        *analysis
            .multiple_matches
            .entry(record.candidate_count())
            .or_default() += 1;

        let styled = styles.is_some_and(|report| !report.styles_for(&record.cardset.file_name).is_empty());
        if styled {
            analysis.styles.with_styles += 1;
        }
    }

    let matched = analysis.summary.matched;
    analysis.summary.unmatched = records.len() - matched;
    analysis.summary.match_rate = percent(matched, records.len());
    analysis.styles.without_styles = matched - analysis.styles.with_styles;
    analysis.styles.style_coverage = percent(analysis.styles.with_styles, matched);
    analysis
}

/// Card identity plus the detail relevant to one review queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewEntry {
    pub file: String,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub match_count: usize,
    pub method: Option<MatchMethod>,
    pub confidence: Option<Confidence>,
}

impl From<&MatchRecord> for ReviewEntry {
    fn from(record: &MatchRecord) -> Self {
        Self {
            file: record.cardset.file_name.clone(),
            sku: record.cardset.card_sku.clone(),
            name: record.cardset.card_name.clone(),
            url: record.cardset.card_url.clone(),
            match_count: record.candidate_count(),
            method: record.match_method,
            confidence: record.confidence,
        }
    }
}

/// Review queues; a record can sit in several
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProblematicMatches {
    pub low_confidence: Vec<ReviewEntry>,
    pub many_matches: Vec<ReviewEntry>,
    pub no_sku: Vec<ReviewEntry>,
    pub no_url: Vec<ReviewEntry>,
}

impl ProblematicMatches {
    pub fn total(&self) -> usize {
        self.low_confidence.len() + self.many_matches.len() + self.no_sku.len() + self.no_url.len()
    }
}

/// Matched records that deserve a human look
pub fn find_problematic_matches(records: &[MatchRecord]) -> ProblematicMatches {
    let mut problems = ProblematicMatches::default();

    for record in records.iter().filter(|r| r.matched) {
        let entry = ReviewEntry::from(record);

        if record.confidence == Some(Confidence::Low) {
            problems.low_confidence.push(entry.clone());
        }
        if record.candidate_count() >= MANY_MATCHES {
            problems.many_matches.push(entry.clone());
        }
        if crate::types::present(&record.cardset.card_sku).is_none() {
            problems.no_sku.push(entry.clone());
        }
        if crate::types::present(&record.cardset.card_url).is_none() {
            problems.no_url.push(entry);
        }
    }

    problems
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityScore {
    pub overall_score: f64,
    /// 0-40
    pub match_rate_score: f64,
    /// 0-40, tiers weighted 1.0 / 0.5 / 0.2
    pub confidence_score: f64,
    /// 0-20
    pub style_score: f64,
}

pub fn quality_score(analysis: &MatchAnalysis) -> QualityScore {
    let matched = analysis.summary.matched;
    if matched == 0 {
        return QualityScore::default();
    }

    let match_rate_score = (analysis.summary.match_rate * 0.4).min(40.0);
    let weighted = analysis.confidence_count(Confidence::High) as f64 * 1.0
        + analysis.confidence_count(Confidence::Medium) as f64 * 0.5
        + analysis.confidence_count(Confidence::Low) as f64 * 0.2;
    let confidence_score = weighted / matched as f64 * 40.0;
    let style_score = (analysis.styles.style_coverage * 0.2).min(20.0);

    QualityScore {
        overall_score: round1(match_rate_score + confidence_score + style_score),
        match_rate_score: round1(match_rate_score),
        confidence_score: round1(confidence_score),
        style_score: round1(style_score),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub old_matched: usize,
    pub new_matched: usize,
    pub delta_matched: i64,
    pub old_rate: f64,
    pub new_rate: f64,
    pub delta_rate: f64,
    pub confidence_changes: BTreeMap<Confidence, i64>,
}

/// Deltas from `old` to `new`
pub fn compare_runs(old: &[MatchRecord], new: &[MatchRecord]) -> RunComparison {
    let before = analyze_matches(old, None);
    let after = analyze_matches(new, None);

    let confidence_changes = [Confidence::High, Confidence::Medium, Confidence::Low]
        .into_iter()
        .map(|tier| {
            let delta = after.confidence_count(tier) as i64 - before.confidence_count(tier) as i64;
            (tier, delta)
        })
        .collect();

    RunComparison {
        old_matched: before.summary.matched,
        new_matched: after.summary.matched,
        delta_matched: after.summary.matched as i64 - before.summary.matched as i64,
        old_rate: before.summary.match_rate,
        new_rate: after.summary.match_rate,
        delta_rate: round1(after.summary.match_rate - before.summary.match_rate),
        confidence_changes,
    }
}

/// Cards with no candidates, in record order
pub fn unmatched_cards(records: &[MatchRecord]) -> Vec<ReviewEntry> {
    records
        .iter()
        .filter(|r| !r.matched)
        .map(ReviewEntry::from)
        .collect()
}
