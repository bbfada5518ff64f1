//! Command pipelines
//!
//! Each function takes already-loaded inputs and runs one engine pass, so the
//! CLI and the integration tests share the same code path.

use crate::error::Result;
use crate::output::AnalysisOutput;
use cardmatch_common::material::{MaterialCard, MaterialMatch};
use cardmatch_common::{
    analyze_matches, claimed_identifiers, claimed_materials, compare_runs,
    find_problematic_matches, quality_score, unmatched_cards, CanonicalEntity, CardCollection,
    CardRecord, MatchCascade, MatchConfig, MatchRecord, MatchRun, MaterialMatcher, MaterialReport,
    ReverseReport, ReverseResolver, SceneFolder, SceneMatcher, SceneReport, StyleDocument,
    StyleExtractor, StyleReport,
};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Registry `kind` attribute value marking a style record
const STYLE_KIND: &str = "style";

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Runs the cascade over every card
///
/// # Arguments
/// * `registry` - registry snapshot
/// * `collection` - parsed cards plus skipped sources
/// * `config` - engine configuration, validated here
/// * `show_progress` - draw a progress bar on stderr
pub fn match_cards(
    registry: &[CanonicalEntity],
    collection: &CardCollection,
    config: MatchConfig,
    show_progress: bool,
) -> Result<MatchRun> {
    let cascade = MatchCascade::new(registry, config)?;
    let pb = progress_bar(collection.cards.len(), show_progress);

    let run = cascade.run(collection, |card, _| {
        pb.set_message(card.file_name.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    Ok(run)
}

/// Material cards against registry materials, optionally one supplier only
pub fn material_pass(
    registry: &[CanonicalEntity],
    cards: &[MaterialCard],
    supplier: Option<&str>,
) -> MaterialReport {
    MaterialMatcher::new(registry, supplier).run(cards)
}

/// Reverse pass over the entities neither product nor material matches claimed
pub fn reverse_pass(
    registry: &[CanonicalEntity],
    cards: &[CardRecord],
    records: &[MatchRecord],
    materials: &[MaterialMatch],
) -> ReverseReport {
    let mut claimed = claimed_identifiers(records);
    claimed.extend(claimed_materials(materials));
    ReverseResolver::new(cards).run(registry, &claimed)
}

pub fn style_pass(
    registry: &[CanonicalEntity],
    cards: &[CardRecord],
    documents: &[StyleDocument],
) -> StyleReport {
    StyleExtractor::new(cards, registry).run(documents)
}

/// Registry style name → identifier, first record per name
pub fn registry_style_ids(registry: &[CanonicalEntity]) -> BTreeMap<String, String> {
    let mut ids = BTreeMap::new();
    for entity in registry {
        let is_style = entity
            .attributes
            .get("kind")
            .and_then(serde_json::Value::as_str)
            == Some(STYLE_KIND);
        if let (true, Some(name)) = (is_style, entity.name.as_deref()) {
            ids.entry(name.trim().to_string())
                .or_insert_with(|| entity.identifier.clone());
        }
    }
    ids
}

pub fn scene_pass(
    registry: &[CanonicalEntity],
    cards: &[CardRecord],
    folders: &[SceneFolder],
) -> SceneReport {
    SceneMatcher::new(cards).run(folders, &registry_style_ids(registry))
}

/// Statistics, review queues, quality score and optional comparison
pub fn analyze(
    records: &[MatchRecord],
    previous: Option<&[MatchRecord]>,
    styles: Option<&StyleReport>,
) -> AnalysisOutput {
    let analysis = analyze_matches(records, styles);
    let quality = quality_score(&analysis);

    AnalysisOutput {
        generated_at: Utc::now(),
        quality,
        problematic: find_problematic_matches(records),
        unmatched: unmatched_cards(records),
        comparison: previous.map(|old| compare_runs(old, records)),
        analysis,
    }
}
