//! cardmatch common library
//!
//! Entity-resolution engine shared by the CLI and its tests: normalization,
//! variant indices, the match cascade, reverse resolution, material and
//! scene matching, style extraction and match analysis. No file or network
//! IO lives here.

pub mod analysis;
pub mod cascade;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod material;
pub mod normalizer;
pub mod reverse;
pub mod scene;
pub mod style;
pub mod types;

pub use analysis::{analyze_matches, compare_runs, find_problematic_matches, quality_score, unmatched_cards};
pub use cascade::{MatchCascade, MatchRun};
pub use config::MatchConfig;
pub use error::{Error, Result};
pub use extract::{parse_card, FailureKind, ParseFailure};
pub use index::VariantIndex;
pub use material::{claimed_materials, parse_material_card, MaterialCollection, MaterialMatcher, MaterialReport};
pub use reverse::{claimed_identifiers, categorize_orphan, OrphanCategory, ReverseReport, ReverseResolver};
pub use scene::{SceneFolder, SceneMatcher, SceneReport};
pub use style::{StyleDocument, StyleExtractor, StyleReport};
pub use types::{CanonicalEntity, CardCollection, CardRecord, CardSet, Confidence, MatchMethod, MatchRecord, RunStats};
