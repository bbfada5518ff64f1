use super::{file_name, list_files};
use crate::error::Result;
use cardmatch_common::{ParseFailure, StyleDocument};
use std::path::Path;
use tracing::warn;

/// Style documents plus the files that could not be used
#[derive(Debug, Clone, Default)]
pub struct StyleSources {
    pub documents: Vec<StyleDocument>,
    pub skipped: Vec<ParseFailure>,
}

/// Loads every `*.json` style source; unreadable or malformed files are skipped
pub fn load_style_sources(folder: &Path) -> Result<StyleSources> {
    let mut sources = StyleSources::default();

    for path in list_files(folder, ".json")? {
        let name = file_name(&path);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(source = %name, error = %e, "unreadable style source, skipped");
                sources.skipped.push(ParseFailure::unreadable(name.as_str(), e.to_string()));
                continue;
            }
        };

        match StyleDocument::from_json(&name, &content) {
            Ok(document) => sources.documents.push(document),
            Err(e) => {
                warn!(source = %name, error = %e, "invalid style source, skipped");
                sources.skipped.push(ParseFailure::unreadable(name.as_str(), e.to_string()));
            }
        }
    }

    Ok(sources)
}
