//! Card directory scanning
//!
//! Reads every file with the configured suffix directly under the card
//! directory, in file-name order, and runs the card extraction rules over
//! it. Files that cannot be read or carry no identifier are logged and
//! collected as skipped; they never abort the scan.

mod scenes;
mod sources;

pub use scenes::scan_scene_folders;
pub use sources::{load_style_sources, StyleSources};

use crate::error::{CardMatchError, Result};
use cardmatch_common::{parse_card, parse_material_card, CardCollection, MaterialCollection, ParseFailure};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files directly under `folder` whose name ends with `suffix`, sorted by name
pub fn list_files(folder: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(CardMatchError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Runs `parse` over every file under `folder`; failures are collected
fn scan_with<T>(
    folder: &Path,
    suffix: &str,
    parse: impl Fn(&str, &str) -> std::result::Result<T, ParseFailure>,
) -> Result<(Vec<T>, Vec<ParseFailure>)> {
    let mut parsed = Vec::new();
    let mut skipped = Vec::new();

    for path in list_files(folder, suffix)? {
        let name = file_name(&path);

        let result = std::fs::read_to_string(&path)
            .map_err(|e| ParseFailure::unreadable(name.as_str(), e.to_string()))
            .and_then(|content| parse(&name, &content));

        match result {
            Ok(item) => {
                debug!(card = %name, "parsed card");
                parsed.push(item);
            }
            Err(failure) => {
                warn!(card = %name, kind = ?failure.kind, reason = %failure.reason, "skipped card");
                skipped.push(failure);
            }
        }
    }

    Ok((parsed, skipped))
}

/// Parses every product card under `folder`
pub fn scan_cards(folder: &Path, suffix: &str) -> Result<CardCollection> {
    let (cards, skipped) = scan_with(folder, suffix, parse_card)?;
    Ok(CardCollection { cards, skipped })
}

/// Parses every material card under `folder`
pub fn scan_material_cards(folder: &Path, suffix: &str) -> Result<MaterialCollection> {
    let (cards, skipped) = scan_with(folder, suffix, parse_material_card)?;
    Ok(MaterialCollection { cards, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardmatch_common::FailureKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_cards(Path::new("/nonexistent/folder"), ".md");
        assert!(matches!(result, Err(CardMatchError::FolderNotFound(_))));
    }

    #[test]
    fn test_list_files_filters_suffix_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.md"), "x").unwrap();
        fs::write(dir.path().join("a.md"), "x").unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let files = list_files(dir.path(), ".md").unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.md", "c.md"]);
    }

    #[test]
    fn test_scan_cards_skips_failures() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "<!-- CARD:a -->\n# Oak Table\nSKU: 7788-DT\n").unwrap();
        fs::write(dir.path().join("b.md"), "nothing useful").unwrap();
        fs::write(dir.path().join("c.md"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let collection = scan_cards(dir.path(), ".md").unwrap();
        assert_eq!(collection.cards.len(), 1);
        assert_eq!(collection.cards[0].sku.as_deref(), Some("7788-DT"));
        assert_eq!(collection.skipped.len(), 2);
        assert_eq!(collection.skipped[0].kind, FailureKind::NoIdentifier);
        assert_eq!(collection.skipped[1].kind, FailureKind::Unreadable);
    }

    #[test]
    fn test_scan_material_cards() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("linen-0347-swatch.md"), "**Natural Linen**\nItem: 0347\n").unwrap();
        fs::write(dir.path().join("blank.md"), "no fields").unwrap();

        let collection = scan_material_cards(dir.path(), ".md").unwrap();
        assert_eq!(collection.cards.len(), 1);
        assert_eq!(collection.cards[0].item_numbers, vec!["0347"]);
        assert_eq!(collection.cards[0].filename_ids, vec!["0347"]);
        assert_eq!(collection.skipped.len(), 1);
        assert_eq!(collection.skipped[0].source_name, "blank.md");
    }
}
