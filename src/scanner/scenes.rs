use super::file_name;
use crate::error::{CardMatchError, Result};
use cardmatch_common::scene::{is_original_image, style_name};
use cardmatch_common::SceneFolder;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Style folders directly under `root`, in folder-name order
///
/// A folder counts when its name yields a style name and it holds an
/// `ORIGINAL_*` render; the first render by file name is used.
pub fn scan_scene_folders(root: &Path) -> Result<Vec<SceneFolder>> {
    if !root.is_dir() {
        return Err(CardMatchError::FolderNotFound(root.display().to_string()));
    }

    let mut folders: Vec<_> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    folders.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut scenes = Vec::new();
    for folder in folders {
        let folder_name = file_name(&folder);
        let Some(style) = style_name(&folder_name) else {
            debug!(folder = %folder_name, "not a style folder");
            continue;
        };

        let mut images: Vec<String> = WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| is_original_image(name))
            .collect();
        images.sort();

        let Some(original_image) = images.into_iter().next() else {
            warn!(folder = %folder_name, "style folder without ORIGINAL_ render, skipped");
            continue;
        };

        scenes.push(SceneFolder {
            style_name: style,
            folder_name,
            original_image,
        });
    }

    Ok(scenes)
}
