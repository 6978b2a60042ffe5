use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::models::ImageEntry;

/// List images in a flat directory, in the order the filesystem returns them.
///
/// Extensions are matched case-insensitively and given without the dot.
/// A missing directory or one without matching images is an error.
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<ImageEntry>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }

    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut images = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read folder {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !wanted.contains(&ext.to_lowercase()) {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        images.push(ImageEntry { path, filename });
    }

    if images.is_empty() {
        bail!("No images with extension {} found in {}", wanted.join("/"), dir.display());
    }

    Ok(images)
}

/// Name recorded in the `folder` element: the directory's last component.
pub fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_default()
}
