//! Writing generated candidates to disk.
//!
//! Files are named `generated-image-<timestamp>.png`, where the timestamp is
//! the UTC time truncated to seconds with `:` and `T` replaced by `-`
//! (e.g. `generated-image-2024-05-01-13-45-09.png`).

use crate::error::{AppError, Result};
use crate::image_processing::{EncodedImage, ImageProcessor};
use crate::state::GenerationResult;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const PREFIX: &str = "generated-image";

pub fn file_name(now: DateTime<Utc>) -> String {
    format!("{PREFIX}-{}.png", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Name for the `index`-th (0-based) candidate when saving a whole result.
pub fn numbered_file_name(now: DateTime<Utc>, index: usize) -> String {
    format!("{PREFIX}-{}-{}.png", now.format("%Y-%m-%d-%H-%M-%S"), index + 1)
}

/// Writes one candidate as PNG into `dir`, creating it when needed.
pub fn save(image: &EncodedImage, dir: &Path, name: &str) -> Result<PathBuf> {
    let png = ImageProcessor::to_png(image)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, png)?;
    tracing::info!(path = %path.display(), "saved generated image");
    Ok(path)
}

/// Writes the currently selected candidate.
pub fn save_selected(result: &GenerationResult, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let image = result
        .selected()
        .ok_or_else(|| AppError::input_missing("There is no generated image to download."))?;
    save(image, dir, &file_name(now))
}

/// Writes every candidate, numbered in result order.
pub fn save_all(result: &GenerationResult, dir: &Path, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    result
        .images()
        .iter()
        .enumerate()
        .map(|(index, image)| save(image, dir, &numbered_file_name(now, index)))
        .collect()
}
