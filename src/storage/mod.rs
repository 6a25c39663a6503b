//! Storage Layer
//!
//! File-backed state shared between pipeline stages. Each stage runs in its
//! own screen (or CLI invocation), so the prediction, the OCR best match and
//! the card log travel through small files in the data directory rather
//! than through memory. Result writes are whole-file atomic-by-replacement;
//! a reader never observes a partially written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::capture::PixelBuffer;

/// Persisted stand-in for "no vocabulary label cleared the match threshold"
pub const NO_MATCH_SENTINEL: &str = "none";

/// Material reported when the prediction file cannot be read
pub const UNKNOWN_MATERIAL: &str = "unknown";

/// Get the default application data directory
pub fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "wastescanner", "WasteScanner")
        .context("Could not determine data directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// Get the default configuration directory
pub fn default_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "wastescanner", "WasteScanner")
        .context("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// File store carrying results between pipeline stages
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open a store rooted at the default data directory
    pub fn open_default() -> Result<Self> {
        Self::open(default_data_dir()?)
    }

    /// Open a store rooted at `root`, creating it if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory {:?}", root))?;
        Ok(Self { root })
    }

    /// Store root, for diagnostics
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn prediction_path(&self) -> PathBuf {
        self.root.join("Prediction").join("prediction.txt")
    }

    fn ocr_path(&self) -> PathBuf {
        self.root.join("OCR").join("ocr.txt")
    }

    fn card_log_path(&self) -> PathBuf {
        self.root.join("Card_Collection").join("card_collection.txt")
    }

    /// Persist the predicted material label. Overwrites the previous round.
    pub fn write_prediction(&self, label: &str) -> Result<()> {
        let path = self.prediction_path();
        self.write_atomic(&path, &label.trim().to_lowercase())?;
        debug!("Prediction saved to {:?}", path);
        Ok(())
    }

    /// Read back the predicted material. Any failure degrades to
    /// [`UNKNOWN_MATERIAL`], which can never validate as correct.
    pub fn read_prediction(&self) -> String {
        let path = self.prediction_path();
        match fs::read_to_string(&path) {
            Ok(content) => content.trim().to_lowercase(),
            Err(e) => {
                warn!("Prediction not readable at {:?}: {}", path, e);
                UNKNOWN_MATERIAL.to_string()
            }
        }
    }

    /// Persist the OCR best match, or the sentinel when nothing qualified.
    /// Overwrites the previous round.
    pub fn write_ocr(&self, best_match: Option<&str>) -> Result<()> {
        let value = match best_match {
            Some(label) => label.trim().to_lowercase(),
            None => NO_MATCH_SENTINEL.to_string(),
        };
        let path = self.ocr_path();
        self.write_atomic(&path, &value)?;
        debug!("OCR result saved to {:?}", path);
        Ok(())
    }

    /// Read back the OCR best match. Failures degrade to the sentinel.
    pub fn read_ocr(&self) -> String {
        let path = self.ocr_path();
        match fs::read_to_string(&path) {
            Ok(content) => content.trim().to_lowercase(),
            Err(e) => {
                warn!("OCR result not readable at {:?}: {}", path, e);
                NO_MATCH_SENTINEL.to_string()
            }
        }
    }

    /// Append one card identifier to the collection log. The log is
    /// append-only; nothing in the pipeline ever truncates it.
    pub fn append_card(&self, card_id: &str) -> Result<()> {
        let path = self.card_log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open card log {:?}", path))?;
        writeln!(file, "{}", card_id)
            .with_context(|| format!("Failed to append to card log {:?}", path))?;

        debug!("Card '{}' appended to {:?}", card_id, path);
        Ok(())
    }

    /// Read the whole collection, one id per line, oldest first.
    /// A missing log is an empty collection, not an error.
    pub fn read_card_log(&self) -> Vec<String> {
        match fs::read_to_string(self.card_log_path()) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Persist the square pre-inference crop for diagnostics
    pub fn save_classify_snapshot(&self, frame: &PixelBuffer) -> Result<PathBuf> {
        let dir = self.root.join("Compared");
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
        let path = dir.join("predicted_square_image.png");

        let img = frame
            .to_image()
            .context("Frame buffer length does not match its dimensions")?;
        img.save(&path)
            .with_context(|| format!("Failed to save snapshot {:?}", path))?;

        debug!("Saved classification snapshot to {:?}", path);
        Ok(path)
    }

    /// Persist the encoded bin-label snapshot for diagnostics
    pub fn save_label_snapshot(&self, jpeg_bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.root.join("OCR_image");
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
        let path = dir.join("image.jpg");
        fs::write(&path, jpeg_bytes)
            .with_context(|| format!("Failed to save snapshot {:?}", path))?;

        debug!("Saved label snapshot to {:?}", path);
        Ok(path)
    }

    /// Replace the contents of `path` in one step: write to a temp file in
    /// the same directory, then rename over the target.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let parent = path
            .parent()
            .context("Result path has no parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write temp file {:?}", temp_path))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move {:?} into place", temp_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ResultStore) {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_prediction_roundtrip_normalizes() {
        let (_dir, store) = store();
        store.write_prediction("  Plastic Bottle \n").unwrap();
        assert_eq!(store.read_prediction(), "plastic bottle");
    }

    #[test]
    fn test_prediction_overwrites_previous_round() {
        let (_dir, store) = store();
        store.write_prediction("paper").unwrap();
        store.write_prediction("food waste").unwrap();
        assert_eq!(store.read_prediction(), "food waste");
    }

    #[test]
    fn test_missing_prediction_degrades_to_unknown() {
        let (_dir, store) = store();
        assert_eq!(store.read_prediction(), UNKNOWN_MATERIAL);
    }

    #[test]
    fn test_ocr_roundtrip_and_sentinel() {
        let (_dir, store) = store();
        store.write_ocr(Some("Blue Bin")).unwrap();
        assert_eq!(store.read_ocr(), "blue bin");

        store.write_ocr(None).unwrap();
        assert_eq!(store.read_ocr(), NO_MATCH_SENTINEL);
    }

    #[test]
    fn test_missing_ocr_degrades_to_sentinel() {
        let (_dir, store) = store();
        assert_eq!(store.read_ocr(), NO_MATCH_SENTINEL);
    }

    #[test]
    fn test_card_log_appends_in_order() {
        let (_dir, store) = store();
        store.append_card("ace_of_bottles").unwrap();
        store.append_card("soggy_boot").unwrap();
        store.append_card("ace_of_bottles").unwrap();
        assert_eq!(
            store.read_card_log(),
            ["ace_of_bottles", "soggy_boot", "ace_of_bottles"]
        );
    }

    #[test]
    fn test_card_log_grows_one_line_per_append() {
        let (_dir, store) = store();
        for i in 0..5 {
            store.append_card(&format!("card_{}", i)).unwrap();
            assert_eq!(store.read_card_log().len(), i + 1);
        }
    }

    #[test]
    fn test_missing_card_log_is_empty_collection() {
        let (_dir, store) = store();
        assert!(store.read_card_log().is_empty());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_residue() {
        let (_dir, store) = store();
        store.write_prediction("paper").unwrap();
        let dir = store.root().join("Prediction");
        let names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["prediction.txt"]);
    }

    #[test]
    fn test_classify_snapshot_is_written() {
        let (_dir, store) = store();
        let frame = PixelBuffer::filled(4, 4, 100);
        let path = store.save_classify_snapshot(&frame).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_label_snapshot_is_written() {
        let (_dir, store) = store();
        let path = store.save_label_snapshot(&[0xff, 0xd8, 0xff, 0xd9]).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(path).unwrap(), [0xff, 0xd8, 0xff, 0xd9]);
    }
}
