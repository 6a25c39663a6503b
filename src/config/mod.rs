//! Application Configuration
//!
//! User settings and asset locations stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Classifier settings
    pub classifier: ClassifierConfig,
    /// OCR service settings
    pub ocr: OcrServiceConfig,
    /// Asset file locations
    pub assets: AssetConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            ocr: OcrServiceConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

/// Classification model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Ordered class labels the model was trained with
    pub class_labels: Vec<String>,
    /// Square input resolution expected by the model
    pub input_resolution: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.onnx"),
            class_labels: vec![
                "food waste".to_string(),
                "paper".to_string(),
                "plastic bottle".to_string(),
            ],
            input_resolution: crate::vision::MODEL_INPUT_RESOLUTION,
        }
    }
}

/// Remote OCR service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrServiceConfig {
    /// Service endpoint
    pub endpoint: String,
    /// API key; empty means not configured yet
    pub api_key: String,
    /// Language hint sent with each request
    pub language: String,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.ocr.space/parse/image".to_string(),
            api_key: String::new(),
            language: "eng".to_string(),
        }
    }
}

/// Locations of rule and vocabulary assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Rule table file, one `material:bin` pair per line
    pub rules_path: PathBuf,
    /// Known bin-label vocabulary, one label per line
    pub bin_labels_path: PathBuf,
    /// Root directory of the card pools
    pub cards_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("trashrules.txt"),
            bin_labels_path: PathBuf::from("binlabels.txt"),
            cards_dir: PathBuf::from("cards"),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.classifier.input_resolution, 224);
        assert_eq!(
            config.classifier.class_labels,
            ["food waste", "paper", "plastic bottle"]
        );

        assert_eq!(config.ocr.endpoint, "https://api.ocr.space/parse/image");
        assert_eq!(config.ocr.language, "eng");
        assert!(config.ocr.api_key.is_empty());

        assert_eq!(config.assets.rules_path, PathBuf::from("trashrules.txt"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.classifier.class_labels, config.classifier.class_labels);
        assert_eq!(parsed.ocr.endpoint, config.ocr.endpoint);
        assert_eq!(parsed.assets.cards_dir, config.assets.cards_dir);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.ocr.api_key = "K1234".to_string();
        config.classifier.model_path = PathBuf::from("/models/waste.onnx");

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.ocr.api_key, "K1234");
        assert_eq!(parsed.classifier.model_path, PathBuf::from("/models/waste.onnx"));
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.ocr.language, config.ocr.language);
        assert_eq!(loaded.classifier.input_resolution, config.classifier.input_resolution);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
