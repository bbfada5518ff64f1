use crate::error::{CardMatchError, Result};
use cardmatch_common::MatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CARD_SUFFIX: &str = ".md";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retailer display name used in report headers
    pub retailer: String,
    pub card_suffix: String,
    /// Where outputs go when `-o` is omitted
    pub output_dir: Option<PathBuf>,
    pub matching: MatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retailer: "retailer".into(),
            card_suffix: DEFAULT_CARD_SUFFIX.into(),
            output_dir: None,
            matching: MatchConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.matching.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CardMatchError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("cardmatch").join("config.json"))
    }

    /// Validates and stores a new name threshold
    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        let mut matching = self.matching.clone();
        matching.name_similarity_threshold = threshold;
        matching.validate()?;
        self.matching = matching;
        Ok(())
    }

    /// Output path for `file_name`: explicit path, else output_dir, else cwd
    pub fn output_path(&self, explicit: Option<PathBuf>, file_name: &str) -> PathBuf {
        explicit.unwrap_or_else(|| match &self.output_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        })
    }
}
