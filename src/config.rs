use crate::view::{default_columns, CsvColumn};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_EXPORT_FILE_NAME: &str = "students.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub page_size: usize,
    pub export_file_name: String,
    pub csv_columns: Vec<CsvColumn>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            csv_columns: default_columns(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file. Keys it omits keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid config {}", path.to_string_lossy()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = serde_json::from_str(text).context("failed to parse config json")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            bail!("pageSize must be at least 1");
        }
        if self.csv_columns.is_empty() {
            bail!("csvColumns must not be empty");
        }
        if self.export_file_name.trim().is_empty() {
            bail!("exportFileName must not be empty");
        }
        Ok(())
    }
}
