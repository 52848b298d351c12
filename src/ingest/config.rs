/*!
# Ingest Configuration

Настройки загрузки токенов в хранилище. Формат — TOML:

```toml
trim = true
skip_empty = true
freeze = true
comment_prefix = "#"     # "" отключает комментарии
# пустой список: каждая строка файла — одно значение
fields = ["family", "major", "minor", "patch"]
initial_capacity = 65536
```
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Настройки загрузки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Trim surrounding whitespace from each value
    pub trim: bool,

    /// Skip values that are empty after trimming
    pub skip_empty: bool,

    /// Freeze the store once the input is exhausted
    pub freeze: bool,

    /// Lines starting with this prefix are ignored; empty disables comments
    pub comment_prefix: String,

    /// When non-empty, lines are `key: value` pairs and only these keys are stored
    pub fields: Vec<String>,

    /// Arena bytes reserved before the first value
    pub initial_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            trim: true,
            skip_empty: true,
            freeze: true,
            comment_prefix: "#".to_string(),
            fields: Vec::new(),
            initial_capacity: 0,
        }
    }
}

impl IngestConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read ingest config from {}", path.as_ref().display())
        })?;

        let config: Self = toml::from_str(&content).with_context(|| {
            format!("Failed to parse TOML config from {}", path.as_ref().display())
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize ingest config to TOML")?;

        std::fs::write(&path, content).with_context(|| {
            format!("Failed to write ingest config to {}", path.as_ref().display())
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.comment_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("comment_prefix must not contain whitespace: {:?}", self.comment_prefix);
        }
        if let Some(field) = self.fields.iter().find(|f| f.trim().is_empty() || f.contains(':')) {
            anyhow::bail!("invalid field name: {:?}", field);
        }
        Ok(())
    }

    /// Whether the input is read as `key: value` records.
    pub fn is_keyed(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Works on raw bytes: input lines need not be UTF-8.
    pub fn is_comment<L: AsRef<[u8]>>(&self, line: L) -> bool {
        !self.comment_prefix.is_empty()
            && line.as_ref().trim_ascii_start().starts_with(self.comment_prefix.as_bytes())
    }
}
