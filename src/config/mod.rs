use crate::error::{Error, Result};
use crate::snippet::{DEFAULT_BEGIN, DEFAULT_END, SnippetMarkers};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether images may be pasted or picked, and forwarded on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowImageAttachment {
    #[default]
    Yes,
    No,
    /// Accepted and forwarded, but flagged so the UI can show a notice.
    Warn,
}

impl AllowImageAttachment {
    #[must_use]
    pub fn allows_images(self) -> bool {
        !matches!(self, Self::No)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub allow_image_attachment: AllowImageAttachment,

    /// Visible rows of the collapsed composer. Also drives the oversized
    /// paste threshold.
    pub maximum_rows: usize,

    pub maximum_image_attachments_per_message: usize,

    pub snippet_begin: String,
    pub snippet_end: String,

    /// Debounce window for height recomputation. Default: 100.
    pub resize_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_image_attachment: AllowImageAttachment::Yes,
            maximum_rows: 20,
            maximum_image_attachments_per_message: 5,
            snippet_begin: DEFAULT_BEGIN.to_string(),
            snippet_end: DEFAULT_END.to_string(),
            resize_debounce_ms: 100,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/quill/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("quill").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".quill/config.toml"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum_rows == 0 {
            return Err(Error::Config("maximum_rows must be at least 1".into()));
        }
        for (name, marker) in [
            ("snippet_begin", &self.snippet_begin),
            ("snippet_end", &self.snippet_end),
        ] {
            if marker.is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
            if marker.contains('\n') {
                return Err(Error::Config(format!("{name} must be a single line")));
            }
        }
        if self.snippet_begin == self.snippet_end {
            return Err(Error::Config(
                "snippet_begin and snippet_end must differ".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn markers(&self) -> SnippetMarkers {
        SnippetMarkers::new(&self.snippet_begin, &self.snippet_end)
    }

    #[must_use]
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}
