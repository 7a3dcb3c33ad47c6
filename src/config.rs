//! Session configuration from defaults, environment, or a JSON file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::prompt::{STRUCTURE_NOTES_SLOT, TASK_TEMPLATE};

pub const FIGURES_DIR_ENV: &str = "DATA_ANALYST_FIGURES_DIR";
pub const DEFAULT_FIGURES_DIR: &str = "./figures";
pub const DEFAULT_STARTING_TEXT: &str = "⏳ _Starting task..._";
pub const DEFAULT_PROCESSING_TEXT: &str = "⏳ _Still processing..._";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory reset at the start of every run and scanned for figures.
    pub figures_dir: PathBuf,
    pub task_template: String,
    /// Placeholder shown after the agent has been started.
    pub starting_text: String,
    /// Placeholder shown after each subsequent step.
    pub processing_text: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            figures_dir: PathBuf::from(DEFAULT_FIGURES_DIR),
            task_template: TASK_TEMPLATE.to_string(),
            starting_text: DEFAULT_STARTING_TEXT.to_string(),
            processing_text: DEFAULT_PROCESSING_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionConfigFile {
    figures_dir: Option<PathBuf>,
    task_template: Option<String>,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(figures_dir) = env_string_opt(FIGURES_DIR_ENV) {
            config.figures_dir = PathBuf::from(figures_dir);
        }
        config
    }

    /// Loads overrides from a JSON file on top of [`SessionConfig::from_env`].
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "reading config",
            path: path.to_path_buf(),
            source,
        })?;
        let file: SessionConfigFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::from_env();
        if let Some(figures_dir) = file.figures_dir {
            config.figures_dir = figures_dir;
        }
        if let Some(task_template) = file.task_template {
            config = config.with_task_template(task_template)?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_figures_dir(mut self, figures_dir: impl Into<PathBuf>) -> Self {
        self.figures_dir = figures_dir.into();
        self
    }

    /// Replaces the prompt template; it must keep the structure notes slot.
    pub fn with_task_template(mut self, template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(STRUCTURE_NOTES_SLOT) {
            return Err(ConfigError::MissingTemplateSlot {
                slot: STRUCTURE_NOTES_SLOT,
            });
        }
        self.task_template = template;
        Ok(self)
    }

    #[must_use]
    pub fn with_placeholders(
        mut self,
        starting_text: impl Into<String>,
        processing_text: impl Into<String>,
    ) -> Self {
        self.starting_text = starting_text.into();
        self.processing_text = processing_text.into();
        self
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
