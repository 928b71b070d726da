use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::render::{Language, RenderMode};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const SERVER_ENV_VAR: &str = "ASK_AI_SERVER";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub render_mode: Option<RenderMode>,
    pub language: Option<Language>,
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub render_mode: Option<RenderMode>,
    pub language: Option<Language>,
}

/// Fully resolved settings the app runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub render_mode: RenderMode,
    pub language: Language,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_render_mode(mode: RenderMode) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.render_mode = Some(mode);
        config.save()
    }

    /// Precedence: command line, then `ASK_AI_SERVER`, then the file, then defaults
    pub fn resolve(&self, overrides: Overrides, env_server: Option<String>) -> Settings {
        let server_url = overrides
            .server_url
            .or(env_server.filter(|s| !s.trim().is_empty()))
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Settings {
            server_url,
            render_mode: overrides.render_mode.or(self.render_mode).unwrap_or_default(),
            language: overrides.language.or(self.language).unwrap_or_default(),
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ask-ai"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Where the `e` key writes the rendered comparison
    pub fn export_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("comparison.html"))
    }
}
