use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

use crate::catalogue::SENT_AWAY_PLACE;

pub const DEFAULT_CATALOGUE_SHEET: &str = "catalogo";
pub const DEFAULT_STORE_DIR: &str = "sheets";
pub const DEFAULT_CACHE_DIR: &str = ".";

/// Contents of `bookcart.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Emails allowed to open a session.
    pub allowed_users: Vec<String>,

    #[serde(default = "AppConfig::default_catalogue_sheet")]
    pub catalogue_sheet: String,

    #[serde(default = "AppConfig::default_sent_away_place")]
    pub sent_away_place: String,
}

impl AppConfig {
    pub fn default_catalogue_sheet() -> String {
        DEFAULT_CATALOGUE_SHEET.to_owned()
    }

    pub fn default_sent_away_place() -> String {
        SENT_AWAY_PLACE.to_owned()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw).context("deserialize config json")?;
        if config.allowed_users.iter().all(|u| u.trim().is_empty()) {
            anyhow::bail!("allowed_users must list at least one email");
        }
        if config.catalogue_sheet.trim().is_empty() {
            anyhow::bail!("catalogue_sheet is empty");
        }
        Ok(config)
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        let email = email.trim();
        self.allowed_users
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(email))
    }
}

/// Resolves a directory from an explicit flag, then an environment
/// variable, then a default.
pub fn resolve_dir(flag: Option<&str>, env_var: &str, default: &str) -> PathBuf {
    if let Some(flag) = flag {
        return PathBuf::from(flag);
    }
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
