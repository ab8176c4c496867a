use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Sources,
    pub auth: Auth,
    pub store: StoreSettings,
    pub stats: StatsSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Webhook,
    Gmail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub kind: SourceKind,
    pub classify_url: String,
    pub sync_url: String,
    pub gmail_label: String,
    pub gmail_max_results: u32,
    pub gmail_concurrency: usize,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            kind: SourceKind::Webhook,
            classify_url: "https://n8n.1000.school/webhook/gmail-filter".to_string(),
            sync_url: "https://n8n.1000.school/webhook/gmail-sync".to_string(),
            gmail_label: "INBOX".to_string(),
            gmail_max_results: 50,
            gmail_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// Environment variable holding the provider access token.
    pub access_token_env: String,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            access_token_env: "SPONSORBOX_ACCESS_TOKEN".to_string(),
        }
    }
}

impl Auth {
    pub fn access_token(&self) -> Option<String> {
        std::env::var(&self.access_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:sponsorbox.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    pub high_value_category: String,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            high_value_category: "sponsorship".to_string(),
        }
    }
}

impl StatsSettings {
    pub fn high_value(&self) -> Category {
        Category::from(self.high_value_category.as_str())
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(SETTINGS_FILE)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid settings, using defaults");
                Self::default()
            }
        }
    }
}
