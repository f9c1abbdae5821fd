// src/config/summarizer.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    /// "openai" | "extractive" (case-insensitive)
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "extractive".to_string(),
            api_key: "ENV".to_string(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SummarizerConfig {
    /// Normalize the provider name and resolve `api_key = "ENV"`.
    ///
    /// Only an enabled `openai` provider needs a key; other setups pass through.
    pub fn resolved(&self) -> anyhow::Result<Self> {
        let mut cfg = self.clone();
        cfg.provider = cfg.provider.trim().to_lowercase();
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }

        if !cfg.enabled || cfg.provider != "openai" {
            return Ok(cfg);
        }

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?;
        }
        if cfg.api_key.trim().is_empty() {
            anyhow::bail!("summarizer provider 'openai' enabled without an api key");
        }
        Ok(cfg)
    }
}
