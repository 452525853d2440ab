use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, anyhow, bail};
use tracing::{info, warn};

pub const DEFAULT_PORT: &str = "8000";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Remote { url: String, key: String },
    Memory { profiles: Vec<String> },
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store: StoreBackend,
    pub completion: Option<CompletionConfig>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            info!("No .env file loaded: {e}");
        }

        let completion = match secret("OPENAI_API_KEY") {
            Some(api_key) => Some(CompletionConfig {
                api_key,
                base_url: load_or("OPENAI_BASE_URL", DEFAULT_COMPLETION_URL),
                model: load_or("OPENAI_MODEL", DEFAULT_COMPLETION_MODEL),
            }),
            None => {
                warn!("OPENAI_API_KEY not set, /chat will fail until it is");
                None
            }
        };

        Ok(Self {
            port: try_load("RUST_PORT", DEFAULT_PORT)?,
            store: load_store()?,
            completion,
        })
    }
}

fn load_store() -> anyhow::Result<StoreBackend> {
    let backend = load_or("STORE_BACKEND", "remote");

    match backend.as_str() {
        "remote" => {
            let url = secret("SUPABASE_URL").ok_or_else(|| anyhow!("Missing SUPABASE_URL"))?;
            let key = secret("SUPABASE_KEY").ok_or_else(|| anyhow!("Missing SUPABASE_KEY"))?;

            Ok(StoreBackend::Remote { url, key })
        }
        "memory" => Ok(StoreBackend::Memory {
            profiles: split_ids(&load_or("MEMORY_PROFILES", "")),
        }),
        other => bail!("Unknown STORE_BACKEND {other:?}, expected \"remote\" or \"memory\""),
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default:?}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = load_or(key, default);

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
        .context("Environment misconfigured")
}

/// Environment first, then a docker secret mounted under `/run/secrets`.
fn secret(secret_name: &str) -> Option<String> {
    if let Some(value) = var(secret_name) {
        return Some(value.trim().to_string());
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("{secret_name} not in environment and failed to read {path}: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
