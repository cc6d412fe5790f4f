//! Runtime configuration from environment variables with sensible defaults.
//!
//! Configuration errors are fatal at startup; nothing here is recoverable
//! mid-batch.

use std::path::PathBuf;

use thiserror::Error;

pub const APP_NAME: &str = "Freightdesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_INFERENCE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1:8b";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHomeDirectory,

    #[error("remote inference endpoint {url} requires FREIGHTDESK_INFERENCE_API_KEY")]
    MissingCredentials { url: String },

    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: String, value: String },
}

/// Everything the pipeline needs to run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inference_base_url: String,
    pub inference_api_key: Option<String>,
    pub inference_model: String,
    pub inference_timeout_secs: u64,
    pub database_path: PathBuf,
    pub knowledge_db_path: PathBuf,
    pub documents_dir: PathBuf,
    /// Minimum confidence for pipeline auto-validation (inclusive).
    pub auto_validate_threshold: f32,
    /// Minimum confidence for knowledge-base promotion (inclusive).
    pub min_promotion_confidence: f32,
    pub max_few_shot_examples: usize,
}

impl PipelineConfig {
    /// Resolve configuration from `FREIGHTDESK_*` environment variables,
    /// falling back to defaults under the app data directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = app_data_dir()?;

        let inference_base_url = env_or("FREIGHTDESK_INFERENCE_URL", DEFAULT_INFERENCE_URL);
        let inference_api_key = std::env::var("FREIGHTDESK_INFERENCE_API_KEY").ok();

        // Local Ollama needs no key; anything remote does.
        if !is_local_url(&inference_base_url) && inference_api_key.is_none() {
            return Err(ConfigError::MissingCredentials {
                url: inference_base_url,
            });
        }

        let inference_timeout_secs =
            parse_env("FREIGHTDESK_INFERENCE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let auto_validate_threshold = parse_env("FREIGHTDESK_AUTO_VALIDATE_THRESHOLD", 0.8f32)?;
        let min_promotion_confidence = parse_env("FREIGHTDESK_MIN_PROMOTION_CONFIDENCE", 0.85f32)?;
        let max_few_shot_examples = parse_env("FREIGHTDESK_MAX_FEW_SHOT_EXAMPLES", 5usize)?;

        for (var, value) in [
            ("FREIGHTDESK_AUTO_VALIDATE_THRESHOLD", auto_validate_threshold),
            ("FREIGHTDESK_MIN_PROMOTION_CONFIDENCE", min_promotion_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    var: var.into(),
                    value: value.to_string(),
                });
            }
        }

        Ok(Self {
            inference_base_url,
            inference_api_key,
            inference_model: env_or("FREIGHTDESK_INFERENCE_MODEL", DEFAULT_MODEL),
            inference_timeout_secs,
            database_path: path_env("FREIGHTDESK_DATABASE_PATH")
                .unwrap_or_else(|| data_dir.join("freightdesk.db")),
            knowledge_db_path: path_env("FREIGHTDESK_KNOWLEDGE_DB_PATH")
                .unwrap_or_else(|| data_dir.join("knowledge.db")),
            documents_dir: path_env("FREIGHTDESK_DOCUMENTS_DIR")
                .unwrap_or_else(|| data_dir.join("documents")),
            auto_validate_threshold,
            min_promotion_confidence,
            max_few_shot_examples,
        })
    }
}

/// Application data directory: ~/Freightdesk/ on all platforms.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(home.join(APP_NAME))
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,freightdesk=debug"
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn path_env(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: var.into(),
            value: raw,
        }),
    }
}

fn is_local_url(url: &str) -> bool {
    let stripped = url
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    stripped.starts_with("localhost") || stripped.starts_with("127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Freightdesk"));
    }

    #[test]
    fn local_urls_need_no_key() {
        assert!(is_local_url("http://localhost:11434"));
        assert!(is_local_url("http://127.0.0.1:11434"));
        assert!(!is_local_url("https://inference.example.com"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
