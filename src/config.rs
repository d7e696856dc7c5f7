/// Application configuration
///
/// Loaded once at startup from the environment (a `.env` file is honored).
/// Only the API key is required; everything else has a default.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or API_KEY) environment variable is not set")]
    MissingApiKey,

    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}

/// Editor configuration
#[derive(Clone)]
pub struct Config {
    /// Gemini API key
    pub api_key: String,
    /// API root, without a trailing slash
    pub base_url: String,
    /// Model used for image edits (and upscaling)
    pub edit_model: String,
    /// Model used for prompt enhancement
    pub text_model: String,
    /// Model used for text-to-image generation
    pub image_model: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Starting directory for save dialogs
    pub download_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                         |
    /// |------------------------------|---------------------------------|
    /// | `GEMINI_API_KEY` / `API_KEY` | required                        |
    /// | `GEMINI_BASE_URL`            | Google Generative Language v1beta |
    /// | `INKLY_EDIT_MODEL`           | `gemini-2.5-flash-image`        |
    /// | `INKLY_TEXT_MODEL`           | `gemini-2.5-flash`              |
    /// | `INKLY_IMAGE_MODEL`          | `imagen-4.0-generate-001`       |
    /// | `INKLY_REQUEST_TIMEOUT_SECS` | `120`                           |
    /// | `INKLY_DOWNLOAD_DIR`         | the user's download directory   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = var("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = match var("INKLY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        name: "INKLY_REQUEST_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let download_dir = var("INKLY_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_download_dir);

        Ok(Self {
            api_key,
            base_url,
            edit_model: var("INKLY_EDIT_MODEL").unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_string()),
            text_model: var("INKLY_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: var("INKLY_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            request_timeout,
            download_dir,
        })
    }
}

/// ~/Downloads, falling back to the home directory, then the working directory
fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

// Never print the key
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("edit_model", &self.edit_model)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("request_timeout", &self.request_timeout)
            .field("download_dir", &self.download_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("GEMINI_API_KEY", "secret")]).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.edit_model, DEFAULT_EDIT_MODEL);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            load(&[("GEMINI_API_KEY", "  ")]),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_api_key_fallback_and_overrides() {
        let config = load(&[
            ("API_KEY", "legacy"),
            ("GEMINI_BASE_URL", "http://localhost:8080/v1/"),
            ("INKLY_TEXT_MODEL", "gemini-test"),
            ("INKLY_REQUEST_TIMEOUT_SECS", "15"),
            ("INKLY_DOWNLOAD_DIR", "/tmp/out"),
        ])
        .unwrap();

        assert_eq!(config.api_key, "legacy");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.text_model, "gemini-test");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_invalid_timeout() {
        for bad in ["soon", "0", "-3"] {
            let result = load(&[("GEMINI_API_KEY", "k"), ("INKLY_REQUEST_TIMEOUT_SECS", bad)]);
            assert!(matches!(result, Err(ConfigError::InvalidTimeout { .. })));
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let config = load(&[("GEMINI_API_KEY", "super-secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
