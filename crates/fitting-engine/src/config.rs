use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

const CREDENTIAL_KEYS: &[&str] = &["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];
const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 15.0;
const MAX_TIMEOUT_S: f64 = 300.0;

#[derive(Clone, PartialEq)]
pub struct EditorConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for EditorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EditorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Values are trimmed and
    /// blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = CREDENTIAL_KEYS
            .iter()
            .find_map(|key| read(key))
            .ok_or(ConfigError::MissingCredential)?;
        let api_base = read("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = read("FITTING_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_s = read("FITTING_REQUEST_TIMEOUT")
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_TIMEOUT_S)
            .clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S);

        Ok(Self {
            api_key,
            api_base,
            model,
            request_timeout: Duration::from_secs_f64(timeout_s),
        })
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model.map(str::trim).filter(|value| !value.is_empty()) {
            self.model = model.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_credential_is_an_error() {
        let err = EditorConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() -> anyhow::Result<()> {
        let config = EditorConfig::from_lookup(lookup(&[("API_KEY", " secret ")]))?;
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        Ok(())
    }

    #[test]
    fn credential_keys_are_checked_in_order() -> anyhow::Result<()> {
        let config = EditorConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "gemini"),
        ]))?;
        assert_eq!(config.api_key, "gemini");
        Ok(())
    }

    #[test]
    fn overrides_are_trimmed_and_clamped() -> anyhow::Result<()> {
        let config = EditorConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_API_BASE", "http://localhost:8080/v1beta/"),
            ("FITTING_MODEL", "gemini-custom"),
            ("FITTING_REQUEST_TIMEOUT", "2"),
        ]))?;
        assert_eq!(config.api_base, "http://localhost:8080/v1beta");
        assert_eq!(config.model, "gemini-custom");
        assert_eq!(config.request_timeout, Duration::from_secs(15));

        let config = config.with_model(Some(" other-model "));
        assert_eq!(config.model, "other-model");
        let config = config.with_model(Some(""));
        assert_eq!(config.model, "other-model");
        Ok(())
    }

    #[test]
    fn debug_redacts_key() -> anyhow::Result<()> {
        let config = EditorConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "top-secret")]))?;
        assert!(!format!("{config:?}").contains("top-secret"));
        Ok(())
    }
}
