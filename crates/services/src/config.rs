use std::env;

use storage::http::DEFAULT_BASE_URL;

use crate::tutor::OpenAiConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://tutor.sqlite3";

/// Runtime settings, read from `TUTOR_*` environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub db_url: String,
    /// Serve content from the local database instead of the REST API.
    pub offline: bool,
    pub ai: Option<OpenAiConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_owned(),
            db_url: DEFAULT_DB_URL.to_owned(),
            offline: false,
            ai: None,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::from_vars(|key| env::var(key).ok());
        config.ai = OpenAiConfig::from_env();
        config
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_url: non_blank(var("TUTOR_API_URL")).unwrap_or(defaults.api_url),
            db_url: non_blank(var("TUTOR_DB_URL")).unwrap_or(defaults.db_url),
            offline: var("TUTOR_OFFLINE").is_some_and(|v| is_truthy(&v)),
            ai: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let cfg = config(&[("TUTOR_API_URL", "  ")]);
        assert_eq!(cfg.api_url, "http://localhost:5000/api");
        assert_eq!(cfg.db_url, DEFAULT_DB_URL);
        assert!(!cfg.offline);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("TUTOR_API_URL", "https://learn.example.com/api"),
            ("TUTOR_DB_URL", "sqlite::memory:"),
            ("TUTOR_OFFLINE", "Yes"),
        ]);
        assert_eq!(cfg.api_url, "https://learn.example.com/api");
        assert_eq!(cfg.db_url, "sqlite::memory:");
        assert!(cfg.offline);
    }

    #[test]
    fn offline_needs_a_truthy_value() {
        assert!(!config(&[("TUTOR_OFFLINE", "0")]).offline);
        assert!(!config(&[("TUTOR_OFFLINE", "no")]).offline);
    }
}
