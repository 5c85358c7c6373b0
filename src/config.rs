use std::path::PathBuf;

use crate::models::Language;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub port: u16,
    pub form_path: PathBuf,
    pub default_language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            port: 8080,
            form_path: PathBuf::from("lesson_form.json"),
            default_language: Language::En,
        }
    }
}

impl Config {
    /// Reads the process environment (call `dotenv` first to pick up a `.env` file).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let default_language = match lookup("DEFAULT_LANGUAGE") {
            Some(code) => Language::from_code(&code).unwrap_or_else(|| {
                tracing::warn!("Unsupported DEFAULT_LANGUAGE {:?}, falling back to en", code);
                Language::En
            }),
            None => defaults.default_language,
        };
        Self {
            api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            api_base: lookup("GEMINI_API_BASE").unwrap_or(defaults.api_base),
            model: lookup("GEMINI_MODEL").unwrap_or(defaults.model),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
            form_path: lookup("LESSON_FORM_PATH").map(PathBuf::from).unwrap_or(defaults.form_path),
            default_language,
        }
    }

    /// API key prefix that is safe to log.
    pub fn masked_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}...", key.chars().take(6).collect::<String>()),
            None => "<unset>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.masked_key(), "<unset>");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "AIzaSyExampleKey"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("PORT", "9000"),
            ("DEFAULT_LANGUAGE", "ar"),
            ("LESSON_FORM_PATH", "/tmp/form.json"),
        ]));
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_language, Language::Ar);
        assert_eq!(config.form_path, PathBuf::from("/tmp/form.json"));
        assert_eq!(config.masked_key(), "AIzaSy...");
    }

    #[test]
    fn bad_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "http"), ("DEFAULT_LANGUAGE", "es"), ("GEMINI_API_KEY", " ")]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.api_key, None);
    }
}
