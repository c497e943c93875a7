//! Application config: API credentials, model catalog and data directory
//!
//! Load order: built-in defaults, then `config.toml`, then environment
//! variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_BASE: &str = "GEMINI_API_BASE";
pub const ENV_MODEL: &str = "BRANCHCHAT_MODEL";
pub const ENV_DATA_DIR: &str = "BRANCHCHAT_DATA_DIR";

/// Prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Display name, also the lookup key.
    pub key: String,
    /// Provider-side model id.
    pub id: String,
    pub pricing: ModelPricing,
}

impl ModelSpec {
    fn new(key: &str, id: &str, input_per_1m: f64, output_per_1m: f64) -> Self {
        Self {
            key: key.to_string(),
            id: id.to_string(),
            pricing: ModelPricing {
                input_per_1m,
                output_per_1m,
            },
        }
    }
}

fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("Gemini 2.5 Flash", "gemini-2.5-flash", 0.30, 2.50),
        ModelSpec::new("Gemini 2.5 Pro", "gemini-2.5-pro", 1.25, 10.00),
        ModelSpec::new("Gemini 2.0 Flash", "gemini-2.0-flash", 0.10, 0.40),
    ]
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".branchchat")
}

/// Models the session may call, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
    default_key: String,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelSpec>, default_key: impl Into<String>) -> Result<Self> {
        let default_key = default_key.into();
        if models.is_empty() {
            return Err(SessionError::Config("model catalog is empty".to_string()));
        }
        if !models.iter().any(|m| m.key == default_key) {
            return Err(SessionError::UnknownModel(default_key));
        }
        Ok(Self {
            models,
            default_key,
        })
    }

    pub fn get(&self, key: &str) -> Result<&ModelSpec> {
        self.models
            .iter()
            .find(|m| m.key == key)
            .ok_or_else(|| SessionError::UnknownModel(key.to_string()))
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        let models = default_models();
        let default_key = models[0].key.clone();
        Self {
            models,
            default_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub default_model: String,
    pub data_dir: PathBuf,
    pub models: Vec<ModelSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let models = default_models();
        Self {
            api_key: None,
            api_base: None,
            default_model: models[0].key.clone(),
            data_dir: default_data_dir(),
            models,
        }
    }
}

impl AppConfig {
    /// Load the config.
    ///
    /// An explicit `path` must exist and parse. Without one, `config.toml` in
    /// the default data directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_data_dir().join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.catalog()?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            default_model = %config.default_model,
            models = config.models.len(),
            has_api_key = config.api_key.is_some(),
            "Config loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| SessionError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = get(ENV_API_BASE) {
            self.api_base = Some(api_base);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.default_model = model;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn catalog(&self) -> Result<ModelCatalog> {
        ModelCatalog::new(self.models.clone(), self.default_model.clone())
    }

    /// Directory holding saved conversations.
    pub fn conversations_dir(&self) -> PathBuf {
        self.data_dir.join("conversations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_data_dir_under_home() {
        let dir = default_data_dir();
        assert!(dir.ends_with(".branchchat"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dir, home.join(".branchchat"));
        }
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let config = AppConfig::default();
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.default_key(), "Gemini 2.5 Flash");
        assert_eq!(catalog.get("Gemini 2.5 Pro").unwrap().id, "gemini-2.5-pro");
        assert!(matches!(
            catalog.get("GPT"),
            Err(SessionError::UnknownModel(key)) if key == "GPT"
        ));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml("api_key = \"abc\"\n").unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.models.len(), 3);
    }

    #[test]
    fn test_toml_model_list() {
        let content = r#"
default_model = "Local"
data_dir = "/tmp/branchchat"

[[models]]
key = "Local"
id = "local-model"
pricing = { input_per_1m = 0.0, output_per_1m = 0.0 }
"#;
        let config = AppConfig::from_toml(content).unwrap();
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.get("Local").unwrap().id, "local-model");
        assert_eq!(config.conversations_dir(), PathBuf::from("/tmp/branchchat/conversations"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            AppConfig::from_toml("models = 3"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_overrides_win_and_skip_empty_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "from-env"),
            (ENV_MODEL, "Gemini 2.5 Pro"),
            (ENV_DATA_DIR, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        let before_dir = config.data_dir.clone();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.default_model, "Gemini 2.5 Pro");
        assert_eq!(config.data_dir, before_dir);
    }

    #[test]
    fn test_unknown_default_model_rejected() {
        let mut config = AppConfig::default();
        config.default_model = "Nope".to_string();
        assert!(matches!(config.catalog(), Err(SessionError::UnknownModel(_))));
    }
}
