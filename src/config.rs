//! Configuration loader and validator for the job-sync engine.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::fields::Lang;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub oauth: Oauth,
    pub notion: Notion,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Schema language used when nothing else decides: `"zh"` or `"en"`.
    pub default_language: String,
}

/// OAuth application settings. `client_id` may stay empty when only manual
/// integration tokens are used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Oauth {
    #[serde(default)]
    pub client_id: String,
    /// Usually injected via `NOTION_CLIENT_SECRET` instead of the file.
    #[serde(default)]
    pub client_secret: String,
    pub redirect_port: u16,
}

/// Notion API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notion {
    pub version: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Parsed `app.default_language`; `validate` guarantees this succeeds for
    /// loaded configs.
    pub fn default_lang(&self) -> Lang {
        self.app.default_language.parse().unwrap_or(Lang::Zh)
    }

    pub fn redirect_uri(&self) -> String {
        crate::oauth::redirect_uri(self.oauth.redirect_port)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `NOTION_CLIENT_SECRET` overrides `oauth.client_secret` when set.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(secret) = std::env::var("NOTION_CLIENT_SECRET") {
        if !secret.is_empty() {
            cfg.oauth.client_secret = secret;
        }
    }
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.default_language.parse::<Lang>().is_err() {
        return Err(ConfigError::Invalid("app.default_language must be \"zh\" or \"en\""));
    }

    if cfg.oauth.redirect_port == 0 {
        return Err(ConfigError::Invalid("oauth.redirect_port must be > 0"));
    }
    if !cfg.oauth.client_id.trim().is_empty() && cfg.oauth.client_secret.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "oauth.client_secret (or NOTION_CLIENT_SECRET) must be set when oauth.client_id is",
        ));
    }

    if cfg.notion.version.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.version must be non-empty"));
    }

    Ok(())
}

/// Example configuration YAML.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  default_language: "zh"

oauth:
  client_id: "YOUR_NOTION_OAUTH_CLIENT_ID"
  client_secret: "YOUR_NOTION_OAUTH_CLIENT_SECRET"
  redirect_port: 8976

notion:
  version: "2022-06-28"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.default_lang(), Lang::Zh);
    }

    #[test]
    fn invalid_language() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.default_language = "fr".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("default_language")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_redirect_port() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.oauth.redirect_port = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("redirect_port")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn client_id_without_secret_is_invalid() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.oauth.client_secret = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("client_secret")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn manual_only_config_is_valid() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.oauth.client_id = "".into();
        cfg.oauth.client_secret = "".into();
        validate(&cfg).unwrap();
    }

    #[test]
    fn invalid_notion_version() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.notion.version = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("notion.version")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.oauth.redirect_port, 8976);
        assert_eq!(cfg.notion.version, "2022-06-28");
    }
}
