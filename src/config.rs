use std::fmt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CircleError, Result};

const DEFAULT_SCHEMA: &str = "circle";

/// Which storage adapter backs the tracker.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite file on this machine
    #[default]
    Local,
    /// Supabase project reached over its REST API
    Hosted,
}

impl Backend {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "sqlite" => Ok(Backend::Local),
            "hosted" | "supabase" => Ok(Backend::Hosted),
            other => Err(CircleError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Hosted => write!(f, "hosted"),
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct HostedConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub schema: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    pub database_path: Option<PathBuf>,
    pub default_team: Option<String>,
    #[serde(default, skip_serializing_if = "HostedConfig::is_empty")]
    pub hosted: HostedConfig,
}

/// Resolved connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct HostedCredentials {
    pub url: Url,
    pub api_key: String,
    pub schema: String,
}

impl HostedConfig {
    fn is_empty(&self) -> bool {
        self.url.is_none() && self.api_key.is_none() && self.schema.is_none()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(config_path).map_err(|e| CircleError::ConfigRead {
                path: config_path.to_path_buf(),
                source: e,
            })?;

        toml::from_str(&contents).map_err(|e| CircleError::ConfigParse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let write_err = |e| CircleError::ConfigWrite {
            path: config_path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents = toml::to_string(self).map_err(|e| CircleError::ConfigWrite {
            path: config_path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        std::fs::write(config_path, contents).map_err(write_err)
    }

    /// Config file location; `CIRCLE_CONFIG` overrides the platform default.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = env_var("CIRCLE_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "circle").ok_or(CircleError::NoConfigDir)
    }

    /// Get backend with env var taking precedence over config file
    pub fn backend(&self) -> Result<Backend> {
        match env_var("CIRCLE_BACKEND") {
            Some(raw) => Backend::parse(&raw),
            None => Ok(self.backend),
        }
    }

    /// SQLite file path: env, then config file, then the platform data dir.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = env_var("CIRCLE_DATABASE_PATH") {
            return Ok(PathBuf::from(path));
        }

        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        Self::project_dirs().map(|dirs| dirs.data_dir().join("circle.sqlite"))
    }

    pub fn hosted_credentials(&self) -> Result<HostedCredentials> {
        let url = env_var("CIRCLE_HOSTED_URL")
            .or_else(|| self.hosted.url.clone())
            .ok_or(CircleError::MissingHostedCredentials)?;
        let api_key = env_var("CIRCLE_API_KEY")
            .or_else(|| self.hosted.api_key.clone())
            .ok_or(CircleError::MissingHostedCredentials)?;
        let schema = self
            .hosted
            .schema
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        let url = Url::parse(&url).map_err(|_| CircleError::InvalidUrl(url.clone()))?;

        Ok(HostedCredentials {
            url,
            api_key,
            schema,
        })
    }

    /// Get team, preferring explicit argument over default
    pub fn resolve_team(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(String::from)
            .or_else(|| self.default_team.clone())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.backend, Backend::Local);
        assert!(config.database_path.is_none());
        assert!(config.default_team.is_none());
    }

    #[test]
    fn parses_hosted_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
backend = "hosted"
default_team = "ENG"

[hosted]
url = "https://example.supabase.co"
api_key = "secret"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.backend, Backend::Hosted);
        assert_eq!(config.resolve_team(None).as_deref(), Some("ENG"));
        assert_eq!(config.resolve_team(Some("OPS")).as_deref(), Some("OPS"));
        assert_eq!(config.hosted.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(CircleError::ConfigParse { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            backend: Backend::Local,
            database_path: Some(dir.path().join("db.sqlite")),
            default_team: Some("ENG".to_string()),
            hosted: HostedConfig::default(),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.database_path, config.database_path);
        assert_eq!(loaded.default_team.as_deref(), Some("ENG"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("[hosted]"));
    }

    #[test]
    fn backend_names() {
        assert_eq!(Backend::parse("Local").unwrap(), Backend::Local);
        assert_eq!(Backend::parse("supabase").unwrap(), Backend::Hosted);
        assert!(matches!(
            Backend::parse("postgres"),
            Err(CircleError::UnknownBackend(_))
        ));
    }
}
