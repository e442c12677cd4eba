use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use crate::logging::LogLevel;
use crate::models::{FilterType, StreamSettings};
use crate::simulation::catalog::default_comment_pool;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Values the setup screen collects before going live.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SetupConfig {
    pub viewer_count: u64,
    pub like_count: u64,
    pub host_name: String,
    pub host_avatar: String,
    pub filter: FilterType,
    pub user_count: usize,
    pub comments: Vec<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        let settings = StreamSettings::default();
        Self {
            viewer_count: settings.viewer_count,
            like_count: settings.like_count,
            host_name: settings.host_name,
            host_avatar: settings.host_avatar,
            filter: settings.filter,
            user_count: 20,
            comments: default_comment_pool(),
        }
    }
}

impl SetupConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.comments.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid("comment pool is empty".to_string()));
        }
        if self.user_count == 0 {
            return Err(ConfigError::Invalid("user_count must be at least 1".to_string()));
        }
        Url::parse(&self.host_avatar)
            .map_err(|e| ConfigError::Invalid(format!("host_avatar is not a URL: {}", e)))?;
        Ok(())
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            viewer_count: self.viewer_count,
            like_count: self.like_count,
            host_name: self.host_name.clone(),
            host_avatar: self.host_avatar.clone(),
            filter: self.filter,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub verbose_logging: bool,
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(skip)]
    path: PathBuf,
    /// Key from the environment. Never written back to the file.
    #[serde(skip)]
    env_api_key: Option<String>,
}

impl Config {
    pub const CONFIG_PATH: &'static str = "simulive.conf";

    /// Loads the config file, writing a default one on first run.
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(Self::CONFIG_PATH));
        let mut config = if path.exists() {
            let mut config: Config = toml::from_str(&fs::read_to_string(&path)?)?;
            config.path = path;
            config
        } else {
            let config = Config { path, ..Config::default() };
            config.save()?;
            info!("Wrote default configuration to {}", config.path.display());
            config
        };
        config.apply_env();
        config.setup.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.env_api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .find_map(|name| env::var(name).ok())
            .filter(|k| !k.trim().is_empty());
    }

    /// The key to use: the environment wins over the file.
    pub fn api_key(&self) -> Option<String> {
        self.env_api_key.clone().or_else(|| self.gemini_api_key.clone())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml = toml::to_string(self)?;
        fs::write(&self.path, toml)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_log_level(&mut self, level: LogLevel) -> Result<(), ConfigError> {
        self.log_level = level;
        info!("Log level set to {:?}", self.log_level);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("simulive_cfg_{}_{}", std::process::id(), name))
    }

    #[test]
    fn first_run_writes_defaults() {
        let path = temp_path("fresh.conf");
        let _ = fs::remove_file(&path);

        let config = Config::new(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.setup, SetupConfig::default());
        assert_eq!(config.log_level, LogLevel::INFO);

        let reloaded = Config::new(Some(&path)).unwrap();
        assert_eq!(reloaded.setup.host_name, "小喵悦读");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial.conf");
        fs::write(&path, "log_level = \"DEBUG\"\n\n[setup]\nviewer_count = 12\nfilter = \"bw\"\n").unwrap();

        let config = Config::new(Some(&path)).unwrap();
        assert_eq!(config.log_level, LogLevel::DEBUG);
        assert_eq!(config.setup.viewer_count, 12);
        assert_eq!(config.setup.filter, FilterType::Monochrome);
        assert_eq!(config.setup.user_count, 20);
        assert!(!config.setup.comments.is_empty());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn environment_key_is_not_saved() {
        let path = temp_path("envkey.conf");
        fs::write(&path, "gemini_api_key = \"from-file\"\n").unwrap();

        let mut config = Config::new(Some(&path)).unwrap();
        config.env_api_key = Some("from-env".into());
        assert_eq!(config.api_key().as_deref(), Some("from-env"));

        config.set_log_level(LogLevel::WARN).unwrap();
        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("from-file"));
        assert!(!saved.contains("from-env"));

        config.env_api_key = None;
        assert_eq!(config.api_key().as_deref(), Some("from-file"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_empty_comment_pool() {
        let setup = SetupConfig { comments: vec!["  ".into()], ..SetupConfig::default() };
        assert!(matches!(setup.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn data_url_avatars_are_valid() {
        let setup = SetupConfig { host_avatar: "data:image/png;base64,QUJD".into(), ..SetupConfig::default() };
        assert!(setup.validate().is_ok());
        let setup = SetupConfig { host_avatar: "not a url".into(), ..SetupConfig::default() };
        assert!(setup.validate().is_err());
    }
}
