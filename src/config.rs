use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tempfile::Builder;

use crate::error::RefineError;

pub const DEFAULT_BASE_URL: &str = "https://api.refine.bio/v1/";
pub const DEFAULT_MAX_CALLS_PER_SECOND: u32 = 10;
pub const CONFIG_FILE_ENV: &str = "REFINEBIO_CONFIG_FILE";
pub const TOKEN_ENV: &str = "REFINEBIO_TOKEN";
pub const BASE_URL_ENV: &str = "REFINEBIO_BASE_URL";
pub const RATE_LIMIT_ENV: &str = "REFINEBIO_API_MAX_CALLS_PER_SECOND";

/// On-disk shape of `~/.refinebio.yaml`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_max_calls_per_second: Option<u32>,
}

/// Resolved client settings. Built once at startup and shared through
/// [`crate::client::Api`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub token: Option<String>,
    pub base_url: String,
    pub api_max_calls_per_second: u32,
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_max_calls_per_second: DEFAULT_MAX_CALLS_PER_SECOND,
            path: PathBuf::from(".refinebio.yaml"),
        }
    }
}

impl Config {
    /// Writes `token` and `base_url` into the backing file, keeping any other
    /// keys already present there.
    pub fn save(&self) -> Result<(), RefineError> {
        let mut updates = vec![("base_url", Value::String(self.base_url.clone()))];
        if let Some(token) = &self.token {
            updates.push(("token", Value::String(token.clone())));
        }
        ConfigLoader::merge_into_file(&self.path, &updates)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves the config from the process environment and the YAML file.
    pub fn resolve() -> Result<Config, RefineError> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Same as [`ConfigLoader::resolve`] with an injectable environment.
    pub fn resolve_with<F>(env: F) -> Result<Config, RefineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match non_empty(env(CONFIG_FILE_ENV)) {
            Some(path) => PathBuf::from(path),
            None => default_config_path()?,
        };
        let file = Self::read_file(&path)?;
        Self::resolve_config(path, file, env)
    }

    pub fn resolve_config<F>(path: PathBuf, file: ConfigFile, env: F) -> Result<Config, RefineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(env(TOKEN_ENV)).or(non_empty(file.token));
        let base_url = non_empty(env(BASE_URL_ENV))
            .or(non_empty(file.base_url))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_max_calls_per_second = match non_empty(env(RATE_LIMIT_ENV)) {
            Some(value) => value.trim().parse().map_err(|_| {
                RefineError::ConfigParse(format!("{RATE_LIMIT_ENV} must be an integer, got {value}"))
            })?,
            None => file
                .api_max_calls_per_second
                .unwrap_or(DEFAULT_MAX_CALLS_PER_SECOND),
        };

        Ok(Config {
            token,
            base_url: with_trailing_slash(base_url),
            api_max_calls_per_second,
            path,
        })
    }

    /// A missing or empty file reads as an empty config.
    pub fn read_file(path: &Path) -> Result<ConfigFile, RefineError> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let content =
            fs::read_to_string(path).map_err(|_| RefineError::ConfigRead(path.to_path_buf()))?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(&content).map_err(|err| RefineError::ConfigParse(err.to_string()))
    }

    /// Re-reads the file, overwrites `updates`, and atomically writes it back.
    pub fn merge_into_file(path: &Path, updates: &[(&str, Value)]) -> Result<(), RefineError> {
        let write_err = |message: String| RefineError::ConfigWrite {
            path: path.to_path_buf(),
            message,
        };

        let mut mapping = if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|_| RefineError::ConfigRead(path.to_path_buf()))?;
            match serde_yaml::from_str::<Value>(&content)
                .map_err(|err| RefineError::ConfigParse(err.to_string()))?
            {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(RefineError::ConfigParse(
                        "config file must contain a mapping".to_string(),
                    ));
                }
            }
        } else {
            Mapping::new()
        };

        for (key, value) in updates {
            mapping.insert(Value::String((*key).to_string()), value.clone());
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| write_err(err.to_string()))?;
        let content = serde_yaml::to_string(&Value::Mapping(mapping))
            .map_err(|err| write_err(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".refinebio-config")
            .tempfile_in(&parent)
            .map_err(|err| write_err(err.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| write_err(err.to_string()))?;
        temp.persist(path)
            .map_err(|err| write_err(err.to_string()))?;
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf, RefineError> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".refinebio.yaml"))
        .ok_or_else(|| RefineError::Filesystem("unable to resolve home directory".to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
