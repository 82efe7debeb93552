use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::config::{Config, ConfigError, Environment as EnvSource, File, FileFormat};
use serde::{de, Deserialize, Deserializer};

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AppEnvironment {
    Local,
    Development,
    Staging,
    Production,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Local => "local",
            AppEnvironment::Development => "development",
            AppEnvironment::Staging => "staging",
            AppEnvironment::Production => "production",
        }
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AppEnvironment::Local),
            "development" | "dev" => Ok(AppEnvironment::Development),
            "staging" => Ok(AppEnvironment::Staging),
            "production" | "prod" => Ok(AppEnvironment::Production),
            other => Err(format!(
                "unknown environment `{}`, expected one of local, development, staging, production",
                other
            )),
        }
    }
}

impl TryFrom<String> for AppEnvironment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the console log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogFormat {
    Plaintext,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plaintext" => Ok(LogFormat::Plaintext),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`, expected plaintext or json", other)),
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Plaintext => f.write_str("plaintext"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Standard severity names. Parsing is case-insensitive and accepts the
/// `warn` and `fatal` aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The level as a `tracing` filter directive. `tracing` has no level above
    /// error, so critical maps onto it.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" | "fatal" => Ok(LogLevel::Critical),
            other => Err(format!(
                "unknown log level `{}`, expected one of trace, debug, info, warning, error, critical",
                other
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

/// The process-wide, immutable application settings.
///
/// Built once at start-up by [`Settings::load`] (or a [`SettingsLoader`]) and
/// shared read-only behind an `Arc` in [`crate::state::AppState`].
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub environment: AppEnvironment,

    pub log_format: LogFormat,
    pub log_level: LogLevel,
    /// Level for the HTTP server stack (`tower_http`, `hyper`, `axum`).
    /// `UVICORN_LOG_LEVEL` is read when `SERVER_LOG_LEVEL` is not set.
    #[serde(default)]
    pub server_log_level: LogLevel,
    pub request_log_level: LogLevel,
    pub error_log_level: LogLevel,

    pub database_url: String,
    pub database_max_connections: u32,

    pub frontend_host: String,
    #[serde(deserialize_with = "deserialize_origins")]
    pub backend_cors_origins: Vec<String>,

    pub host: String,
    pub port: u16,

    pub app_name: String,
    pub app_version: String,
    pub app_description: String,
}

impl Settings {
    /// Loads settings from the default sources of the current working directory.
    pub fn load() -> Result<Self, SettingsError> {
        SettingsLoader::new().load()
    }

    /// Configured CORS origins without trailing slashes, followed by the
    /// frontend host.
    pub fn all_cors_origins(&self) -> Vec<String> {
        self.backend_cors_origins
            .iter()
            .chain(std::iter::once(&self.frontend_host))
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.port == 0 {
            return Err(SettingsError::Invalid { key: "port", reason: "must be > 0".into() });
        }
        if self.database_url.trim().is_empty() {
            return Err(SettingsError::Invalid { key: "database_url", reason: "must not be empty".into() });
        }
        if self.database_max_connections == 0 {
            return Err(SettingsError::Invalid { key: "database_max_connections", reason: "must be > 0".into() });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Load(#[from] ConfigError),
    #[error("failed to read dotenv file {}: {source}", .path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Builder for [`Settings`] that controls where each layer comes from.
///
/// Precedence, highest first: overrides, dotenv file, process environment,
/// project metadata file, secrets directory, embedded defaults.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    overrides: Vec<(String, ::config::Value)>,
    dotenv_file: Option<PathBuf>,
    environment: Option<HashMap<String, String>>,
    metadata_file: Option<PathBuf>,
    secrets_dir: Option<PathBuf>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Reads `.env` and `Cargo.toml` from the working directory, the process
    /// environment, and the directory named by `SECRETS_DIR` if set.
    pub fn new() -> Self {
        Self {
            overrides: Vec::new(),
            dotenv_file: Some(PathBuf::from(".env")),
            environment: None,
            metadata_file: Some(PathBuf::from("Cargo.toml")),
            secrets_dir: std::env::var_os("SECRETS_DIR").map(PathBuf::from),
        }
    }

    pub fn set_override(mut self, key: &str, value: impl Into<::config::Value>) -> Self {
        self.overrides.push((key.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn dotenv_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv_file = Some(path.into());
        self
    }

    pub fn without_dotenv(mut self) -> Self {
        self.dotenv_file = None;
        self
    }

    /// Uses the given variables instead of the process environment.
    pub fn environment(mut self, vars: HashMap<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    pub fn metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_file = Some(path.into());
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata_file = None;
        self
    }

    pub fn secrets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_dir = Some(path.into());
        self
    }

    pub fn load(self) -> Result<Settings, SettingsError> {
        let mut builder = Config::builder()
            .set_default("app_name", env!("CARGO_PKG_NAME"))?
            .set_default("app_version", env!("CARGO_PKG_VERSION"))?
            .set_default("app_description", env!("CARGO_PKG_DESCRIPTION"))?
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml));

        if let Some(dir) = &self.secrets_dir {
            builder = builder.add_source(flat_source(read_secrets(dir)?));
        }
        if let Some(path) = &self.metadata_file {
            builder = builder.add_source(flat_source(read_project_metadata(path)?));
        }
        builder = match self.environment {
            Some(vars) => builder.add_source(flat_source(vars)),
            None => builder.add_source(EnvSource::default()),
        };
        if let Some(path) = &self.dotenv_file {
            builder = builder.add_source(flat_source(read_dotenv(path)?));
        }
        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }

        let settings: Settings = resolve_legacy_keys(builder.build()?)?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Older deployments name the server level `UVICORN_LOG_LEVEL`. It fills in
/// `server_log_level` only when that key is unset, so setting both is not an
/// error.
fn resolve_legacy_keys(merged: Config) -> Result<Config, SettingsError> {
    let legacy = match merged.get_string(LEGACY_SERVER_LOG_LEVEL) {
        Ok(level) if merged.get_string("server_log_level").is_err() => level,
        _ => return Ok(merged),
    };
    Ok(Config::builder().add_source(merged).set_override("server_log_level", legacy)?.build()?)
}

const LEGACY_SERVER_LOG_LEVEL: &str = "uvicorn_log_level";

/// A layer of flat `KEY=value` pairs. Keys are matched case-insensitively.
fn flat_source(vars: impl IntoIterator<Item = (String, String)>) -> EnvSource {
    EnvSource::default().source(Some(vars.into_iter().collect::<::config::Map<String, String>>()))
}

fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>, SettingsError> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(Vec::new()),
        Err(source) => return Err(SettingsError::Dotenv { path: path.to_path_buf(), source }),
    };
    iter.collect::<Result<Vec<_>, _>>()
        .map_err(|source| SettingsError::Dotenv { path: path.to_path_buf(), source })
}

/// Reads `name`, `version` and `description` from the `[package]` table of a
/// Cargo manifest. Missing files and non-string values are skipped.
fn read_project_metadata(path: &Path) -> Result<Vec<(String, String)>, SettingsError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let manifest = Config::builder().add_source(File::from(path).format(FileFormat::Toml)).build()?;
    let fields = [("name", "app_name"), ("version", "app_version"), ("description", "app_description")];
    Ok(fields
        .into_iter()
        .filter_map(|(field, key)| {
            manifest.get_string(&format!("package.{}", field)).ok().map(|value| (key.to_string(), value))
        })
        .collect())
}

/// One setting per regular file: the file name is the key, the trimmed file
/// content is the value. A configured directory that does not exist is an
/// error.
fn read_secrets(dir: &Path) -> Result<Vec<(String, String)>, SettingsError> {
    if !dir.is_dir() {
        return Err(SettingsError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "secrets directory does not exist"),
        });
    }
    let io_err = |source| SettingsError::Io { path: dir.to_path_buf(), source };
    let mut secrets = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(key) = path.file_name().and_then(|name| name.to_str()).map(str::to_string) else {
            continue;
        };
        let value = std::fs::read_to_string(&path)
            .map_err(|source| SettingsError::Io { path: path.clone(), source })?;
        secrets.push((key, value.trim().to_string()));
    }
    Ok(secrets)
}

/// Accepts a list, a JSON list in a string, or a comma-separated string.
fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Origins {
        List(Vec<String>),
        Text(String),
    }

    match Origins::deserialize(deserializer)? {
        Origins::List(list) => Ok(list),
        Origins::Text(text) => parse_origins(&text).map_err(de::Error::custom),
    }
}

pub(crate) fn parse_origins(text: &str) -> Result<Vec<String>, String> {
    let text = text.trim();
    if text.starts_with('[') {
        return serde_json::from_str(text).map_err(|e| format!("invalid origin list {}: {}", text, e));
    }
    Ok(text.split(',').map(str::trim).filter(|origin| !origin.is_empty()).map(str::to_string).collect())
}
