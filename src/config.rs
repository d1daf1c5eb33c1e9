use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const ENV_FILE: &str = ".env";
pub const SETTINGS_FILE: &str = "adkit.toml";

/// Loaded configuration: always a string-keyed mapping at the top level.
pub type ConfigMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
    #[default]
    Auto,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Auto => "auto",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "auto" => Ok(ConfigFormat::Auto),
            other => anyhow::bail!("unknown config format '{}'", other),
        }
    }
}

/// Lookup order when the format is `Auto` and the name has no extension.
const AUTO_EXTENSIONS: [&str; 4] = ["yml", "yaml", "json", "toml"];

/// Loads named config files out of one directory and caches the results.
#[derive(Debug)]
pub struct ConfigManager {
    config_dir: PathBuf,
    cache: HashMap<String, ConfigMap>,
}

impl ConfigManager {
    /// `None` means the current working directory.
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(".")),
            cache: HashMap::new(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load `name` from the config directory.
    ///
    /// A missing file is not an error and yields an empty map (which is not cached).
    /// Unreadable or malformed files are errors.
    pub fn load_config(&mut self, name: &str, format: ConfigFormat, use_cache: bool) -> Result<ConfigMap> {
        let cache_key = format!("{}_{}", name, format);
        if use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                return Ok(cached.clone());
            }
        }

        let Some(path) = self.find_config_file(name, format) else {
            tracing::debug!(name, %format, dir = %self.config_dir.display(), "config file not found");
            return Ok(ConfigMap::new());
        };

        let config = parse_config_file(&path)?;
        if use_cache {
            self.cache.insert(cache_key, config.clone());
        }
        Ok(config)
    }

    /// Like [`load_config`](Self::load_config) but logs failures and returns an empty map.
    pub fn load_config_or_empty(&mut self, name: &str, format: ConfigFormat, use_cache: bool) -> ConfigMap {
        match self.load_config(name, format, use_cache) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(name, "failed to load config: {:#}", e);
                ConfigMap::new()
            }
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn find_config_file(&self, name: &str, format: ConfigFormat) -> Option<PathBuf> {
        if !name.contains('.') {
            let ext = match format {
                ConfigFormat::Json => "json",
                ConfigFormat::Yaml => "yml",
                ConfigFormat::Toml => "toml",
                ConfigFormat::Auto => {
                    return AUTO_EXTENSIONS
                        .iter()
                        .map(|ext| self.config_dir.join(format!("{}.{}", name, ext)))
                        .find(|p| p.exists());
                }
            };
            let path = self.config_dir.join(format!("{}.{}", name, ext));
            return path.exists().then_some(path);
        }

        let path = self.config_dir.join(name);
        path.exists().then_some(path)
    }

    /// Read `name` from the environment and convert it to `T`.
    ///
    /// A missing variable, or one that doesn't convert, falls back to `default`
    /// unless `required` is set, in which case it is an error.
    pub fn get_env_var<T: EnvValue>(&self, name: &str, default: Option<T>, required: bool) -> Result<Option<T>> {
        let raw = match std::env::var(name) {
            Ok(v) => v,
            Err(_) if required => anyhow::bail!("Required environment variable '{}' not set", name),
            Err(_) => return Ok(default),
        };

        match T::parse_env(&raw) {
            Some(v) => Ok(Some(v)),
            None if required => anyhow::bail!(
                "Environment variable '{}' cannot be converted to {}",
                name,
                T::TYPE_NAME
            ),
            None => {
                tracing::debug!(name, expected = T::TYPE_NAME, "env var did not convert, using default");
                Ok(default)
            }
        }
    }

    /// Shallow merge: keys from later maps replace earlier ones.
    pub fn merge_configs(&self, configs: &[ConfigMap]) -> ConfigMap {
        let mut merged = ConfigMap::new();
        for config in configs {
            for (k, v) in config {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }

    /// Fail with the full list of missing top-level keys.
    pub fn validate_config(&self, config: &ConfigMap, required_keys: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required_keys
            .iter()
            .copied()
            .filter(|k| !config.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "missing required config keys");
            anyhow::bail!("Missing required config keys: {}", missing.join(", "));
        }
        Ok(())
    }
}

fn parse_config_file(path: &Path) -> Result<ConfigMap> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = match ext.as_str() {
        "yml" | "yaml" => {
            if content.trim().is_empty() {
                return Ok(ConfigMap::new());
            }
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        }
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
        _ => {
            tracing::debug!(path = %path.display(), "unrecognized config extension, ignoring");
            return Ok(ConfigMap::new());
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ConfigMap::new()),
        _ => anyhow::bail!("Config file {} must contain a mapping at the top level", path.display()),
    }
}

/// Conversion from an environment string into a typed value.
pub trait EnvValue: Sized {
    const TYPE_NAME: &'static str;
    fn parse_env(raw: &str) -> Option<Self>;
}

impl EnvValue for String {
    const TYPE_NAME: &'static str = "str";
    fn parse_env(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl EnvValue for PathBuf {
    const TYPE_NAME: &'static str = "path";
    fn parse_env(raw: &str) -> Option<Self> {
        Some(PathBuf::from(raw))
    }
}

impl EnvValue for bool {
    const TYPE_NAME: &'static str = "bool";
    /// Never fails: anything outside the truthy set is `false`.
    fn parse_env(raw: &str) -> Option<Self> {
        Some(matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ))
    }
}

macro_rules! numeric_env_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl EnvValue for $ty {
                const TYPE_NAME: &'static str = $name;
                fn parse_env(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

numeric_env_value!(
    i32 => "int",
    i64 => "int",
    u16 => "int",
    u32 => "int",
    u64 => "int",
    usize => "int",
    f64 => "float",
);

/// Load a .env file into the process environment. Real env vars take precedence.
/// A missing file is silently skipped.
pub fn load_env_file(path: &Path) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    for line in content.lines() {
        let line = line.trim().trim_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// Load one config file from `config_dir` (or the current directory), any format.
pub fn load_config(name: &str, config_dir: Option<PathBuf>) -> ConfigMap {
    ConfigManager::new(config_dir).load_config_or_empty(name, ConfigFormat::Auto, true)
}

pub fn get_env_var<T: EnvValue>(name: &str, default: Option<T>, required: bool) -> Result<Option<T>> {
    ConfigManager::new(None).get_env_var(name, default, required)
}

// ---------------------------------------------------------------------------
// Settings for the adkit binary itself
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub root: Option<PathBuf>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_service_name() -> String { "HTTP Server".to_string() }
fn default_open_browser() -> bool { true }

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: None,
            service_name: default_service_name(),
            open_browser: default_open_browser(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "adkit=info,tower_http=info".to_string() }

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

impl Settings {
    /// Parse the settings file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings TOML: {}", path.display()))?;
        Ok(settings)
    }

    /// Apply `ADKIT_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with_prefix("ADKIT");
    }

    /// Overrides read from `{prefix}_HOST`, `{prefix}_PORT`, `{prefix}_ROOT` and
    /// `{prefix}_OPEN_BROWSER`. Values that don't convert are ignored with a warning.
    pub fn apply_env_overrides_with_prefix(&mut self, prefix: &str) {
        if let Some(host) = env_override::<String>(&format!("{}_HOST", prefix)) {
            self.server.host = host;
        }
        if let Some(port) = env_override::<u16>(&format!("{}_PORT", prefix)) {
            self.server.port = port;
        }
        if let Some(root) = env_override::<PathBuf>(&format!("{}_ROOT", prefix)) {
            self.server.root = Some(root);
        }
        if let Some(open) = env_override::<bool>(&format!("{}_OPEN_BROWSER", prefix)) {
            self.server.open_browser = open;
        }
    }
}

fn env_override<T: EnvValue>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = T::parse_env(&raw);
    if parsed.is_none() {
        tracing::warn!(name, value = %raw, expected = T::TYPE_NAME, "ignoring env override that does not convert");
    }
    parsed
}
