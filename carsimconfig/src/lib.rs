//! # CarSim Configuration Module
//!
//! This module provides configuration management for the CarSim devices:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use carsimconfig::get_config;
//!
//! let config = get_config();
//!
//! let volume = config.get_radio_default_volume()?;
//! config.set_radio_reverse_volume(25)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::info;

const DEFAULT_CONFIG: &str = include_str!("carsim.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load CarSim configuration"));
}

const ENV_CONFIG_DIR: &str = "CARSIM_CONFIG";
const ENV_PREFIX: &str = "CARSIM_CONFIG__";
const DEFAULT_DIR_NAME: &str = ".carsim";

const DEFAULT_LOG_MIN_LEVEL: &str = "info";
const DEFAULT_RADIO_VOLUME: u64 = 50;
const DEFAULT_REVERSE_VOLUME: u64 = 30;
const DEFAULT_VOLUME_STEP: u64 = 10;
const DEFAULT_AUTOPLAY: bool = false;
const DEFAULT_VERBOSE: bool = false;
const DEFAULT_SONG_MIN_MS: u64 = 3000;
const DEFAULT_SONG_JITTER_MS: u64 = 3000;
const DEFAULT_ENGINE_FORWARD_MS: u64 = 10_000;
const DEFAULT_ENGINE_REVERSE_MS: u64 = 4_000;

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path) {
                Ok(Value::Number(n)) if n.is_u64() => Ok(n.as_u64().unwrap_or($default)),
                Ok(Value::String(s)) => Ok(s.trim().parse::<u64>().unwrap_or_else(|_| {
                    tracing::warn!(
                        path = %$path.join("."),
                        value = %s,
                        "Invalid integer in configuration, using default {}",
                        $default
                    );
                    $default
                })),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for CarSim
///
/// Holds the merged YAML tree (embedded defaults, `config.yaml`, then
/// `CARSIM_CONFIG__*` environment overrides) and writes it back on every
/// change.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self
            .data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(DEFAULT_DIR_NAME).exists() {
            return DEFAULT_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(DEFAULT_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        DEFAULT_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Cannot create config directory {}", path.display()))?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `CARSIM_CONFIG` environment variable
    /// 3. `.carsim` in the current directory
    /// 4. `.carsim` in the user's home directory
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// The embedded defaults are merged with `config.yaml` when present,
    /// environment overrides are applied last, and the merged tree is
    /// saved back so the file always lists every known key.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            data
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)
            .with_context(|| format!("Invalid YAML in {path}"))?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`.
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.lock_data();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml).with_context(|| format!("Cannot write {}", self.path))?;
        Ok(())
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, Value> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// `path` is an array of keys, e.g. `&["radio", "reverse_volume"]`.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.lock_data();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock_data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(err) = Self::set_value_internal(config, &key_path, yaml_value) {
                    tracing::warn!(env_var = %key, error = %err, "Ignoring environment override");
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let new_key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(new_key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    impl_u64_config!(
        get_radio_default_volume,
        set_radio_default_volume,
        &["radio", "default_volume"],
        DEFAULT_RADIO_VOLUME
    );

    impl_u64_config!(
        get_radio_reverse_volume,
        set_radio_reverse_volume,
        &["radio", "reverse_volume"],
        DEFAULT_REVERSE_VOLUME
    );

    impl_u64_config!(
        get_radio_volume_step,
        set_radio_volume_step,
        &["radio", "volume_step"],
        DEFAULT_VOLUME_STEP
    );

    impl_u64_config!(
        get_radio_song_min_ms,
        set_radio_song_min_ms,
        &["radio", "song_min_ms"],
        DEFAULT_SONG_MIN_MS
    );

    impl_u64_config!(
        get_radio_song_jitter_ms,
        set_radio_song_jitter_ms,
        &["radio", "song_jitter_ms"],
        DEFAULT_SONG_JITTER_MS
    );

    impl_bool_config!(
        get_radio_autoplay,
        set_radio_autoplay,
        &["radio", "autoplay"],
        DEFAULT_AUTOPLAY
    );

    impl_bool_config!(
        get_radio_verbose,
        set_radio_verbose,
        &["radio", "verbose"],
        DEFAULT_VERBOSE
    );

    impl_u64_config!(
        get_engine_forward_ms,
        set_engine_forward_ms,
        &["engine", "forward_ms"],
        DEFAULT_ENGINE_FORWARD_MS
    );

    impl_u64_config!(
        get_engine_reverse_ms,
        set_engine_reverse_ms,
        &["engine", "reverse_ms"],
        DEFAULT_ENGINE_REVERSE_MS
    );

    /// Optional path of a YAML station catalog.
    ///
    /// Relative paths are resolved against the configuration directory.
    /// `None` means the built-in catalog is used.
    pub fn get_radio_catalog_path(&self) -> Option<String> {
        match self.get_value(&["radio", "catalog"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => {
                let path = Path::new(s.trim());
                if path.is_absolute() {
                    Some(path.to_string_lossy().to_string())
                } else {
                    Some(
                        Path::new(&self.config_dir)
                            .join(path)
                            .to_string_lossy()
                            .to_string(),
                    )
                }
            }
            _ => None,
        }
    }

    pub fn set_radio_catalog_path(&self, path: String) -> Result<()> {
        self.set_value(&["radio", "catalog"], Value::String(path))
    }

    /// Minimum log level used when `RUST_LOG` is not set.
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance, loaded lazily on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Recursively merges `external` into `default`.
///
/// Mappings are merged key by key; scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
