use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config path given and no home directory to default to")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub workers: WorkerConfig,
    pub twilio: TwilioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the record collections
    pub data_dir: path::PathBuf,
    /// Live logs and their archives
    pub log_dir: path::PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub check_interval_seconds: u64,
    pub rotation_interval_seconds: u64,
    /// Upper bound on checks probed at once within a sweep
    pub max_concurrent_checks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    /// Prepended to the stored 10 digit phone number
    pub country_prefix: String,
    pub api_base: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: ".data".into(), log_dir: ".logs".into() }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 60,
            rotation_interval_seconds: 24 * 60 * 60,
            max_concurrent_checks: 32,
        }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            country_prefix: "+91".into(),
            api_base: "https://api.twilio.com".into(),
        }
    }
}

impl WorkerConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(1))
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_seconds.max(1))
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/upcheck/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("upcheck/config.toml"))
}

/// Replace `target` with the variable's value when it is set and non-empty
fn override_from_env(target: &mut String, name: &str) {
    if let Ok(value) = env::var(name) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Worker Configuration:")?;
        write_title_1(f, "Storage")?;
        write_1(f, "Data Directory", &self.storage.data_dir.display())?;
        write_1(f, "Log Directory", &self.storage.log_dir.display())?;
        write_title_1(f, "Workers")?;
        write_1(f, "Check Interval (s)", &self.workers.check_interval_seconds)?;
        write_1(f, "Rotation Interval (s)", &self.workers.rotation_interval_seconds)?;
        write_1(f, "Max Concurrent Checks", &self.workers.max_concurrent_checks)?;
        write_title_1(f, "Twilio")?;
        write_1(f, "Account SID", &self.twilio.account_sid)?;
        // Never print the token itself
        write_1(f, "Auth Token", &if self.twilio.auth_token.is_empty() { "<unset>" } else { "<set>" })?;
        write_1(f, "From", &self.twilio.from_phone)?;
        write_1(f, "Country Prefix", &self.twilio.country_prefix)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/upcheck/config.toml
    ///  or the specified path, with the name config.toml if one does not exist.
    /// Twilio secrets are then overridden from `UPCHECK_TWILIO_*` variables.
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let mut config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            toml::from_str(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.twilio.account_sid, "UPCHECK_TWILIO_ACCOUNT_SID");
        override_from_env(&mut self.twilio.auth_token, "UPCHECK_TWILIO_AUTH_TOKEN");
        override_from_env(&mut self.twilio.from_phone, "UPCHECK_TWILIO_FROM_PHONE");
    }
}
