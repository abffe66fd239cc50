//! `nexchat set` / `nexchat unset` key handling.

use std::fmt;
use std::path::PathBuf;

use crate::core::config::data::Config;

pub const CONFIG_KEYS: [&str; 7] = [
    "model",
    "base-url",
    "relay-url",
    "relay-param",
    "stream",
    "data-dir",
    "request-timeout",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKeyError {
    UnknownKey(String),
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl fmt::Display for ConfigKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKeyError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of: {})",
                CONFIG_KEYS.join(", ")
            ),
            ConfigKeyError::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "Invalid value for {key}: {value:?} ({expected})"),
        }
    }
}

impl std::error::Error for ConfigKeyError {}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigKeyError {
    ConfigKeyError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_url(key: &str, value: &str) -> Result<String, ConfigKeyError> {
    reqwest::Url::parse(value)
        .map(|_| value.to_string())
        .map_err(|_| invalid(key, value, "expected an absolute http(s) URL"))
}

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid(key, value, "value must not be empty"));
        }
        match key {
            "model" => self.model = Some(value.to_string()),
            "base-url" => self.base_url = Some(parse_url(key, value)?),
            "relay-url" => self.relay_url = Some(parse_url(key, value)?),
            "relay-param" => self.relay_param = Some(value.to_string()),
            "stream" => {
                let enabled =
                    parse_bool(value).ok_or_else(|| invalid(key, value, "expected on or off"))?;
                self.stream = Some(enabled);
            }
            "data-dir" => self.data_dir = Some(PathBuf::from(value)),
            "request-timeout" => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid(key, value, "expected a positive number of seconds"))?;
                self.request_timeout_secs = Some(secs);
            }
            _ => return Err(ConfigKeyError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigKeyError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "relay-url" => self.relay_url = None,
            "relay-param" => self.relay_param = None,
            "stream" => self.stream = None,
            "data-dir" => self.data_dir = None,
            "request-timeout" => self.request_timeout_secs = None,
            _ => return Err(ConfigKeyError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
