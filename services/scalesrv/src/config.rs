//! Service configuration
//!
//! Loaded from a YAML file merged with `SCALESRV_*` environment overrides.
//! A missing file is not an error; every field has a default so the service
//! can boot with nothing but a device file.

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/scalesrv.yaml";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Route prefix for everything except `/health`
    #[serde(default = "default_api_prefix")]
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            prefix: default_api_prefix(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub api: ApiConfig,
    /// Path to the JSON device store
    #[serde(default = "default_devices_file")]
    pub devices_file: String,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8090
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_devices_file() -> String {
    "config/devices.json".to_string()
}

impl ServiceConfig {
    /// Load configuration: defaults, then the YAML file, then environment
    pub fn load(path: &str) -> Result<Self> {
        let config: ServiceConfig = Figment::new()
            .merge(Serialized::defaults(ServiceConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SCALESRV_").split("_"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.host.trim().is_empty() {
            return Err(crate::error::GatewayError::config(
                "api.host cannot be empty",
            ));
        }
        if self.api.port == 0 {
            return Err(crate::error::GatewayError::config(
                "api.port must be greater than zero",
            ));
        }
        if !self.api.prefix.starts_with('/') {
            return Err(crate::error::GatewayError::config(
                "api.prefix must start with '/'",
            ));
        }
        if self.devices_file.trim().is_empty() {
            return Err(crate::error::GatewayError::config(
                "devices_file cannot be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ServiceConfig::load("/nonexistent/scalesrv.yaml").unwrap();
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.api.prefix, "/api/v1");
        assert_eq!(config.devices_file, "config/devices.json");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.bind_address(), "0.0.0.0:8090");
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api:\n  port: 9191\n  prefix: /gateway\ndevices_file: /etc/scales.json"
        )
        .unwrap();

        let config = ServiceConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api.port, 9191);
        assert_eq!(config.api.prefix, "/gateway");
        assert_eq!(config.devices_file, "/etc/scales.json");
        // Untouched fields keep their defaults
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.api.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.api.prefix = "api/v1".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.devices_file = " ".to_string();
        assert!(config.validate().is_err());
    }
}
