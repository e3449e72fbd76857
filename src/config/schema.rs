use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const DEFAULT_DATA_DIR: &str = "./databases";
pub const ENV_PREFIX: &str = "TABLEDOC";

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct TabledocConfig {
    pub storage: Storage,
    #[serde(default)]
    pub frontend: Frontend,
    #[serde(default)]
    pub misc: Misc,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Storage {
    Local(Local),
    #[serde(rename = "memory")]
    InMemory(InMemory),
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Local {
    pub data_dir: String,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct InMemory {}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Frontend {
    pub http: Option<HttpFrontend>,
}

impl Default for Frontend {
    fn default() -> Self {
        Self {
            http: Some(HttpFrontend::default()),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct HttpFrontend {
    pub bind_host: String,
    pub bind_port: u16,
    pub max_body_bytes: u64,
}

impl Default for HttpFrontend {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 3455,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Default, Clone)]
pub struct Misc {
    pub metrics: Option<Metrics>,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Metrics {
    pub host: String,
    pub port: u16,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
        }
    }
}

pub fn validate_config(config: TabledocConfig) -> Result<TabledocConfig, ConfigError> {
    if let Storage::Local(Local { ref data_dir }) = config.storage {
        if data_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "storage.data_dir must not be empty".to_string(),
            ));
        }
    }

    if let Some(HttpFrontend {
        max_body_bytes: 0, ..
    }) = config.frontend.http
    {
        return Err(ConfigError::Message(
            "frontend.http.max_body_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

/// The configuration used when no config file exists
pub fn build_default_config() -> TabledocConfig {
    TabledocConfig {
        storage: Storage::Local(Local {
            data_dir: DEFAULT_DATA_DIR.to_string(),
        }),
        frontend: Frontend::default(),
        misc: Misc::default(),
    }
}

// Values from the file can be overridden with e.g. TABLEDOC__FRONTEND__HTTP__BIND_PORT=8080
pub fn load_config(path: &Path) -> Result<TabledocConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
) -> Result<TabledocConfig, ConfigError> {
    let config =
        Config::builder().add_source(File::from_str(config_str, FileFormat::Toml));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
