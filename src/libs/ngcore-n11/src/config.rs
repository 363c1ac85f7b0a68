//! N11 configuration
//!
//! Read from the `amf.n11` section of the AMF YAML file:
//!
//! ```yaml
//! amf:
//!   n11:
//!     response_timeout_ms: 6000
//!     services:
//!       sessiond:
//!         host: 127.0.0.1
//!         port: 50065
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{N11Error, N11Result};

/// Response timeout applied to every sessiond call
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 6000;
/// Service name of the session manager
pub const SESSIOND_SERVICE: &str = "sessiond";
pub const DEFAULT_SESSIOND_HOST: &str = "127.0.0.1";
pub const DEFAULT_SESSIOND_PORT: u16 = 50065;

/// Where a named local service listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the authority string (host:port).
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Name-to-endpoint table for local services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceEndpoint>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            SESSIOND_SERVICE.to_string(),
            ServiceEndpoint::new(DEFAULT_SESSIOND_HOST, DEFAULT_SESSIOND_PORT),
        );
        Self { services }
    }
}

impl ServiceRegistry {
    pub fn empty() -> Self {
        Self {
            services: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, endpoint: ServiceEndpoint) {
        self.services.insert(name.into(), endpoint);
    }

    pub fn lookup(&self, name: &str) -> N11Result<&ServiceEndpoint> {
        self.services
            .get(name)
            .ok_or_else(|| N11Error::ServiceNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// `amf.n11` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct N11Config {
    pub response_timeout_ms: u64,
    pub services: ServiceRegistry,
}

impl Default for N11Config {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            services: ServiceRegistry::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AmfSection {
    #[serde(default)]
    n11: Option<N11Config>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    amf: Option<AmfSection>,
}

impl N11Config {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Parse the N11 settings out of a complete AMF YAML document.
    /// Missing sections fall back to defaults.
    pub fn from_yaml_str(content: &str) -> N11Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let config = file.amf.and_then(|amf| amf.n11).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file. An unreadable file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> N11Result<Self> {
        let path = path.as_ref();
        log::info!("Loading N11 configuration from: {}", path.display());

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!(
                    "Could not read config file '{}': {}. Using defaults.",
                    path.display(),
                    e
                );
                return Ok(Self::default());
            }
        };
        let config = Self::from_yaml_str(&content)?;
        log::info!(
            "N11 response timeout {} ms, {} service(s) registered",
            config.response_timeout_ms,
            config.services.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> N11Result<()> {
        if self.response_timeout_ms == 0 {
            return Err(N11Error::Config("response_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}
