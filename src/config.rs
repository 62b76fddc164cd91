// Copyright (c) 2018 Nuclear Furnace
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Server configuration, layered the way the teacher layers its own:
//! `config`-crate sources (file, then environment overrides) deserialized
//! through `serde`. Only the subset the scheduler and filter pipeline
//! observe lives here; the CLI/file-discovery glue around it is out of
//! scope.

use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;

use crate::errors::CreationError;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub balance: String,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Enabled filters, by name. An absent key means the filter is not
/// constructed at all (distinct from being constructed and declining
/// itself via `init` returning false, though the pipeline treats both
/// the same way: the filter is simply not in the retained chain).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    pub limit_reconnects_rate: Option<LimitReconnectRateConfig>,
}

/// Configuration for the reconnect-rate limiter filter.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitReconnectRateConfig {
    pub reconnects: u32,
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "2s".to_string()
}

/// Discovery descriptor. Only the static variant is a concrete
/// implementation in this crate; other kinds are accepted here so
/// config parsing doesn't reject a superset file, but constructing an
/// `Upstream` from anything but `static` is a [`CreationError`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamConfig {
    Static { backends: Vec<StaticBackendConfig> },
    Dns { host: String, port: u16 },
    Exec { command: String },
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig::Static { backends: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticBackendConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub sni: Option<String>,
}

fn default_weight() -> u32 {
    1
}

impl ServerConfig {
    /// Loads configuration from `path` (if it exists) layered under
    /// environment variables prefixed `TCPWDER_`, matching the teacher's
    /// file-then-environment precedence.
    pub fn load(path: &str) -> Result<ServerConfig, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("TCPWDER").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Loads configuration from an already-assembled map, primarily for
    /// tests that want to avoid touching the filesystem.
    pub fn from_map(values: HashMap<String, String>) -> Result<ServerConfig, ConfigError> {
        let mut builder = Config::builder();
        for (key, value) in values {
            builder = builder.set_override(key, value)?;
        }
        builder.build()?.try_deserialize()
    }
}

/// Builds the concrete [`crate::upstream::StaticUpstream`] this crate
/// ships from a `static` upstream descriptor.
pub fn static_snapshot_from(config: &UpstreamConfig) -> Result<crate::core::BackendsSnapshot, CreationError> {
    match config {
        UpstreamConfig::Static { backends } => Ok(backends
            .iter()
            .map(|b| {
                crate::core::Backend::new(crate::core::Target::new(b.host.clone(), b.port), b.priority, b.weight, b.sni.clone())
            })
            .collect()),
        other => Err(CreationError::InvalidResource(format!("unsupported upstream descriptor: {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_upstream_builds_backends() {
        let config = UpstreamConfig::Static {
            backends: vec![StaticBackendConfig { host: "a".to_string(), port: 80, priority: 0, weight: 1, sni: None }],
        };
        let snapshot = static_snapshot_from(&config).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].target.host, "a");
    }

    #[test]
    fn non_static_upstream_is_rejected() {
        let config = UpstreamConfig::Dns { host: "example.com".to_string(), port: 80 };
        assert!(static_snapshot_from(&config).is_err());
    }

    #[test]
    fn from_map_builds_a_minimal_config() {
        let mut values = HashMap::new();
        values.insert("balance".to_string(), "round_robin".to_string());
        let cfg = ServerConfig::from_map(values).unwrap();
        assert_eq!(cfg.balance, "round_robin");
        assert!(cfg.filters.limit_reconnects_rate.is_none());
    }
}
