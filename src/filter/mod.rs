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

//! The filter pipeline: a registered chain of per-connection filters
//! invoked in registration order on connect/read/write/request/disconnect.
//! The pipeline itself holds no synchronization around filter state --
//! each filter is responsible for its own concurrency (see
//! `reconnect_rate`, which is itself a single-owner actor).

mod reconnect_rate;

pub use reconnect_rate::ReconnectRateFilter;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::{host_of, ReadWriteCount};
use crate::errors::FilterError;
use crate::firewall::Firewall;

const REFUSAL_DENY_TTL: Duration = Duration::from_secs(3600);

/// A single per-connection filter.
///
/// `init` is called once at pipeline construction time with the server
/// configuration; returning `false` means this filter declines to
/// participate (its configuration section was absent) and it is dropped
/// from the chain entirely.
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    fn init(&mut self, config: &ServerConfig) -> bool;

    async fn connect(&self, client: SocketAddr) -> Result<(), FilterError>;

    async fn read(&self, client: SocketAddr, rwc: &ReadWriteCount);

    async fn write(&self, client: SocketAddr, rwc: &ReadWriteCount);

    async fn request(&self, buf: &[u8]) -> Result<(), FilterError>;

    async fn disconnect(&self, client: SocketAddr);

    async fn stop(&self);
}

fn registry() -> Vec<Box<dyn Filter>> {
    vec![Box::new(ReconnectRateFilter::new())]
}

/// The built pipeline: whichever registered filters' `init` accepted the
/// configuration, in registration order.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Constructs every registered filter, retaining only those whose
    /// `init` returns true for this configuration.
    pub fn build(config: &ServerConfig) -> FilterChain {
        let mut filters = Vec::new();
        for mut filter in registry() {
            if filter.init(config) {
                info!("[filter] enabling {}", filter.name());
                filters.push(filter);
            }
        }
        FilterChain { filters }
    }

    /// Runs the connect phase. The first filter to reject the connection
    /// short-circuits the chain; the caller's host is then denied by the
    /// firewall for the standard TTL.
    pub async fn connect(&self, client: SocketAddr, firewall: &dyn Firewall) -> Result<(), FilterError> {
        for filter in &self.filters {
            if let Err(err) = filter.connect(client).await {
                firewall.deny(host_of(&client), REFUSAL_DENY_TTL).await;
                return Err(err);
            }
        }
        Ok(())
    }

    pub async fn read(&self, client: SocketAddr, rwc: &ReadWriteCount) {
        for filter in &self.filters {
            filter.read(client, rwc).await;
        }
    }

    pub async fn write(&self, client: SocketAddr, rwc: &ReadWriteCount) {
        for filter in &self.filters {
            filter.write(client, rwc).await;
        }
    }

    /// Runs the request phase. The first error aborts evaluation of the
    /// remaining filters; no firewall deny is triggered here, unlike
    /// `connect`.
    pub async fn request(&self, buf: &[u8]) -> Result<(), FilterError> {
        for filter in &self.filters {
            filter.request(buf).await?;
        }
        Ok(())
    }

    pub async fn disconnect(&self, client: SocketAddr) {
        for filter in &self.filters {
            filter.disconnect(client).await;
        }
    }

    pub async fn stop(&self) {
        info!("[filter] stopping {} filter(s)", self.filters.len());
        for filter in &self.filters {
            filter.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FiltersConfig, UpstreamConfig};
    use crate::firewall::InMemoryFirewall;

    fn config_without_filters() -> ServerConfig {
        ServerConfig { balance: "round_robin".to_string(), filters: FiltersConfig::default(), upstream: UpstreamConfig::default() }
    }

    #[tokio::test]
    async fn empty_config_builds_an_empty_chain() {
        let chain = FilterChain::build(&config_without_filters());
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let firewall = InMemoryFirewall::new();
        assert!(chain.connect(addr, &firewall).await.is_ok());
    }

    #[tokio::test]
    async fn tripping_the_reconnect_limiter_denies_the_host_at_the_firewall() {
        use crate::config::LimitReconnectRateConfig;

        let config = ServerConfig {
            balance: "round_robin".to_string(),
            filters: FiltersConfig {
                limit_reconnects_rate: Some(LimitReconnectRateConfig { reconnects: 1, interval: "2s".to_string() }),
            },
            upstream: UpstreamConfig::default(),
        };
        let chain = FilterChain::build(&config);
        let firewall = InMemoryFirewall::new();
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert!(chain.connect(addr, &firewall).await.is_ok());
        chain.disconnect(addr).await;
        chain.disconnect(addr).await;

        assert!(chain.connect(addr, &firewall).await.is_err());
        assert!(firewall.is_denied(&host_of(&addr)).await);
    }
}
