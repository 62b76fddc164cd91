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

//! Limits how often a host may reconnect within a rolling window, and
//! notifies the firewall (via the pipeline's `connect` short-circuit) to
//! deny hosts that trip the limit.
//!
//! The counter is incremented on *disconnect*, not connect: this limits
//! **re**connects, i.e. how often a host that has been closing
//! connections may come back. A host's first connect in a window always
//! succeeds. The source this was ported from shares its `clients` map
//! between a ticker goroutine and the connect/disconnect paths with no
//! synchronization; here the map is owned by a single task reached only
//! by channel, so the ticker reset and the request path can never race.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

use super::Filter;
use crate::config::ServerConfig;
use crate::core::{host_of, ReadWriteCount};
use crate::errors::FilterError;
use crate::util::parse_duration_or_default;

const CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

enum Msg {
    Connect(String, oneshot::Sender<Result<(), FilterError>>),
    Disconnect(String),
    Stop,
}

pub struct ReconnectRateFilter {
    tx: Option<mpsc::Sender<Msg>>,
}

impl ReconnectRateFilter {
    pub fn new() -> ReconnectRateFilter {
        ReconnectRateFilter { tx: None }
    }
}

impl Default for ReconnectRateFilter {
    fn default() -> Self {
        ReconnectRateFilter::new()
    }
}

#[async_trait]
impl Filter for ReconnectRateFilter {
    fn name(&self) -> &'static str {
        "limit_reconnects_rate"
    }

    fn init(&mut self, config: &ServerConfig) -> bool {
        let cfg = match &config.filters.limit_reconnects_rate {
            Some(cfg) => cfg,
            None => return false,
        };

        let reconnects = cfg.reconnects;
        let window = parse_duration_or_default(&cfg.interval, DEFAULT_INTERVAL);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(rx, reconnects, window));
        self.tx = Some(tx);
        true
    }

    async fn connect(&self, client: SocketAddr) -> Result<(), FilterError> {
        let tx = match &self.tx {
            Some(tx) => tx,
            None => return Ok(()),
        };

        let host = host_of(&client);
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.send(Msg::Connect(host, reply_tx)).await.is_err() {
            return Ok(());
        }
        reply_rx.await.unwrap_or(Ok(()))
    }

    async fn read(&self, _client: SocketAddr, _rwc: &ReadWriteCount) {}

    async fn write(&self, _client: SocketAddr, _rwc: &ReadWriteCount) {}

    async fn request(&self, _buf: &[u8]) -> Result<(), FilterError> {
        Ok(())
    }

    async fn disconnect(&self, client: SocketAddr) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Msg::Disconnect(host_of(&client))).await;
        }
    }

    async fn stop(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Msg::Stop).await;
        }
    }
}

async fn run(mut rx: mpsc::Receiver<Msg>, reconnects: u32, window: Duration) {
    let mut clients: HashMap<String, u32> = HashMap::new();
    let mut ticker = interval(window);
    // the first tick fires immediately; consume it so the window doesn't
    // reset before it has even elapsed once
    ticker.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(Msg::Connect(host, reply)) => {
                        let count = clients.get(&host).copied().unwrap_or(0);
                        let result = if count > reconnects {
                            Err(FilterError::Rejected(format!(
                                "limit reconnect rate {}, limit {}",
                                host, reconnects
                            )))
                        } else {
                            Ok(())
                        };
                        let _ = reply.send(result);
                    },
                    Some(Msg::Disconnect(host)) => {
                        *clients.entry(host).or_insert(0) += 1;
                    },
                    Some(Msg::Stop) | None => break,
                }
            },
            _ = ticker.tick() => {
                clients.clear();
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FiltersConfig, LimitReconnectRateConfig, UpstreamConfig};

    fn config_with_limit(reconnects: u32) -> ServerConfig {
        config_with_limit_and_interval(reconnects, "2s")
    }

    fn config_with_limit_and_interval(reconnects: u32, interval: &str) -> ServerConfig {
        ServerConfig {
            balance: "round_robin".to_string(),
            filters: FiltersConfig {
                limit_reconnects_rate: Some(LimitReconnectRateConfig { reconnects, interval: interval.to_string() }),
            },
            upstream: UpstreamConfig::default(),
        }
    }

    fn addr() -> SocketAddr {
        "203.0.113.7:4444".parse().unwrap()
    }

    #[test]
    fn declines_when_unconfigured() {
        let mut filter = ReconnectRateFilter::new();
        let config =
            ServerConfig { balance: "round_robin".to_string(), filters: FiltersConfig::default(), upstream: UpstreamConfig::default() };
        assert!(!filter.init(&config));
    }

    #[tokio::test]
    async fn first_connect_in_a_window_always_succeeds() {
        let mut filter = ReconnectRateFilter::new();
        assert!(filter.init(&config_with_limit(1)));
        assert!(filter.connect(addr()).await.is_ok());
    }

    #[tokio::test]
    async fn exceeding_the_threshold_rejects_connect() {
        let mut filter = ReconnectRateFilter::new();
        assert!(filter.init(&config_with_limit(1)));

        // two disconnects push the count to 2, which is > reconnects(1)
        filter.disconnect(addr()).await;
        filter.disconnect(addr()).await;

        assert!(filter.connect(addr()).await.is_err());
    }

    #[tokio::test]
    async fn a_single_disconnect_does_not_trip_the_limit() {
        let mut filter = ReconnectRateFilter::new();
        assert!(filter.init(&config_with_limit(1)));

        filter.disconnect(addr()).await;
        assert!(filter.connect(addr()).await.is_ok());
    }

    #[tokio::test]
    async fn window_reset_lets_a_tripped_host_reconnect() {
        let mut filter = ReconnectRateFilter::new();
        assert!(filter.init(&config_with_limit_and_interval(1, "30ms")));

        filter.disconnect(addr()).await;
        filter.disconnect(addr()).await;
        assert!(filter.connect(addr()).await.is_err());

        // past the window, the ticker clears the map and the host's
        // count resets to zero, so its next connect succeeds again.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(filter.connect(addr()).await.is_ok());
    }
}
