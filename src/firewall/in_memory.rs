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

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use super::Firewall;

const CHANNEL_CAPACITY: usize = 256;

enum Msg {
    Deny(String, Duration),
    IsDenied(String, oneshot::Sender<bool>),
}

/// An in-memory `host -> expires_at` deny table, guarded by a
/// single-owner task reached over a channel, same discipline as the
/// scheduler and the reconnect-rate limiter.
#[derive(Clone)]
pub struct InMemoryFirewall {
    tx: mpsc::Sender<Msg>,
}

impl InMemoryFirewall {
    pub fn new() -> InMemoryFirewall {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(rx));
        InMemoryFirewall { tx }
    }
}

impl Default for InMemoryFirewall {
    fn default() -> Self {
        InMemoryFirewall::new()
    }
}

#[async_trait]
impl Firewall for InMemoryFirewall {
    async fn deny(&self, host: String, duration: Duration) {
        let _ = self.tx.send(Msg::Deny(host, duration)).await;
    }

    async fn is_denied(&self, host: &str) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Msg::IsDenied(host.to_string(), reply_tx)).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }
}

async fn run(mut rx: mpsc::Receiver<Msg>) {
    let mut denied: HashMap<String, Instant> = HashMap::new();

    while let Some(msg) = rx.recv().await {
        match msg {
            Msg::Deny(host, duration) => {
                debug!("[firewall] denying {} for {:?}", host, duration);
                denied.insert(host, Instant::now() + duration);
            },
            Msg::IsDenied(host, reply) => {
                let is_denied = match denied.get(&host) {
                    Some(expires_at) => *expires_at > Instant::now(),
                    None => false,
                };
                let _ = reply.send(is_denied);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denied_host_is_reported_denied() {
        let firewall = InMemoryFirewall::new();
        firewall.deny("1.2.3.4".to_string(), Duration::from_secs(60)).await;
        assert!(firewall.is_denied("1.2.3.4").await);
    }

    #[tokio::test]
    async fn unknown_host_is_not_denied() {
        let firewall = InMemoryFirewall::new();
        assert!(!firewall.is_denied("5.6.7.8").await);
    }

    #[tokio::test]
    async fn expired_deny_is_no_longer_reported() {
        let firewall = InMemoryFirewall::new();
        firewall.deny("1.2.3.4".to_string(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!firewall.is_denied("1.2.3.4").await);
    }
}
