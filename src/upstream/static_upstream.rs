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

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use super::Upstream;
use crate::core::BackendsSnapshot;

/// Emits the configured backend list exactly once, on `start()`, and
/// never again until the process restarts the upstream. Sufficient to
/// drive the scheduler end to end without a real discovery mechanism.
pub struct StaticUpstream {
    snapshot: BackendsSnapshot,
    sender: Option<mpsc::Sender<BackendsSnapshot>>,
}

impl StaticUpstream {
    pub fn new(snapshot: BackendsSnapshot) -> StaticUpstream {
        StaticUpstream { snapshot, sender: None }
    }
}

#[async_trait]
impl Upstream for StaticUpstream {
    type DiscoverStream = ReceiverStream<BackendsSnapshot>;

    async fn start(&mut self) {
        info!("[upstream] starting static upstream with {} backends", self.snapshot.len());
        if let Some(sender) = &self.sender {
            let _ = sender.send(self.snapshot.clone()).await;
        }
    }

    async fn stop(&mut self) {
        info!("[upstream] stopping static upstream");
        self.sender = None;
    }

    fn discover(&mut self) -> Self::DiscoverStream {
        let (tx, rx) = mpsc::channel(1);
        self.sender = Some(tx);
        ReceiverStream::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Backend, Target};
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn emits_snapshot_once_on_start() {
        let snapshot = vec![Backend::new(Target::new("a", 80), 0, 1, None)];
        let mut upstream = StaticUpstream::new(snapshot.clone());

        let mut stream = upstream.discover();
        upstream.start().await;

        let received = stream.next().await.unwrap();
        assert_eq!(received, snapshot);
    }
}
