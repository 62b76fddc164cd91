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

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::*;
use crate::balance::RoundRobin;
use crate::core::Target;

fn ctx() -> Context {
    Context::new("127.0.0.1:9999".parse::<SocketAddr>().unwrap())
}

fn backend(host: &str) -> Backend {
    Backend::new(Target::new(host, 80), 0, 1, None)
}

/// An upstream whose snapshots are pushed by the test itself rather than
/// on any real discovery schedule.
struct ManualUpstream {
    rx: Option<mpsc::Receiver<BackendsSnapshot>>,
}

#[async_trait]
impl Upstream for ManualUpstream {
    type DiscoverStream = ReceiverStream<BackendsSnapshot>;

    async fn start(&mut self) {}

    async fn stop(&mut self) {}

    fn discover(&mut self) -> Self::DiscoverStream {
        ReceiverStream::new(self.rx.take().expect("discover() called more than once"))
    }
}

/// Sets up a scheduler fed by a manually driven discovery channel, so
/// tests can push snapshots on demand instead of depending on a real
/// upstream's timing.
fn spawn_test_scheduler() -> (SchedulerHandle, mpsc::Sender<BackendsSnapshot>) {
    let (tx, rx) = mpsc::channel(8);
    let stats = crate::stats::spawn_aggregator();
    let upstream = ManualUpstream { rx: Some(rx) };
    let handle = spawn(Box::new(RoundRobin::new()), upstream, stats);
    (handle, tx)
}

#[tokio::test]
async fn no_backends_is_rejected() {
    let (handle, _discover_tx) = spawn_test_scheduler();
    let result = handle.take_backend(ctx()).await;
    assert_eq!(result, Err(ElectError::NoBackendsAvailable));
}

#[tokio::test]
async fn newly_discovered_backends_start_dead() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a")]).await.unwrap();

    // give the loop a chance to process the snapshot
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = handle.take_backend(ctx()).await;
    assert_eq!(result, Err(ElectError::NoBackendsAvailable));
}

#[tokio::test]
async fn elects_among_live_backends_round_robin() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a"), backend("b")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    handle.set_live(Target::new("a", 80), true);
    handle.set_live(Target::new("b", 80), true);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let first = handle.take_backend(ctx()).await.unwrap();
    let second = handle.take_backend(ctx()).await.unwrap();
    assert_ne!(first.target, second.target);
}

#[tokio::test]
async fn dead_backend_is_excluded_from_election() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a"), backend("b")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    handle.set_live(Target::new("a", 80), true);
    handle.set_live(Target::new("b", 80), false);
    tokio::time::sleep(Duration::from_millis(20)).await;

    for _ in 0..5 {
        let elected = handle.take_backend(ctx()).await.unwrap();
        assert_eq!(elected.target.host, "a");
    }
}

#[tokio::test]
async fn stats_survive_rediscovery() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let target = Target::new("a", 80);
    handle.set_live(target.clone(), true);
    handle.increment_connection(target.clone());
    handle.increment_connection(target.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;

    // a fresh discovery snapshot for the same target must not reset its
    // counters or liveness
    discover_tx.send(vec![backend("a")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let backends = handle.backends().await;
    let a = backends.iter().find(|b| b.target.host == "a").unwrap();
    assert_eq!(a.stats.active_connections, 2);
    assert!(a.stats.live);
}

#[tokio::test]
async fn decrement_below_zero_clamps_instead_of_underflowing() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let target = Target::new("a", 80);
    handle.decrement_connection(target.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let backends = handle.backends().await;
    let a = backends.iter().find(|b| b.target.host == "a").unwrap();
    assert_eq!(a.stats.active_connections, 0);
}

#[tokio::test]
async fn targets_reflects_current_discovery_set() {
    let (handle, discover_tx) = spawn_test_scheduler();
    discover_tx.send(vec![backend("a"), backend("b")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut targets: Vec<String> = handle.targets().await.into_iter().map(|t| t.host).collect();
    targets.sort();
    assert_eq!(targets, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn stop_is_idempotent_and_stops_the_loop() {
    let (handle, _discover_tx) = spawn_test_scheduler();
    handle.stop();
    handle.stop();

    // give the loop a moment to observe the stop and exit; a subsequent
    // query against a dead loop should resolve with an empty result
    // rather than hang.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let backends = handle.backends().await;
    assert!(backends.is_empty());
}
