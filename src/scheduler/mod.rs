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

//! The scheduler: a single-consumer actor that owns the backend table and
//! serves elections, op accounting, and snapshot queries to every other
//! task in the process. Nothing outside this module ever touches the
//! backend map directly -- every interaction is a channel send.

mod stop;

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::balance::Balancer;
use crate::core::{Backend, BackendsSnapshot, Context, Target};
use crate::errors::{ElectError, SchedulerError};
use crate::stats::StatsHandle;
use crate::upstream::Upstream;
use stop::StopSignal;

const CHANNEL_CAPACITY: usize = 1024;
const BACKENDS_PUSH_INTERVAL: Duration = Duration::from_secs(2);

/// The mutation requested of a single backend's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpAction {
    IncrementConnection,
    DecrementConnection,
    IncrementRefused,
    IncrementTx(u64),
    IncrementRx(u64),
    /// Liveness verdict from a health checker. The checker itself is out
    /// of scope; only this entry point into the backend table is not.
    SetLive(bool),
}

/// An asynchronous counter mutation submitted by a connection handler.
#[derive(Debug, Clone)]
pub struct Op {
    pub target: Target,
    pub action: OpAction,
}

/// A single-use request to elect a backend for a new client connection.
struct ElectRequest {
    context: Context,
    reply: oneshot::Sender<Result<Backend, ElectError>>,
}

/// Public, cloneable handle to a running scheduler.
///
/// Every method here is a channel send (or send-then-await, for
/// `take_backend` and the snapshot queries) -- none of them touch the
/// backend table directly.
#[derive(Clone)]
pub struct SchedulerHandle {
    ops_tx: mpsc::Sender<Op>,
    elect_tx: mpsc::Sender<ElectRequest>,
    query_tx: mpsc::Sender<Query>,
    stop: StopSignal,
}

enum Query {
    Backends(oneshot::Sender<Vec<Backend>>),
    Targets(oneshot::Sender<Vec<Target>>),
}

impl SchedulerHandle {
    /// Elects a backend for the given context. Synchronous from the
    /// caller's point of view: internally this enqueues an election
    /// request and awaits the loop's reply.
    pub async fn take_backend(&self, context: Context) -> Result<Backend, ElectError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ElectRequest { context, reply: reply_tx };

        if self.elect_tx.send(request).await.is_err() {
            return Err(ElectError::NoBackendsAvailable);
        }

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(ElectError::NoBackendsAvailable),
        }
    }

    /// Fire-and-forget counter mutations. A full or closed channel is
    /// silently dropped -- callers never block on bookkeeping.
    pub fn increment_connection(&self, target: Target) {
        self.send_op(target, OpAction::IncrementConnection);
    }

    pub fn decrement_connection(&self, target: Target) {
        self.send_op(target, OpAction::DecrementConnection);
    }

    pub fn increment_refused(&self, target: Target) {
        self.send_op(target, OpAction::IncrementRefused);
    }

    pub fn increment_rx(&self, target: Target, bytes: u64) {
        self.send_op(target, OpAction::IncrementRx(bytes));
    }

    pub fn increment_tx(&self, target: Target, bytes: u64) {
        self.send_op(target, OpAction::IncrementTx(bytes));
    }

    /// Records a health check verdict for a backend. Checking health is
    /// someone else's job; this is just the mailbox for the result.
    pub fn set_live(&self, target: Target, live: bool) {
        self.send_op(target, OpAction::SetLive(live));
    }

    fn send_op(&self, target: Target, action: OpAction) {
        if self.ops_tx.try_send(Op { target, action }).is_err() {
            debug!("[scheduler] ops channel full or closed, dropping op");
        }
    }

    /// Snapshot of all currently tracked backends.
    pub async fn backends(&self) -> Vec<Backend> {
        let (tx, rx) = oneshot::channel();
        if self.query_tx.send(Query::Backends(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Snapshot of all currently tracked target keys.
    pub async fn targets(&self) -> Vec<Target> {
        let (tx, rx) = oneshot::channel();
        if self.query_tx.send(Query::Targets(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Requests shutdown. Idempotent: a second call is a no-op.
    pub fn stop(&self) {
        self.stop.fire();
    }
}

/// Spawns the scheduler loop and returns a handle to it.
///
/// The scheduler takes ownership of the upstream collaborator: it starts
/// it before entering the loop and stops it on the way out, mirroring
/// the source's `Scheduler.Start`/`Stop` driving `Upstream.Start`/`Stop`
/// directly rather than leaving that to some third owner.
pub fn spawn<U>(balancer: Box<dyn Balancer>, mut upstream: U, stats: StatsHandle) -> SchedulerHandle
where
    U: Upstream + 'static,
{
    let (ops_tx, ops_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (elect_tx, elect_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (query_tx, query_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let stop = StopSignal::new();

    let discover = upstream.discover();
    let loop_state = Loop {
        balancer,
        upstream,
        discover,
        stats,
        ops_rx,
        elect_rx,
        query_rx,
        stop: stop.clone(),
        backends: HashMap::new(),
        backends_list: Vec::new(),
    };

    tokio::spawn(loop_state.run());

    SchedulerHandle { ops_tx, elect_tx, query_tx, stop }
}

struct Loop<U: Upstream> {
    balancer: Box<dyn Balancer>,
    upstream: U,
    discover: U::DiscoverStream,
    stats: StatsHandle,
    ops_rx: mpsc::Receiver<Op>,
    elect_rx: mpsc::Receiver<ElectRequest>,
    query_rx: mpsc::Receiver<Query>,
    stop: StopSignal,
    backends: HashMap<Target, Backend>,
    backends_list: Vec<Backend>,
}

impl<U> Loop<U>
where
    U: Upstream,
{
    async fn run(mut self) {
        info!("[scheduler] starting");
        self.upstream.start().await;
        let mut push_ticker = interval(BACKENDS_PUSH_INTERVAL);

        loop {
            tokio::select! {
                snapshot = self.discover.next() => {
                    match snapshot {
                        Some(snapshot) => self.handle_backends_update(snapshot),
                        None => {
                            warn!("[scheduler] {}; continuing with last known snapshot", SchedulerError::UpstreamGone);
                        },
                    }
                },
                bandwidth = self.stats.backends_counter_out_rx.recv() => {
                    if let Some(bandwidth) = bandwidth {
                        self.handle_bandwidth_update(bandwidth);
                    }
                },
                op = self.ops_rx.recv() => {
                    if let Some(op) = op {
                        self.handle_op(op);
                    }
                },
                request = self.elect_rx.recv() => {
                    if let Some(request) = request {
                        self.handle_elect(request);
                    }
                },
                query = self.query_rx.recv() => {
                    if let Some(query) = query {
                        self.handle_query(query);
                    }
                },
                _ = push_ticker.tick() => {
                    self.stats.push_backends(self.backends());
                },
                _ = self.stop.notified() => {
                    info!("[scheduler] stopping");
                    self.upstream.stop().await;
                    break;
                },
            }
        }
    }

    fn backends(&self) -> Vec<Backend> {
        self.backends_list.clone()
    }

    fn targets(&self) -> Vec<Target> {
        self.backends.keys().cloned().collect()
    }

    fn handle_query(&self, query: Query) {
        match query {
            Query::Backends(reply) => {
                let _ = reply.send(self.backends());
            },
            Query::Targets(reply) => {
                let _ = reply.send(self.targets());
            },
        }
    }

    fn handle_backends_update(&mut self, snapshot: BackendsSnapshot) {
        let mut updated = HashMap::with_capacity(snapshot.len());
        let mut updated_list = Vec::with_capacity(snapshot.len());

        for incoming in snapshot {
            let merged = match self.backends.get(&incoming.target) {
                Some(existing) => incoming.merge_from(existing),
                None => incoming,
            };
            updated.insert(merged.target.clone(), merged.clone());
            updated_list.push(merged);
        }

        self.backends = updated;
        self.backends_list = updated_list;
        self.stats.push_targets(self.targets());
    }

    fn handle_bandwidth_update(&mut self, bandwidth: crate::core::BandwidthStats) {
        match self.backends.get_mut(&bandwidth.target) {
            Some(backend) => {
                backend.stats.rx_bytes = bandwidth.rx_total;
                backend.stats.tx_bytes = bandwidth.tx_total;
                backend.stats.rx_second = bandwidth.rx_second;
                backend.stats.tx_second = bandwidth.tx_second;
                self.sync_list_entry(&bandwidth.target);
            },
            None => warn!("[scheduler] bandwidth update for untracked target {}", bandwidth.target),
        }
    }

    fn handle_op(&mut self, op: Op) {
        // Traffic accounting is unconditional: bytes already on the wire
        // are accounted even if the target has since been dropped from
        // discovery.
        match op.action {
            OpAction::IncrementTx(bytes) => {
                self.stats.push_traffic(crate::core::ReadWriteCount {
                    target: Some(op.target),
                    count_read: 0,
                    count_write: bytes,
                });
                return;
            },
            OpAction::IncrementRx(bytes) => {
                self.stats.push_traffic(crate::core::ReadWriteCount {
                    target: Some(op.target),
                    count_read: bytes,
                    count_write: 0,
                });
                return;
            },
            _ => {},
        }

        let backend = match self.backends.get_mut(&op.target) {
            Some(backend) => backend,
            None => {
                warn!("[scheduler] op {:?} on untracked target {}", op.action, op.target);
                return;
            },
        };

        match op.action {
            OpAction::IncrementRefused => backend.stats.refused_connections += 1,
            OpAction::IncrementConnection => {
                backend.stats.active_connections += 1;
                backend.stats.total_connections += 1;
            },
            OpAction::DecrementConnection => {
                if backend.stats.active_connections == 0 {
                    warn!("[scheduler] decrement below zero for target {}, clamping", op.target);
                } else {
                    backend.stats.active_connections -= 1;
                }
            },
            OpAction::SetLive(live) => backend.stats.live = live,
            OpAction::IncrementTx(_) | OpAction::IncrementRx(_) => unreachable!("handled above"),
        }

        self.sync_list_entry(&op.target);
    }

    /// The map is the source of truth for stats mutation; the list is a
    /// parallel view the balancer iterates in discovery order. Keep them
    /// in sync after any map-only mutation.
    fn sync_list_entry(&mut self, target: &Target) {
        if let Some(updated) = self.backends.get(target) {
            if let Some(slot) = self.backends_list.iter_mut().find(|b| &b.target == target) {
                *slot = updated.clone();
            }
        }
    }

    fn handle_elect(&mut self, request: ElectRequest) {
        let candidates: Vec<Backend> = self.backends_list.iter().filter(|b| b.stats.live).cloned().collect();

        if candidates.is_empty() {
            let _ = request.reply.send(Err(ElectError::NoBackendsAvailable));
            return;
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.balancer.elect(&request.context, &candidates)
        }))
        .unwrap_or_else(|_| {
            warn!("[scheduler] balancer panicked during election; converting to PolicyRejected");
            Err(ElectError::PolicyRejected("balancer panicked".to_string()))
        });

        let _ = request.reply.send(result);
    }
}

#[cfg(test)]
mod tests;
