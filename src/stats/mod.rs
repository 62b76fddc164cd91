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

//! The stats surface: typed channels the scheduler uses to push discovery
//! snapshots and traffic events out, and to receive bandwidth aggregates
//! back. The aggregator's internal counters are out of scope; what ships
//! here is the minimal aggregator needed to prove the scheduler side of
//! the contract never blocks or panics on a slow or absent subscriber.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::debug;

use crate::core::{BackendsSnapshot, BandwidthStats, ReadWriteCount, Target};

const CHANNEL_CAPACITY: usize = 1024;

/// Handle to the stats surface, held by the scheduler.
///
/// All sends are best-effort: a full or closed channel is logged and
/// dropped rather than allowed to block the scheduler loop.
pub struct StatsHandle {
    backends_tx: mpsc::Sender<BackendsSnapshot>,
    traffic_tx: mpsc::Sender<ReadWriteCount>,
    backends_counter_in_tx: mpsc::Sender<Vec<Target>>,
    pub(crate) backends_counter_out_rx: mpsc::Receiver<BandwidthStats>,
}

impl StatsHandle {
    pub fn push_backends(&self, snapshot: BackendsSnapshot) {
        if self.backends_tx.try_send(snapshot).is_err() {
            debug!("[stats] backends channel full or closed, dropping push");
        }
    }

    pub fn push_traffic(&self, rwc: ReadWriteCount) {
        if self.traffic_tx.try_send(rwc).is_err() {
            debug!("[stats] traffic channel full or closed, dropping event");
        }
    }

    pub fn push_targets(&self, targets: Vec<Target>) {
        if self.backends_counter_in_tx.try_send(targets).is_err() {
            debug!("[stats] backends-counter channel full or closed, dropping update");
        }
    }
}

/// Spawns the in-process aggregator and returns the scheduler-facing
/// handle to it.
pub fn spawn_aggregator() -> StatsHandle {
    let (backends_tx, backends_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (traffic_tx, traffic_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (backends_counter_in_tx, backends_counter_in_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (backends_counter_out_tx, backends_counter_out_rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(run_aggregator(
        backends_rx,
        traffic_rx,
        backends_counter_in_rx,
        backends_counter_out_tx,
    ));

    StatsHandle {
        backends_tx,
        traffic_tx,
        backends_counter_in_tx,
        backends_counter_out_rx,
    }
}

#[derive(Default, Clone, Copy)]
struct Accumulated {
    rx_total: u64,
    tx_total: u64,
    rx_since_tick: u64,
    tx_since_tick: u64,
}

async fn run_aggregator(
    mut backends_rx: mpsc::Receiver<BackendsSnapshot>, mut traffic_rx: mpsc::Receiver<ReadWriteCount>,
    mut backends_counter_in_rx: mpsc::Receiver<Vec<Target>>, backends_counter_out_tx: mpsc::Sender<BandwidthStats>,
) {
    let mut totals: HashMap<Target, Accumulated> = HashMap::new();
    let mut tick = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            snapshot = backends_rx.recv() => {
                match snapshot {
                    Some(snapshot) => debug!("[stats] received backends push ({} backends)", snapshot.len()),
                    None => break,
                }
            },
            rwc = traffic_rx.recv() => {
                match rwc {
                    Some(rwc) => {
                        if let Some(target) = rwc.target {
                            let entry = totals.entry(target).or_default();
                            entry.rx_total += rwc.count_read;
                            entry.tx_total += rwc.count_write;
                            entry.rx_since_tick += rwc.count_read;
                            entry.tx_since_tick += rwc.count_write;
                        }
                    },
                    None => break,
                }
            },
            targets = backends_counter_in_rx.recv() => {
                match targets {
                    Some(targets) => {
                        totals.retain(|target, _| targets.contains(target));
                        for target in targets {
                            totals.entry(target).or_default();
                        }
                    },
                    None => break,
                }
            },
            _ = tick.tick() => {
                for (target, accumulated) in totals.iter_mut() {
                    let stats = BandwidthStats {
                        target: target.clone(),
                        rx_total: accumulated.rx_total,
                        tx_total: accumulated.tx_total,
                        rx_second: accumulated.rx_since_tick,
                        tx_second: accumulated.tx_since_tick,
                    };
                    accumulated.rx_since_tick = 0;
                    accumulated.tx_since_tick = 0;

                    if backends_counter_out_tx.send(stats).await.is_err() {
                        return;
                    }
                }
            },
        }
    }
}
