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

//! Shared data types that flow between the scheduler, the balancer, the
//! upstream collaborator and the stats surface.

use std::net::SocketAddr;

/// Identity of a backend server: host and port.
///
/// Structural equality and hashing make this usable directly as a map key;
/// the scheduler never tracks a backend by anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Target {
        Target { host: host.into(), port }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Point-in-time liveness and traffic counters for a single backend.
///
/// Mutated exclusively by the scheduler loop; discovery metadata on the
/// owning [`Backend`] is mutated only when a new snapshot arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStats {
    pub live: bool,
    pub active_connections: u32,
    pub total_connections: u64,
    pub refused_connections: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_second: u64,
    pub tx_second: u64,
}

/// A backend server: its identity, discovery-supplied metadata, and its
/// current stats as last seen by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    pub target: Target,
    pub priority: u32,
    pub weight: u32,
    /// Overrides the host used for TLS SNI / protocol-level addressing;
    /// distinct from `target.host`, which is the dial address.
    pub sni: Option<String>,
    pub stats: BackendStats,
}

impl Backend {
    /// Creates a freshly discovered backend: default stats, not yet live.
    pub fn new(target: Target, priority: u32, weight: u32, sni: Option<String>) -> Backend {
        Backend {
            target,
            priority,
            weight,
            sni,
            stats: BackendStats::default(),
        }
    }

    /// Produces a backend carrying `self`'s discovery metadata (the "new"
    /// side of a rediscovery) with `existing`'s stats retained.
    ///
    /// This is the merge rule from `handle_backends_update`: discovery
    /// fields always come from the latest snapshot, stats always survive
    /// from the previously tracked instance.
    pub fn merge_from(&self, existing: &Backend) -> Backend {
        Backend {
            target: self.target.clone(),
            priority: self.priority,
            weight: self.weight,
            sni: self.sni.clone(),
            stats: existing.stats,
        }
    }
}

/// Election input: where the client connected from, and any hint it
/// supplied (e.g. TLS SNI) that a balancer may use to steer its choice.
#[derive(Debug, Clone)]
pub struct Context {
    pub client_addr: SocketAddr,
    pub hint: Option<String>,
}

impl Context {
    pub fn new(client_addr: SocketAddr) -> Context {
        Context { client_addr, hint: None }
    }

    pub fn with_hint(client_addr: SocketAddr, hint: Option<String>) -> Context {
        Context { client_addr, hint }
    }
}

/// A full replacement view of the backend set, as produced by an upstream
/// collaborator. Order is significant and preserved end to end.
pub type BackendsSnapshot = Vec<Backend>;

/// Per-connection byte counts, reported to the stats surface and to the
/// filter pipeline's observational hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadWriteCount {
    pub target: Option<Target>,
    pub count_read: u64,
    pub count_write: u64,
}

/// Bandwidth aggregate computed by the stats collaborator and pushed back
/// to the scheduler so it can refresh a backend's rate fields.
#[derive(Debug, Clone)]
pub struct BandwidthStats {
    pub target: Target,
    pub rx_total: u64,
    pub tx_total: u64,
    pub rx_second: u64,
    pub tx_second: u64,
}

/// Extracts the host portion of a socket address, for use as a filter or
/// firewall key. Always succeeds for a valid `SocketAddr`.
pub fn host_of(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}
