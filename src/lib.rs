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

//! `tcpwder` is the backend scheduler and connection filter pipeline at
//! the core of a TCP load balancer. It owns the set of upstream backends,
//! serves election requests from connection handlers, accounts
//! per-backend liveness and traffic statistics, and runs a registered
//! chain of per-connection filters (notably a reconnect-rate limiter
//! cooperating with a firewall deny list).
//!
//! What this crate does NOT do: accept sockets, copy bytes between
//! client and backend, resolve DNS or exec-based service discovery, or
//! parse a CLI. Those are the surrounding binary's job; this crate only
//! specifies and implements the collaborators they drive.

pub mod balance;
pub mod config;
pub mod core;
pub mod errors;
pub mod filter;
pub mod firewall;
pub mod scheduler;
pub mod stats;
pub mod upstream;
pub mod util;

pub use crate::core::{Backend, BackendStats, BackendsSnapshot, BandwidthStats, Context, ReadWriteCount, Target};
pub use crate::errors::{CreationError, ElectError, FilterError, SchedulerError};
pub use crate::scheduler::{Op, OpAction, SchedulerHandle};
