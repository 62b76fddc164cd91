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

//! Balancer contract and the policies shipped behind it.
//!
//! A balancer is a pure function of a context and a candidate slice. It
//! must never block and must never call back into the scheduler: it runs
//! inline on the scheduler's loop task, so any stateful balancer (e.g. a
//! round-robin cursor) keeps that state inside its own instance.

mod least_conn;
mod random;
mod round_robin;
mod weighted;

pub use least_conn::LeastConnections;
pub use random::Random;
pub use round_robin::RoundRobin;
pub use weighted::Weighted;

use crate::core::{Backend, Context};
use crate::errors::ElectError;

/// Pure backend-selection policy over a slice of live candidates.
pub trait Balancer: Send + Sync {
    /// Chooses one candidate for the given context.
    ///
    /// `candidates` holds only backends the scheduler has already
    /// filtered to `live == true`, in discovery order. Implementations
    /// must tolerate the candidate set changing in size or membership
    /// between calls (e.g. a remembered cursor is taken modulo the
    /// *current* length, never a cached one).
    fn elect(&self, context: &Context, candidates: &[Backend]) -> Result<Backend, ElectError>;
}

/// Builds the balancer named by the `balance` configuration key.
///
/// This is the process-wide registry the source keeps as a global map of
/// constructors; here it is a plain match over a closed set of shipped
/// policies, constructed once at server startup and owned by the caller,
/// per the dependency-injection guidance in the design notes.
pub fn from_name(name: &str) -> Result<Box<dyn Balancer>, crate::errors::CreationError> {
    match name {
        "round_robin" => Ok(Box::new(RoundRobin::new())),
        "least_conn" | "least_connections" => Ok(Box::new(LeastConnections::new())),
        "random" => Ok(Box::new(Random::new())),
        "weighted" => Ok(Box::new(Weighted::new())),
        other => Err(crate::errors::CreationError::InvalidResource(format!(
            "unknown balance policy: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(from_name("made-up").is_err());
    }

    #[test]
    fn known_policies_construct() {
        for name in ["round_robin", "least_conn", "random", "weighted"] {
            assert!(from_name(name).is_ok(), "expected {} to construct", name);
        }
    }
}
