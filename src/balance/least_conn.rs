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

use super::Balancer;
use crate::core::{Backend, Context};
use crate::errors::ElectError;

/// Picks the candidate with the fewest active connections. Ties are
/// broken by discovery order (first occurrence wins), keeping the policy
/// deterministic for a fixed input slice.
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> LeastConnections {
        LeastConnections
    }
}

impl Default for LeastConnections {
    fn default() -> Self {
        LeastConnections::new()
    }
}

impl Balancer for LeastConnections {
    fn elect(&self, _context: &Context, candidates: &[Backend]) -> Result<Backend, ElectError> {
        candidates
            .iter()
            .min_by_key(|b| b.stats.active_connections)
            .cloned()
            .ok_or(ElectError::NoBackendsAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Target;
    use std::net::SocketAddr;

    fn backend(host: &str, active: u32) -> Backend {
        let mut b = Backend::new(Target::new(host, 80), 0, 1, None);
        b.stats.active_connections = active;
        b
    }

    fn ctx() -> Context {
        Context::new("127.0.0.1:1234".parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn picks_lowest_load() {
        let lc = LeastConnections::new();
        let candidates = vec![backend("a", 5), backend("b", 1), backend("c", 3)];
        let picked = lc.elect(&ctx(), &candidates).unwrap();
        assert_eq!(picked.target.host, "b");
    }

    #[test]
    fn ties_favor_first_occurrence() {
        let lc = LeastConnections::new();
        let candidates = vec![backend("a", 2), backend("b", 2)];
        let picked = lc.elect(&ctx(), &candidates).unwrap();
        assert_eq!(picked.target.host, "a");
    }
}
