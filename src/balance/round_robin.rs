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

use std::sync::atomic::{AtomicUsize, Ordering};

use super::Balancer;
use crate::core::{Backend, Context};
use crate::errors::ElectError;

/// Cursor-based round robin. The cursor is taken modulo the *current*
/// candidate count on every call, so it tolerates the live set shrinking
/// or growing between elections without ever indexing out of bounds.
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> RoundRobin {
        RoundRobin { cursor: AtomicUsize::new(0) }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        RoundRobin::new()
    }
}

impl Balancer for RoundRobin {
    fn elect(&self, _context: &Context, candidates: &[Backend]) -> Result<Backend, ElectError> {
        if candidates.is_empty() {
            return Err(ElectError::NoBackendsAvailable);
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Ok(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Target;
    use std::net::SocketAddr;

    fn backend(host: &str) -> Backend {
        Backend::new(Target::new(host, 80), 0, 1, None)
    }

    fn ctx() -> Context {
        Context::new("127.0.0.1:1234".parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn cycles_in_order() {
        let rr = RoundRobin::new();
        let candidates = vec![backend("a"), backend("b")];

        let first = rr.elect(&ctx(), &candidates).unwrap();
        let second = rr.elect(&ctx(), &candidates).unwrap();
        let third = rr.elect(&ctx(), &candidates).unwrap();

        assert_eq!(first.target.host, "a");
        assert_eq!(second.target.host, "b");
        assert_eq!(third.target.host, "a");
    }

    #[test]
    fn empty_candidates_is_rejected() {
        let rr = RoundRobin::new();
        assert_eq!(rr.elect(&ctx(), &[]), Err(ElectError::NoBackendsAvailable));
    }

    #[test]
    fn tolerates_shrinking_candidate_set() {
        let rr = RoundRobin::new();
        let three = vec![backend("a"), backend("b"), backend("c")];
        let two = vec![backend("a"), backend("c")];

        let _ = rr.elect(&ctx(), &three).unwrap();
        let _ = rr.elect(&ctx(), &three).unwrap();
        // cursor is now 2; shrinking to 2 candidates must not panic
        let picked = rr.elect(&ctx(), &two).unwrap();
        assert!(picked.target.host == "a" || picked.target.host == "c");
    }
}
