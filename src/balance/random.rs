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

use rand::Rng;

use super::Balancer;
use crate::core::{Backend, Context};
use crate::errors::ElectError;

/// Uniformly samples one live candidate.
pub struct Random;

impl Random {
    pub fn new() -> Random {
        Random
    }
}

impl Default for Random {
    fn default() -> Self {
        Random::new()
    }
}

impl Balancer for Random {
    fn elect(&self, _context: &Context, candidates: &[Backend]) -> Result<Backend, ElectError> {
        if candidates.is_empty() {
            return Err(ElectError::NoBackendsAvailable);
        }

        let index = rand::thread_rng().gen_range(0..candidates.len());
        Ok(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Target;
    use std::net::SocketAddr;

    fn ctx() -> Context {
        Context::new("127.0.0.1:1234".parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn always_picks_from_candidates() {
        let r = Random::new();
        let candidates = vec![Backend::new(Target::new("a", 80), 0, 1, None)];
        let picked = r.elect(&ctx(), &candidates).unwrap();
        assert_eq!(picked.target.host, "a");
    }

    #[test]
    fn empty_candidates_is_rejected() {
        let r = Random::new();
        assert_eq!(r.elect(&ctx(), &[]), Err(ElectError::NoBackendsAvailable));
    }
}
