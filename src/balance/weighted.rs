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

/// Round robin over a sequence that repeats each candidate `weight`
/// times; a backend with weight 0 is excluded even if live.
///
/// The weighted sequence is rebuilt on every call from the current
/// candidate slice rather than cached, so it automatically tracks
/// discovery churn the same way the plain round robin cursor does.
pub struct Weighted {
    cursor: AtomicUsize,
}

impl Weighted {
    pub fn new() -> Weighted {
        Weighted { cursor: AtomicUsize::new(0) }
    }

    fn expand(candidates: &[Backend]) -> Vec<usize> {
        let mut sequence = Vec::new();
        for (index, backend) in candidates.iter().enumerate() {
            for _ in 0..backend.weight {
                sequence.push(index);
            }
        }
        sequence
    }
}

impl Default for Weighted {
    fn default() -> Self {
        Weighted::new()
    }
}

impl Balancer for Weighted {
    fn elect(&self, _context: &Context, candidates: &[Backend]) -> Result<Backend, ElectError> {
        let sequence = Self::expand(candidates);
        if sequence.is_empty() {
            return Err(ElectError::NoBackendsAvailable);
        }

        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % sequence.len();
        Ok(candidates[sequence[position]].clone())
    }
}
