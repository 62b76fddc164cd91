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

use tokio::sync::watch;

/// An idempotent, cloneable "fire once" stop token.
///
/// The source this was ported from closed a stop channel in one place and
/// sent on it in another, which panics the second time anything touches a
/// closed channel. A `watch` cell sidesteps that: it always holds the
/// latest value, so `fire()` from any clone, any number of times, is
/// indistinguishable from a single call, and a waiter that starts
/// watching after the fire still observes it immediately.
#[derive(Clone)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

impl StopSignal {
    pub fn new() -> StopSignal {
        let (tx, _rx) = watch::channel(false);
        StopSignal { tx }
    }

    /// Requests a stop. Safe to call more than once, from more than one
    /// clone, concurrently.
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }

    /// Resolves once `fire()` has been called. If it already has been,
    /// resolves immediately on the next poll.
    pub async fn notified(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                return;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}
