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

//! The discovery collaborator: produces a stream of full backend-set
//! snapshots. Static, DNS and exec-based discovery all implement the same
//! trait; only the static variant ships here, the rest are out of scope.

mod static_upstream;

pub use static_upstream::StaticUpstream;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::core::BackendsSnapshot;

/// A source of backend discovery snapshots.
///
/// Each item the returned stream produces fully replaces the previous
/// set; there are no incremental deltas at this boundary. The stream runs
/// on the upstream's own task — the scheduler only pulls from it.
#[async_trait]
pub trait Upstream: Send + Sync {
    type DiscoverStream: Stream<Item = BackendsSnapshot> + Send + Unpin;

    /// Starts producing snapshots. Called once by the scheduler at
    /// startup.
    async fn start(&mut self);

    /// Requests the upstream stop producing snapshots.
    async fn stop(&mut self);

    /// Returns the stream of snapshots. May only be called once.
    fn discover(&mut self) -> Self::DiscoverStream;
}
