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

//! The firewall collaborator: a single operation, `deny(host, ttl)`, that
//! the filter pipeline calls when a connection is refused. Storage is
//! unspecified by the core; this module ships one concrete, in-memory
//! implementation sufficient for tests and a single-process deployment.

mod in_memory;

pub use in_memory::InMemoryFirewall;

use async_trait::async_trait;
use std::time::Duration;

/// A collaborator that can deny a host for some duration and answer
/// whether a host is currently denied.
#[async_trait]
pub trait Firewall: Send + Sync {
    async fn deny(&self, host: String, duration: Duration);
    async fn is_denied(&self, host: &str) -> bool;
}
