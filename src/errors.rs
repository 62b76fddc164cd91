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

use thiserror::Error;

/// Errors a balancer, or the scheduler acting on its behalf, can return
/// from an election attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectError {
    #[error("no backends available")]
    NoBackendsAvailable,

    #[error("all backends are down")]
    AllBackendsDown,

    #[error("balancer policy rejected the request: {0}")]
    PolicyRejected(String),
}

/// Errors surfaced by the filter pipeline to the connection handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter rejected connection: {0}")]
    Rejected(String),
}

/// Errors surfaced by the scheduler's own lifecycle operations (not
/// elections, which use [`ElectError`]).
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler already started")]
    AlreadyStarted,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("upstream discovery stream ended")]
    UpstreamGone,
}

/// Construction-time configuration failures. Fatal to the server being
/// built, but not to other servers in the same process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreationError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),
}
