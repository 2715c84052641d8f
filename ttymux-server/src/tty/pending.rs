//! Pending read requests and their single-settlement futures

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use ttymux_protocol::{ReadRequest, ReadResponse, TerminalIndex};

/// Why a read request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The terminal was deleted while the request was pending
    #[error("terminal {terminal} was deleted")]
    Disposed { terminal: TerminalIndex },

    /// The viewer holding read authority rejected the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The active resolver had no request id left to forward under
    #[error("no request ids left for terminal {terminal}")]
    IdsExhausted { terminal: TerminalIndex },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Final outcome of a read request
pub type ReadOutcome = Result<ReadResponse, ReadError>;

/// A read request waiting for an answer
///
/// Lives in exactly one place at a time: a channel's unsent queue or a
/// resolver's outstanding map. Settling consumes it.
#[derive(Debug)]
pub struct PendingRequest {
    seq: u64,
    request: ReadRequest,
    created_at: DateTime<Utc>,
    tx: oneshot::Sender<ReadOutcome>,
}

impl PendingRequest {
    /// Create a request and the handle its caller awaits
    pub fn new(seq: u64, request: ReadRequest) -> (Self, ReadHandle) {
        let (tx, rx) = oneshot::channel();
        let pending = Self {
            seq,
            request,
            created_at: Utc::now(),
            tx,
        };
        (pending, ReadHandle { rx })
    }

    /// Center-wide issue order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Settle the request
    ///
    /// A caller that already dropped its handle is not an error.
    pub fn settle(self, outcome: ReadOutcome) {
        let _ = self.tx.send(outcome);
    }

    /// Fail the request
    pub fn fail(self, error: ReadError) {
        self.settle(Err(error));
    }
}

/// Future returned by a read, resolving once with the viewer's answer
#[derive(Debug)]
pub struct ReadHandle {
    rx: oneshot::Receiver<ReadOutcome>,
}

impl ReadHandle {
    /// A handle that is already settled
    pub fn settled(outcome: ReadOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Non-blocking check for the outcome
    ///
    /// Returns `None` while the request is still pending.
    pub fn try_result(&mut self) -> Option<ReadOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(dropped())),
        }
    }
}

impl Future for ReadHandle {
    type Output = ReadOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(dropped())))
    }
}

fn dropped() -> ReadError {
    ReadError::Internal("request dropped without an answer".into())
}
