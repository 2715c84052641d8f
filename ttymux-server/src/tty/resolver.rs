//! Read authority for one terminal, bound to one viewer
//!
//! A resolver owns the reads it has forwarded to its viewer, keyed by request
//! ids from its own pool. When it is superseded or released its reads are
//! handed to the successor, put back in the channel, or failed, and the claim
//! future returned to the claimer settles.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use ttymux_protocol::{ReadRequest, RequestId, ServerMessage, TerminalIndex};

use super::id_pool::IdPool;
use super::pending::{PendingRequest, ReadError, ReadOutcome};
use crate::registry::{ViewerId, ViewerRegistry};

/// Unique resolver identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverId(u64);

impl ResolverId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResolverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resolver({})", self.0)
    }
}

/// Why a resolver lost read authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeReason {
    /// Another claim for the same terminal replaced it
    Superseded,
    /// The viewer disabled reading
    Released,
    /// The viewer's connection ended
    ViewerDisconnected,
    /// The terminal was deleted
    ChannelDeleted,
    /// The center went away
    Shutdown,
}

/// Future settling when read authority ends
#[derive(Debug)]
pub struct Revoked {
    rx: oneshot::Receiver<RevokeReason>,
}

impl Future for Revoked {
    type Output = RevokeReason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(RevokeReason::Shutdown))
    }
}

/// Handle returned to whoever claimed read authority
#[derive(Debug)]
pub struct ReadClaim {
    resolver_id: ResolverId,
    index: TerminalIndex,
    viewer: ViewerId,
    revoked: Revoked,
}

impl ReadClaim {
    pub fn resolver_id(&self) -> ResolverId {
        self.resolver_id
    }

    pub fn index(&self) -> TerminalIndex {
        self.index
    }

    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    /// Non-blocking check, `None` while authority is still held
    pub fn try_revoked(&mut self) -> Option<RevokeReason> {
        match self.revoked.rx.try_recv() {
            Ok(reason) => Some(reason),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(RevokeReason::Shutdown),
        }
    }

    /// Give up the identity accessors and keep only the future
    pub fn into_revoked(self) -> Revoked {
        self.revoked
    }
}

impl Future for ReadClaim {
    type Output = RevokeReason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.revoked).poll(cx)
    }
}

/// The active reader of one terminal
#[derive(Debug)]
pub struct ReadResolver {
    id: ResolverId,
    index: TerminalIndex,
    viewer: ViewerId,
    ids: IdPool,
    outstanding: HashMap<RequestId, PendingRequest>,
    revoke_tx: Option<oneshot::Sender<RevokeReason>>,
}

impl ReadResolver {
    pub fn new(
        id: ResolverId,
        index: TerminalIndex,
        viewer: ViewerId,
        max_request_ids: RequestId,
    ) -> (Self, ReadClaim) {
        let (revoke_tx, rx) = oneshot::channel();
        let resolver = Self {
            id,
            index,
            viewer,
            ids: IdPool::new(max_request_ids),
            outstanding: HashMap::new(),
            revoke_tx: Some(revoke_tx),
        };
        let claim = ReadClaim {
            resolver_id: id,
            index,
            viewer,
            revoked: Revoked { rx },
        };
        (resolver, claim)
    }

    pub fn id(&self) -> ResolverId {
        self.id
    }

    pub fn index(&self) -> TerminalIndex {
        self.index
    }

    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Forwarded reads with their ids, in no particular order
    pub fn outstanding(&self) -> impl Iterator<Item = (RequestId, &PendingRequest)> {
        self.outstanding.iter().map(|(id, pending)| (*id, pending))
    }

    /// Creation time of the oldest forwarded read
    pub fn oldest_created_at(&self) -> Option<DateTime<Utc>> {
        self.outstanding.values().map(PendingRequest::created_at).min()
    }

    /// Send a read to this resolver's viewer under a fresh id
    ///
    /// The read stays outstanding even if the viewer can't be reached. The
    /// registry then drops the viewer and the center takes the read back.
    /// Returns the id used, or `None` if the pool was exhausted and the read
    /// was failed.
    pub fn forward(
        &mut self,
        pending: PendingRequest,
        registry: &ViewerRegistry,
    ) -> Option<RequestId> {
        let Some(request_id) = self.ids.allocate() else {
            warn!(
                terminal = %self.index,
                resolver = %self.id,
                "Request id pool exhausted, failing read"
            );
            pending.fail(ReadError::IdsExhausted {
                terminal: self.index,
            });
            return None;
        };

        let request: ReadRequest = pending.request().clone();
        debug!(
            terminal = %self.index,
            request_id,
            kind = request.kind(),
            viewer = %self.viewer,
            "Forwarding read"
        );
        self.outstanding.insert(request_id, pending);

        let delivered = registry.try_send_to_viewer(
            self.viewer,
            ServerMessage::SendReadRequest {
                terminal: self.index,
                request_id,
                request,
            },
        );
        if !delivered {
            debug!(
                terminal = %self.index,
                request_id,
                "Read held for undeliverable viewer"
            );
        }
        Some(request_id)
    }

    /// Settle one outstanding read
    ///
    /// Returns `false` for ids that are unknown, already settled, or moved to
    /// another resolver.
    pub fn settle(&mut self, request_id: RequestId, outcome: ReadOutcome) -> bool {
        match self.outstanding.remove(&request_id) {
            Some(pending) => {
                self.ids.release(request_id);
                pending.settle(outcome);
                true
            }
            None => false,
        }
    }

    /// Take every outstanding read, in issue order, freeing their ids
    pub fn take_outstanding(&mut self) -> Vec<PendingRequest> {
        let mut taken: Vec<(RequestId, PendingRequest)> = self.outstanding.drain().collect();
        taken.sort_by_key(|(_, pending)| pending.seq());
        taken
            .into_iter()
            .map(|(request_id, pending)| {
                self.ids.release(request_id);
                pending
            })
            .collect()
    }

    /// Fail every outstanding read
    pub fn fail_all(&mut self, error: ReadError) -> usize {
        let taken = self.take_outstanding();
        let count = taken.len();
        for pending in taken {
            pending.fail(error.clone());
        }
        count
    }

    /// Settle the claim future
    ///
    /// Only the first call has an effect.
    pub fn revoke(&mut self, reason: RevokeReason) {
        if let Some(tx) = self.revoke_tx.take() {
            debug!(resolver = %self.id, terminal = %self.index, ?reason, "Read authority revoked");
            let _ = tx.send(reason);
        }
    }
}
