//! Registry of terminals and their active readers
//!
//! The center owns every channel and every resolver, keyed by terminal index.
//! Channels and resolvers never point at each other; whenever one needs the
//! other (a released resolver handing reads back, a deleted channel failing
//! reads its resolver holds) the center looks it up here.
//!
//! Every method runs to completion under the caller's lock, so each claim,
//! release, write or answer is one atomic step.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use ttymux_protocol::{
    OutputRecord, ReadRequest, ReadResponse, RequestId, ServerMessage, TerminalIndex, TerminalInfo,
};

use super::channel::{ChannelId, TtyChannel};
use super::pending::{PendingRequest, ReadError, ReadHandle, ReadOutcome};
use super::resolver::{ReadClaim, ReadResolver, ResolverId, RevokeReason};
use crate::config::TtyConfig;
use crate::registry::{ViewerId, ViewerRegistry};

/// Center shared between connection tasks and the application
pub type SharedCenter = Arc<Mutex<TtyCenter>>;

/// Where a pending read currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLocation {
    /// Waiting in the channel for a viewer to claim the terminal
    Unsent,
    /// Forwarded to the active viewer under `request_id`
    Resolver {
        resolver: ResolverId,
        request_id: RequestId,
    },
}

/// Snapshot of one pending read, for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct OutstandingRequest {
    pub index: TerminalIndex,
    pub seq: u64,
    pub location: RequestLocation,
    pub request: ReadRequest,
}

/// Owner of all terminals and read authority
pub struct TtyCenter {
    channels: BTreeMap<TerminalIndex, TtyChannel>,
    readers: HashMap<TerminalIndex, ReadResolver>,
    viewers: Arc<ViewerRegistry>,
    config: TtyConfig,
    next_channel_id: u64,
    next_resolver_id: u64,
    /// Issue order of reads across all terminals
    next_seq: u64,
}

impl TtyCenter {
    pub fn new(viewers: Arc<ViewerRegistry>, config: TtyConfig) -> Self {
        Self {
            channels: BTreeMap::new(),
            readers: HashMap::new(),
            viewers,
            config,
            next_channel_id: 1,
            next_resolver_id: 1,
            next_seq: 0,
        }
    }

    /// Wrap the center for sharing between tasks
    pub fn into_shared(self) -> SharedCenter {
        Arc::new(Mutex::new(self))
    }

    pub fn viewers(&self) -> &Arc<ViewerRegistry> {
        &self.viewers
    }

    pub fn config(&self) -> &TtyConfig {
        &self.config
    }

    // ==================== Channels ====================

    pub fn get(&self, index: TerminalIndex) -> Option<&TtyChannel> {
        self.channels.get(&index)
    }

    /// Look up a channel, creating it on first use
    pub fn get_or_create(&mut self, index: TerminalIndex) -> &mut TtyChannel {
        let capacity = self.config.cache_capacity;
        let next_channel_id = &mut self.next_channel_id;
        self.channels.entry(index).or_insert_with(|| {
            let id = ChannelId::new(*next_channel_id);
            *next_channel_id += 1;
            debug!(terminal = %index, channel = %id, "Channel created");
            TtyChannel::new(id, index, capacity)
        })
    }

    /// Whether `index` is still served by the channel instance `id`
    pub fn is_live(&self, index: TerminalIndex, id: ChannelId) -> bool {
        self.channels
            .get(&index)
            .is_some_and(|channel| channel.id() == id && !channel.is_disposed())
    }

    /// All channels in index order
    pub fn channels(&self) -> impl Iterator<Item = &TtyChannel> {
        self.channels.values()
    }

    /// Append a record to a terminal and fan it out to every viewer
    pub fn write(&mut self, index: TerminalIndex, record: OutputRecord) {
        let kind = record.kind();
        self.get_or_create(index).append(record.clone());
        let delivered = self.viewers.broadcast_to_all(ServerMessage::WriteTty {
            terminal: index,
            record,
        });
        debug!(terminal = %index, kind, delivered, "Output written");
        self.release_unreachable();
    }

    /// Issue a read on a terminal
    ///
    /// With an active reader the request goes out immediately; otherwise it
    /// waits in the channel until some viewer claims the terminal.
    pub fn read(&mut self, index: TerminalIndex, request: ReadRequest) -> ReadHandle {
        let seq = self.next_seq;
        self.next_seq += 1;

        let (pending, handle) = PendingRequest::new(seq, request);
        if let Some(resolver) = self.readers.get_mut(&index) {
            resolver.forward(pending, &self.viewers);
        } else {
            debug!(terminal = %index, seq, "No reader, queueing read");
            self.get_or_create(index).enqueue(pending);
        }
        self.release_unreachable();
        handle
    }

    /// Replayable output of a terminal, oldest first
    ///
    /// Unknown terminals have no history; looking one up does not create it.
    pub fn cached_output(&self, index: TerminalIndex) -> Vec<OutputRecord> {
        self.channels
            .get(&index)
            .map(TtyChannel::cached_records)
            .unwrap_or_default()
    }

    pub fn set_cache_capacity(&mut self, index: TerminalIndex, capacity: usize) {
        self.get_or_create(index).set_cache_capacity(capacity);
    }

    /// Delete a terminal
    ///
    /// Every read reachable from it fails with [`ReadError::Disposed`], and
    /// its reader loses authority. Returns whether the terminal existed.
    pub fn delete(&mut self, index: TerminalIndex) -> bool {
        let Some(mut channel) = self.channels.remove(&index) else {
            return false;
        };

        let unsent = channel.dispose();
        let mut held = 0;
        if let Some(mut resolver) = self.readers.remove(&index) {
            held = resolver.fail_all(ReadError::Disposed { terminal: index });
            self.retire(resolver, RevokeReason::ChannelDeleted);
        }

        info!(terminal = %index, unsent, held, "Terminal deleted");
        self.release_unreachable();
        true
    }

    // ==================== Read authority ====================

    /// Viewer currently holding read authority for a terminal
    pub fn reader(&self, index: TerminalIndex) -> Option<ViewerId> {
        self.readers.get(&index).map(ReadResolver::viewer)
    }

    /// Give `viewer` read authority over a terminal
    ///
    /// A previous reader is superseded and everything it still held is
    /// resent to `viewer` under new ids. Reads queued while nobody held the
    /// terminal are sent next. The returned claim settles when `viewer`
    /// loses authority.
    pub fn set_reader(&mut self, index: TerminalIndex, viewer: ViewerId) -> ReadClaim {
        self.get_or_create(index);

        let resolver_id = ResolverId::new(self.next_resolver_id);
        self.next_resolver_id += 1;

        let (resolver, claim) =
            ReadResolver::new(resolver_id, index, viewer, self.config.max_request_ids);
        info!(terminal = %index, %viewer, resolver = %resolver_id, "Read authority claimed");

        // The new resolver must be active before the old one retires so the
        // old one hands its reads over instead of requeueing them
        if let Some(previous) = self.readers.insert(index, resolver) {
            self.retire(previous, RevokeReason::Superseded);
        }
        self.flush_unsent(index);
        self.release_unreachable();

        claim
    }

    /// Drop `viewer`'s read authority over a terminal
    ///
    /// Returns `false` if `viewer` does not hold it.
    pub fn release_reader(&mut self, index: TerminalIndex, viewer: ViewerId) -> bool {
        if self.reader(index) != Some(viewer) {
            return false;
        }
        match self.readers.remove(&index) {
            Some(resolver) => {
                self.retire(resolver, RevokeReason::Released);
                self.release_unreachable();
                true
            }
            None => false,
        }
    }

    /// Drop every claim held by a viewer that went away
    ///
    /// Returns the number of claims released.
    pub fn release_viewer(&mut self, viewer: ViewerId) -> usize {
        let held: Vec<TerminalIndex> = self
            .readers
            .iter()
            .filter(|(_, resolver)| resolver.viewer() == viewer)
            .map(|(index, _)| *index)
            .collect();

        for index in &held {
            if let Some(resolver) = self.readers.remove(index) {
                self.retire(resolver, RevokeReason::ViewerDisconnected);
            }
        }

        if !held.is_empty() {
            info!(%viewer, released = held.len(), "Released claims of departed viewer");
        }
        held.len()
    }

    /// Answer a read
    ///
    /// Only the viewer holding the terminal may answer. On success every
    /// other viewer is told to dismiss the request.
    pub fn resolve(
        &mut self,
        index: TerminalIndex,
        viewer: ViewerId,
        request_id: RequestId,
        value: ReadResponse,
    ) -> bool {
        if !self.settle(index, viewer, request_id, Ok(value)) {
            return false;
        }
        self.viewers.broadcast_to_all_except(
            viewer,
            ServerMessage::CancelReadRequest {
                terminal: index,
                request_id,
            },
        );
        self.release_unreachable();
        true
    }

    /// Refuse a read; its caller sees [`ReadError::Rejected`]
    pub fn reject(
        &mut self,
        index: TerminalIndex,
        viewer: ViewerId,
        request_id: RequestId,
        reason: String,
    ) -> bool {
        self.settle(index, viewer, request_id, Err(ReadError::Rejected(reason)))
    }

    /// Release every claim held by a viewer the registry has dropped
    ///
    /// The registry drops a viewer whose queue filled up or closed, so a read
    /// sent to it may never arrive. Its reads go back to the channel until
    /// someone claims the terminal again.
    fn release_unreachable(&mut self) -> usize {
        let lost: BTreeSet<ViewerId> = self
            .readers
            .values()
            .map(ReadResolver::viewer)
            .filter(|viewer| !self.viewers.contains(*viewer))
            .collect();

        lost.into_iter()
            .map(|viewer| {
                warn!(%viewer, "Reader unreachable, taking back its reads");
                self.release_viewer(viewer)
            })
            .sum()
    }

    fn settle(
        &mut self,
        index: TerminalIndex,
        viewer: ViewerId,
        request_id: RequestId,
        outcome: ReadOutcome,
    ) -> bool {
        let Some(resolver) = self.readers.get_mut(&index) else {
            debug!(terminal = %index, request_id, "Answer for terminal without reader");
            return false;
        };
        if resolver.viewer() != viewer {
            debug!(
                terminal = %index,
                request_id,
                %viewer,
                holder = %resolver.viewer(),
                "Answer from viewer without read authority"
            );
            return false;
        }
        resolver.settle(request_id, outcome)
    }

    /// Send every queued read of a terminal to its active reader
    fn flush_unsent(&mut self, index: TerminalIndex) -> usize {
        let Some(resolver) = self.readers.get_mut(&index) else {
            return 0;
        };
        let Some(channel) = self.channels.get_mut(&index) else {
            return 0;
        };

        let unsent = channel.take_unsent();
        let count = unsent.len();
        for pending in unsent {
            resolver.forward(pending, &self.viewers);
        }
        if count > 0 {
            debug!(terminal = %index, count, "Flushed queued reads");
        }
        count
    }

    /// Take authority away from a resolver already removed from `readers`
    ///
    /// Its reads go to the terminal's new reader if there is one, back into
    /// the channel if it is still alive, and fail otherwise.
    fn retire(&mut self, mut old: ReadResolver, reason: RevokeReason) {
        let index = old.index();
        old.revoke(reason);

        let successor = self.readers.get(&index).map(ReadResolver::viewer);
        if reason != RevokeReason::ViewerDisconnected && successor != Some(old.viewer()) {
            self.viewers.try_send_to_viewer(
                old.viewer(),
                ServerMessage::ReadAuthorityRevoked { terminal: index },
            );
        }

        let held = old.take_outstanding();
        if held.is_empty() {
            return;
        }
        let count = held.len();

        if let Some(resolver) = self.readers.get_mut(&index) {
            debug!(terminal = %index, count, to = %resolver.id(), "Transferring reads");
            for pending in held {
                resolver.forward(pending, &self.viewers);
            }
        } else if let Some(channel) = self
            .channels
            .get_mut(&index)
            .filter(|channel| !channel.is_disposed())
        {
            debug!(terminal = %index, count, "Requeueing reads");
            channel.requeue(held);
        } else {
            warn!(terminal = %index, count, "Reads lost both reader and channel");
            for pending in held {
                pending.fail(ReadError::Internal(format!(
                    "terminal {} has no reader and no channel",
                    index
                )));
            }
        }
    }

    /// Fail every pending read and revoke every claim
    pub fn shutdown(&mut self) {
        let readers: Vec<ReadResolver> = self.readers.drain().map(|(_, resolver)| resolver).collect();
        for mut resolver in readers {
            resolver.fail_all(ReadError::Disposed {
                terminal: resolver.index(),
            });
            resolver.revoke(RevokeReason::Shutdown);
        }
        for (_, mut channel) in std::mem::take(&mut self.channels) {
            channel.dispose();
        }
        info!("Terminal center shut down");
    }

    // ==================== Diagnostics ====================

    /// Every pending read in issue order
    pub fn outstanding(&self) -> Vec<OutstandingRequest> {
        let mut requests: Vec<OutstandingRequest> = self
            .channels
            .values()
            .flat_map(|channel| {
                channel.unsent().map(move |pending| OutstandingRequest {
                    index: channel.index(),
                    seq: pending.seq(),
                    location: RequestLocation::Unsent,
                    request: pending.request().clone(),
                })
            })
            .collect();

        requests.extend(self.readers.values().flat_map(|resolver| {
            resolver
                .outstanding()
                .map(move |(request_id, pending)| OutstandingRequest {
                    index: resolver.index(),
                    seq: pending.seq(),
                    location: RequestLocation::Resolver {
                        resolver: resolver.id(),
                        request_id,
                    },
                    request: pending.request().clone(),
                })
        }));

        requests.sort_by_key(|request| request.seq);
        requests
    }

    /// Summary of every terminal, in index order
    pub fn terminal_info(&self) -> Vec<TerminalInfo> {
        let now = Utc::now();
        self.channels
            .values()
            .map(|channel| {
                let resolver = self.readers.get(&channel.index());
                let oldest: Option<DateTime<Utc>> = channel
                    .unsent()
                    .map(PendingRequest::created_at)
                    .chain(resolver.and_then(ReadResolver::oldest_created_at))
                    .min();

                TerminalInfo {
                    terminal: channel.index(),
                    cached_records: clamp_u32(channel.cache().len()),
                    unsent_requests: clamp_u32(channel.unsent_len()),
                    outstanding_requests: clamp_u32(resolver.map_or(0, ReadResolver::outstanding_len)),
                    reader: resolver.map(|resolver| resolver.viewer().value()),
                    oldest_pending_ms: oldest
                        .map(|created| (now - created).num_milliseconds().max(0) as u64),
                }
            })
            .collect()
    }
}

fn clamp_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl std::fmt::Debug for TtyCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyCenter")
            .field("channels", &self.channels.len())
            .field("readers", &self.readers.len())
            .field("viewers", &self.viewers.viewer_count())
            .finish()
    }
}
