//! Per-terminal state owned by the center

use std::collections::VecDeque;

use tracing::debug;

use ttymux_protocol::{OutputRecord, TerminalIndex};

use super::cache::OutputCache;
use super::pending::{PendingRequest, ReadError};

/// Identity of one channel instance
///
/// Deleting a terminal and creating it again yields a new id, so handles bound
/// to the old instance can tell they are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

/// One virtual terminal: output history plus reads nobody holds yet
#[derive(Debug)]
pub struct TtyChannel {
    id: ChannelId,
    index: TerminalIndex,
    cache: OutputCache,
    /// Reads issued while no viewer held read authority, in issue order
    unsent: VecDeque<PendingRequest>,
    disposed: bool,
}

impl TtyChannel {
    pub fn new(id: ChannelId, index: TerminalIndex, cache_capacity: usize) -> Self {
        Self {
            id,
            index,
            cache: OutputCache::new(cache_capacity),
            unsent: VecDeque::new(),
            disposed: false,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn index(&self) -> TerminalIndex {
        self.index
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Append a record to the output history
    pub fn append(&mut self, record: OutputRecord) {
        self.cache.push(record);
    }

    pub fn cache(&self) -> &OutputCache {
        &self.cache
    }

    /// Cached records in write order, oldest first
    pub fn cached_records(&self) -> Vec<OutputRecord> {
        self.cache.snapshot()
    }

    pub fn set_cache_capacity(&mut self, capacity: usize) {
        self.cache.set_capacity(capacity);
    }

    /// Park a read until some viewer claims this terminal
    pub fn enqueue(&mut self, pending: PendingRequest) {
        self.unsent.push_back(pending);
    }

    /// Drain every parked read, in issue order
    pub fn take_unsent(&mut self) -> Vec<PendingRequest> {
        self.unsent.drain(..).collect()
    }

    /// Put reads handed back by a released resolver back in the queue
    ///
    /// The queue stays sorted by issue order, so requests issued before a
    /// resolver took them are asked again before later ones.
    pub fn requeue(&mut self, requests: Vec<PendingRequest>) {
        if requests.is_empty() {
            return;
        }
        self.unsent.extend(requests);
        self.unsent.make_contiguous().sort_by_key(PendingRequest::seq);
    }

    pub fn unsent_len(&self) -> usize {
        self.unsent.len()
    }

    pub fn unsent(&self) -> impl Iterator<Item = &PendingRequest> {
        self.unsent.iter()
    }

    /// Fail every parked read and mark the channel dead
    ///
    /// Returns the number of reads failed.
    pub fn dispose(&mut self) -> usize {
        self.disposed = true;
        let failed = self.unsent.len();
        for pending in self.unsent.drain(..) {
            pending.fail(ReadError::Disposed {
                terminal: self.index,
            });
        }
        debug!(terminal = %self.index, failed, "Channel disposed");
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttymux_protocol::ReadRequest;

    fn channel() -> TtyChannel {
        TtyChannel::new(ChannelId::new(1), TerminalIndex::from(0), 4)
    }

    #[test]
    fn test_append_and_cache() {
        let mut channel = channel();
        channel.append(OutputRecord::text("a"));
        channel.append(OutputRecord::text("b"));

        assert_eq!(
            channel.cached_records(),
            vec![OutputRecord::text("a"), OutputRecord::text("b")]
        );
    }

    #[test]
    fn test_take_unsent_in_order() {
        let mut channel = channel();
        let (first, _h1) = PendingRequest::new(1, ReadRequest::text("first"));
        let (second, _h2) = PendingRequest::new(2, ReadRequest::text("second"));
        channel.enqueue(first);
        channel.enqueue(second);

        let taken = channel.take_unsent();
        assert_eq!(taken.iter().map(|p| p.seq()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(channel.unsent_len(), 0);
    }

    #[test]
    fn test_requeue_sorts_by_issue_order() {
        let mut channel = channel();
        let (late, _h3) = PendingRequest::new(3, ReadRequest::text("late"));
        channel.enqueue(late);

        let (a, _h1) = PendingRequest::new(1, ReadRequest::text("a"));
        let (b, _h2) = PendingRequest::new(2, ReadRequest::text("b"));
        channel.requeue(vec![b, a]);

        let order: Vec<u64> = channel.unsent().map(|p| p.seq()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dispose_fails_unsent() {
        let mut channel = channel();
        let (pending, handle) = PendingRequest::new(0, ReadRequest::text("x"));
        channel.enqueue(pending);

        assert_eq!(channel.dispose(), 1);
        assert!(channel.is_disposed());
        assert_eq!(
            handle.await,
            Err(ReadError::Disposed {
                terminal: TerminalIndex::from(0)
            })
        );
    }

    #[test]
    fn test_set_cache_capacity() {
        let mut channel = channel();
        for i in 0..4 {
            channel.append(OutputRecord::text(i.to_string()));
        }
        channel.set_cache_capacity(1);
        assert_eq!(channel.cached_records(), vec![OutputRecord::text("3")]);
        assert_eq!(channel.cache().capacity(), 1);
    }

    #[test]
    fn test_channel_id_display() {
        assert_eq!(ChannelId::new(9).to_string(), "Channel(9)");
    }
}
