//! Application-side access to one terminal

use ttymux_protocol::{OutputRecord, ReadRequest, TerminalIndex};

use super::center::SharedCenter;
use super::channel::ChannelId;
use super::pending::{ReadError, ReadHandle};

/// Handle bound to one channel instance of a terminal
///
/// Once the terminal is deleted the handle is stale: writes are dropped and
/// reads fail with [`ReadError::Disposed`], even if a new channel has since
/// been created under the same index.
#[derive(Clone)]
pub struct TtyHandle {
    center: SharedCenter,
    index: TerminalIndex,
    channel: ChannelId,
}

impl TtyHandle {
    /// Bind to a terminal, creating it if needed
    pub fn open(center: SharedCenter, index: TerminalIndex) -> Self {
        let channel = center.lock().get_or_create(index).id();
        Self {
            center,
            index,
            channel,
        }
    }

    pub fn index(&self) -> TerminalIndex {
        self.index
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel
    }

    pub fn is_live(&self) -> bool {
        self.center.lock().is_live(self.index, self.channel)
    }

    /// Write a record; returns `false` if the handle is stale
    pub fn write(&self, record: OutputRecord) -> bool {
        let mut center = self.center.lock();
        if !center.is_live(self.index, self.channel) {
            return false;
        }
        center.write(self.index, record);
        true
    }

    /// Convenience for writing a text record
    pub fn print(&self, text: impl Into<String>) -> bool {
        self.write(OutputRecord::text(text))
    }

    /// Ask the viewer holding this terminal for input
    pub fn read(&self, request: ReadRequest) -> ReadHandle {
        let mut center = self.center.lock();
        if !center.is_live(self.index, self.channel) {
            return ReadHandle::settled(Err(ReadError::Disposed {
                terminal: self.index,
            }));
        }
        center.read(self.index, request)
    }

    /// Cached output, empty for a stale handle
    pub fn cache(&self) -> Vec<OutputRecord> {
        let center = self.center.lock();
        if !center.is_live(self.index, self.channel) {
            return Vec::new();
        }
        center.cached_output(self.index)
    }

    pub fn set_cache_capacity(&self, capacity: usize) -> bool {
        let mut center = self.center.lock();
        if !center.is_live(self.index, self.channel) {
            return false;
        }
        center.set_cache_capacity(self.index, capacity);
        true
    }

    /// Delete the terminal this handle is bound to
    ///
    /// Returns `false` if it was already deleted.
    pub fn delete(&self) -> bool {
        let mut center = self.center.lock();
        if !center.is_live(self.index, self.channel) {
            return false;
        }
        center.delete(self.index)
    }
}

impl std::fmt::Debug for TtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyHandle")
            .field("index", &self.index)
            .field("channel", &self.channel)
            .finish()
    }
}
