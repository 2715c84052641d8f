//! Viewer connection registry
//!
//! Tracks connected viewers and their outbound message queues. Terminal output
//! fans out to every registered viewer; read requests go to one viewer by id.
//! Delivery never blocks. A viewer whose queue is full or closed is dropped
//! from the registry; its connection task then winds down and the center takes
//! back whatever that viewer held.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use ttymux_protocol::ServerMessage;

/// Unique viewer (connection) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewerId(u64);

impl ViewerId {
    /// Create a ViewerId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Viewer({})", self.0)
    }
}

/// Entry for a connected viewer
struct ViewerEntry {
    /// Queue drained by the viewer's connection task
    sender: mpsc::Sender<ServerMessage>,
    /// Identity announced in the Connect handshake
    client_uuid: Option<Uuid>,
}

/// Registry tracking all connected viewers
///
/// Thread-safe for concurrent access from multiple connection tasks.
pub struct ViewerRegistry {
    viewers: DashMap<ViewerId, ViewerEntry>,
    next_viewer_id: AtomicU64,
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self {
            viewers: DashMap::new(),
            next_viewer_id: AtomicU64::new(1),
        }
    }

    // ==================== Viewer Management ====================

    /// Register a new viewer connection
    pub fn register_viewer(&self, sender: mpsc::Sender<ServerMessage>) -> ViewerId {
        let id = ViewerId(self.next_viewer_id.fetch_add(1, Ordering::SeqCst));
        self.viewers.insert(
            id,
            ViewerEntry {
                sender,
                client_uuid: None,
            },
        );
        debug!("Registered {}", id);
        id
    }

    /// Unregister a viewer connection
    ///
    /// Returns `true` if the viewer was registered.
    pub fn unregister_viewer(&self, viewer_id: ViewerId) -> bool {
        if self.viewers.remove(&viewer_id).is_some() {
            debug!("Unregistered {}", viewer_id);
            true
        } else {
            false
        }
    }

    /// Record the identity a viewer announced in its handshake
    pub fn set_client_uuid(&self, viewer_id: ViewerId, client_uuid: Uuid) -> bool {
        match self.viewers.get_mut(&viewer_id) {
            Some(mut entry) => {
                entry.client_uuid = Some(client_uuid);
                true
            }
            None => false,
        }
    }

    /// Identity announced by a viewer, if any
    pub fn client_uuid(&self, viewer_id: ViewerId) -> Option<Uuid> {
        self.viewers.get(&viewer_id)?.client_uuid
    }

    pub fn contains(&self, viewer_id: ViewerId) -> bool {
        self.viewers.contains_key(&viewer_id)
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Get all registered viewer IDs
    pub fn get_all_viewers(&self) -> Vec<ViewerId> {
        self.viewers.iter().map(|entry| *entry.key()).collect()
    }

    // ==================== Message Delivery ====================

    /// Queue a message for one viewer
    ///
    /// Returns `false` if the viewer doesn't exist or can no longer be
    /// reached. A viewer whose queue is full or closed is unregistered, since
    /// skipping a message would leave it with a gap.
    pub fn try_send_to_viewer(&self, viewer_id: ViewerId, message: ServerMessage) -> bool {
        // Clone the sender so no map shard lock is held during the send
        let sender = match self.viewers.get(&viewer_id) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("{} channel closed, removing from registry", viewer_id);
                self.unregister_viewer(viewer_id);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("{} fell behind, removing from registry", viewer_id);
                self.unregister_viewer(viewer_id);
                false
            }
        }
    }

    /// Queue a message for every connected viewer
    ///
    /// Returns the number of viewers that accepted the message.
    pub fn broadcast_to_all(&self, message: ServerMessage) -> usize {
        self.broadcast_filtered(None, message)
    }

    /// Queue a message for every connected viewer except one
    pub fn broadcast_to_all_except(&self, except: ViewerId, message: ServerMessage) -> usize {
        self.broadcast_filtered(Some(except), message)
    }

    fn broadcast_filtered(&self, except: Option<ViewerId>, message: ServerMessage) -> usize {
        let viewer_ids: Vec<ViewerId> = self
            .get_all_viewers()
            .into_iter()
            .filter(|id| Some(*id) != except)
            .collect();

        if viewer_ids.is_empty() {
            return 0;
        }

        debug!("Broadcasting to {} viewers", viewer_ids.len());

        viewer_ids
            .into_iter()
            .filter(|id| self.try_send_to_viewer(*id, message.clone()))
            .count()
    }
}

impl std::fmt::Debug for ViewerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerRegistry")
            .field("viewer_count", &self.viewers.len())
            .field("next_viewer_id", &self.next_viewer_id.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_viewer() -> (ViewerRegistry, ViewerId, mpsc::Receiver<ServerMessage>) {
        let registry = ViewerRegistry::new();
        let (tx, rx) = mpsc::channel(10);
        let viewer_id = registry.register_viewer(tx);
        (registry, viewer_id, rx)
    }

    #[test]
    fn test_viewer_id_display() {
        assert_eq!(ViewerId::new(42).to_string(), "Viewer(42)");
        assert_eq!(ViewerId::new(7).value(), 7);
    }

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let registry = ViewerRegistry::new();
        let (tx1, _rx1) = mpsc::channel(10);
        let (tx2, _rx2) = mpsc::channel(10);

        let id1 = registry.register_viewer(tx1);
        let id2 = registry.register_viewer(tx2);

        assert_ne!(id1, id2);
        assert_eq!(registry.viewer_count(), 2);
        assert!(registry.contains(id1));
    }

    #[tokio::test]
    async fn test_unregister_viewer() {
        let (registry, viewer_id, _rx) = setup_viewer();

        assert!(registry.unregister_viewer(viewer_id));
        assert!(!registry.unregister_viewer(viewer_id));
        assert_eq!(registry.viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_client_uuid() {
        let (registry, viewer_id, _rx) = setup_viewer();
        assert_eq!(registry.client_uuid(viewer_id), None);

        let uuid = Uuid::new_v4();
        assert!(registry.set_client_uuid(viewer_id, uuid));
        assert_eq!(registry.client_uuid(viewer_id), Some(uuid));

        assert!(!registry.set_client_uuid(ViewerId::new(999), uuid));
    }

    #[tokio::test]
    async fn test_try_send_to_viewer() {
        let (registry, viewer_id, mut rx) = setup_viewer();

        assert!(registry.try_send_to_viewer(viewer_id, ServerMessage::Pong));
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::Pong);
    }

    #[tokio::test]
    async fn test_try_send_to_nonexistent_viewer() {
        let registry = ViewerRegistry::new();
        assert!(!registry.try_send_to_viewer(ViewerId::new(999), ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_try_send_to_disconnected_viewer() {
        let (registry, viewer_id, rx) = setup_viewer();
        drop(rx);

        assert!(!registry.try_send_to_viewer(viewer_id, ServerMessage::Pong));
        assert!(!registry.contains(viewer_id));
    }

    #[tokio::test]
    async fn test_try_send_channel_full() {
        let registry = ViewerRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let viewer_id = registry.register_viewer(tx);

        assert!(registry.try_send_to_viewer(viewer_id, ServerMessage::Pong));
        assert!(!registry.try_send_to_viewer(viewer_id, ServerMessage::Pong));
        assert!(!registry.contains(viewer_id));

        // Already queued messages still drain, then the queue ends
        assert_eq!(rx.recv().await, Some(ServerMessage::Pong));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_broadcast_to_all() {
        let registry = ViewerRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        registry.register_viewer(tx1);
        registry.register_viewer(tx2);

        assert_eq!(registry.broadcast_to_all(ServerMessage::Pong), 2);
        assert_eq!(rx1.recv().await.unwrap(), ServerMessage::Pong);
        assert_eq!(rx2.recv().await.unwrap(), ServerMessage::Pong);
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_registry() {
        let registry = ViewerRegistry::new();
        assert_eq!(registry.broadcast_to_all(ServerMessage::Pong), 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_all_except() {
        let registry = ViewerRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        let id1 = registry.register_viewer(tx1);
        registry.register_viewer(tx2);

        assert_eq!(registry.broadcast_to_all_except(id1, ServerMessage::Pong), 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.recv().await.unwrap(), ServerMessage::Pong);
    }

    #[tokio::test]
    async fn test_broadcast_skips_disconnected_viewer() {
        let registry = ViewerRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, rx2) = mpsc::channel(10);
        registry.register_viewer(tx1);
        registry.register_viewer(tx2);
        drop(rx2);

        assert_eq!(registry.broadcast_to_all(ServerMessage::Pong), 1);
        assert_eq!(rx1.recv().await.unwrap(), ServerMessage::Pong);
        assert_eq!(registry.viewer_count(), 1);
    }
}
