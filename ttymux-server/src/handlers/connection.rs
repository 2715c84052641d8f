//! Connection-related message handlers
//!
//! Handles: Connect, Ping

use tracing::{debug, info};
use uuid::Uuid;

use ttymux_protocol::{ErrorCode, ServerMessage, PROTOCOL_VERSION};

use super::HandlerContext;

impl HandlerContext {
    /// Handle Connect message - validate protocol version
    pub fn handle_connect(&self, client_uuid: Uuid, protocol_version: u32) -> ServerMessage {
        info!(
            "{} (UUID: {}) connecting with protocol version {}",
            self.viewer_id, client_uuid, protocol_version
        );

        if protocol_version != PROTOCOL_VERSION {
            return HandlerContext::error(
                ErrorCode::ProtocolMismatch,
                format!(
                    "Protocol version mismatch: client={}, server={}",
                    protocol_version, PROTOCOL_VERSION
                ),
            );
        }

        self.registry.set_client_uuid(self.viewer_id, client_uuid);

        ServerMessage::Connected {
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Handle Ping message - simple heartbeat response
    pub fn handle_ping(&self) -> ServerMessage {
        debug!("Received Ping from {}, sending Pong", self.viewer_id);
        ServerMessage::Pong
    }
}
