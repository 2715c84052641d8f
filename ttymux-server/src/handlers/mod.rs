//! Message handlers for viewer requests
//!
//! Routes incoming `ClientMessage`s to the terminal center and answers with
//! `ServerMessage`s. Replies share the viewer's registry queue with everything
//! the center pushes on its own (output, read requests, cancellations), and
//! are queued before the center lock is released, so a viewer sees them in
//! the order the center state changed.

mod connection;
mod terminal;

use std::sync::Arc;

use ttymux_protocol::{ClientMessage, ErrorCode, ServerMessage, TerminalIndex};

use crate::registry::{ViewerId, ViewerRegistry};
use crate::tty::{SharedCenter, TtyCenter};

/// Context for message handlers
///
/// Provides access to all server state needed to handle viewer requests.
pub struct HandlerContext {
    /// Terminal center shared with the application
    pub center: SharedCenter,
    /// Viewer connection registry
    pub registry: Arc<ViewerRegistry>,
    /// The viewer making this request
    pub viewer_id: ViewerId,
}

impl HandlerContext {
    pub fn new(center: SharedCenter, registry: Arc<ViewerRegistry>, viewer_id: ViewerId) -> Self {
        Self {
            center,
            registry,
            viewer_id,
        }
    }

    /// Handle one viewer message and queue its reply
    ///
    /// Returns `false` once the viewer can no longer be reached.
    pub fn dispatch(&self, msg: ClientMessage) -> bool {
        let mut center = self.center.lock();
        let response = self.route_message(&mut center, msg);
        self.registry.try_send_to_viewer(self.viewer_id, response)
    }

    /// Route a viewer message to the appropriate handler
    pub fn route_message(&self, center: &mut TtyCenter, msg: ClientMessage) -> ServerMessage {
        match msg {
            // Connection handlers
            ClientMessage::Connect {
                client_id,
                protocol_version,
            } => self.handle_connect(client_id, protocol_version),

            ClientMessage::Ping => self.handle_ping(),

            // Terminal handlers
            ClientMessage::GetCachedOutput { terminal } => {
                self.handle_get_cached_output(center, terminal)
            }

            ClientMessage::SetReadEnabled { terminal, enabled } => {
                self.handle_set_read_enabled(center, terminal, enabled)
            }

            ClientMessage::ResolveReadRequest {
                terminal,
                request_id,
                value,
            } => self.handle_resolve(center, terminal, request_id, value),

            ClientMessage::RejectReadRequest {
                terminal,
                request_id,
                reason,
            } => self.handle_reject(center, terminal, request_id, reason),

            ClientMessage::ListTerminals => self.handle_list_terminals(center),
        }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Validate a terminal index sent by a viewer
    fn terminal(raw: i64) -> Result<TerminalIndex, ServerMessage> {
        TerminalIndex::new(raw).map_err(|e| Self::error(ErrorCode::InvalidTerminal, e.to_string()))
    }
}
