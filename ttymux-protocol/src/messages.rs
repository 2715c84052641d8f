//! Viewer-server message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

/// Messages sent from a viewer to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Initial connection handshake
    Connect { client_id: Uuid, protocol_version: u32 },

    /// Ping for keepalive
    Ping,

    /// Replay a terminal's cached output
    GetCachedOutput { terminal: i64 },

    /// Claim (`true`) or release (`false`) read authority for a terminal
    SetReadEnabled { terminal: i64, enabled: bool },

    /// Answer an outstanding read request
    ResolveReadRequest {
        terminal: i64,
        request_id: RequestId,
        value: ReadResponse,
    },

    /// Refuse an outstanding read request
    RejectReadRequest {
        terminal: i64,
        request_id: RequestId,
        reason: String,
    },

    /// Request a summary of every terminal
    ListTerminals,
}

/// Messages sent from the server to a viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Handshake accepted
    Connected {
        server_version: String,
        protocol_version: u32,
    },

    /// Pong response to ping
    Pong,

    /// Output written to a terminal (sent to every viewer)
    WriteTty {
        terminal: TerminalIndex,
        record: OutputRecord,
    },

    /// Input request for the viewer holding read authority
    SendReadRequest {
        terminal: TerminalIndex,
        request_id: RequestId,
        request: ReadRequest,
    },

    /// Retract any prompt still shown for this request id
    CancelReadRequest {
        terminal: TerminalIndex,
        request_id: RequestId,
    },

    /// This viewer no longer holds read authority for the terminal
    ReadAuthorityRevoked { terminal: TerminalIndex },

    /// Reply to `GetCachedOutput`, oldest record first
    CachedOutput {
        terminal: TerminalIndex,
        records: Vec<OutputRecord>,
    },

    /// Reply to `SetReadEnabled`
    ReadEnabled {
        terminal: TerminalIndex,
        enabled: bool,
        ok: bool,
    },

    /// Reply to `ResolveReadRequest` / `RejectReadRequest`
    ReadSettled {
        terminal: TerminalIndex,
        request_id: RequestId,
        ok: bool,
    },

    /// Reply to `ListTerminals`
    TerminalList { terminals: Vec<TerminalInfo> },

    /// Error response
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Terminal this message concerns, if any
    pub fn terminal(&self) -> Option<TerminalIndex> {
        match self {
            Self::WriteTty { terminal, .. }
            | Self::SendReadRequest { terminal, .. }
            | Self::CancelReadRequest { terminal, .. }
            | Self::ReadAuthorityRevoked { terminal }
            | Self::CachedOutput { terminal, .. }
            | Self::ReadEnabled { terminal, .. }
            | Self::ReadSettled { terminal, .. } => Some(*terminal),
            Self::Connected { .. } | Self::Pong | Self::TerminalList { .. } | Self::Error { .. } => {
                None
            }
        }
    }
}

/// Diagnostic summary of one terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub terminal: TerminalIndex,
    /// Records currently held in the output cache
    pub cached_records: u32,
    /// Requests waiting for a viewer to claim the terminal
    pub unsent_requests: u32,
    /// Requests forwarded to the active viewer and not yet answered
    pub outstanding_requests: u32,
    /// Connection id of the viewer holding read authority
    pub reader: Option<u64>,
    /// Age of the oldest unanswered request in milliseconds
    pub oldest_pending_ms: Option<u64>,
}

/// Error codes for protocol errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    ProtocolMismatch,
    InvalidTerminal,
}
