//! ttymux-protocol: wire definitions shared by viewers and the server
//!
//! Defines the output records and structured read requests a backend exchanges
//! with remote viewers, the message enums carrying them, and the
//! length-prefixed bincode codec used on the socket.

pub mod codec;
pub mod messages;
pub mod types;

pub use codec::{ClientCodec, CodecError, ServerCodec};
pub use messages::{ClientMessage, ErrorCode, ServerMessage, TerminalInfo};
pub use types::{
    FileBlob, InvalidTerminalIndex, JsonValue, OutputRecord, ReadRequest, ReadResponse,
    RequestId, SelectOption, TerminalIndex,
};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
