//! Virtual terminals and read authority
//!
//! - [`TtyCenter`] owns every terminal and decides which viewer answers reads
//! - [`TtyHandle`] is what application code writes to and reads from
//! - [`ReadHandle`] and [`ReadClaim`] are the futures callers await

mod cache;
mod center;
mod channel;
mod handle;
mod id_pool;
mod pending;
mod resolver;

pub use cache::OutputCache;
pub use center::{OutstandingRequest, RequestLocation, SharedCenter, TtyCenter};
pub use channel::{ChannelId, TtyChannel};
pub use handle::TtyHandle;
pub use id_pool::IdPool;
pub use pending::{PendingRequest, ReadError, ReadHandle, ReadOutcome};
pub use resolver::{ReadClaim, ReadResolver, ResolverId, Revoked, RevokeReason};
