//! ttymux server library
//!
//! Virtual terminals that application code writes structured output to and
//! reads structured input from, mirrored to any number of connected viewers.
//! Output fans out to every viewer; each terminal's reads go to the one
//! viewer currently holding its read authority, and move with that authority
//! when another viewer takes it over.
//!
//! ```no_run
//! # async fn demo() -> ttymux_utils::Result<()> {
//! use ttymux_protocol::{ReadRequest, TerminalIndex};
//! use ttymux_server::{config::AppConfig, server::TtyServer};
//!
//! let server = TtyServer::bind(AppConfig::default(), &ttymux_utils::socket_path())?;
//! let tty = server.tty(TerminalIndex::from(0));
//! tokio::spawn(server.run());
//!
//! tty.print("hello");
//! let answer = tty.read(ReadRequest::confirm("Continue?")).await;
//! # let _ = answer;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod demo;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod tty;

pub use registry::{ViewerId, ViewerRegistry};
pub use server::{SharedState, TtyServer};
pub use tty::{ReadClaim, ReadError, ReadHandle, SharedCenter, TtyCenter, TtyHandle};
