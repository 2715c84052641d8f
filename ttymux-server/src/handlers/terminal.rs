//! Terminal message handlers
//!
//! Handles: GetCachedOutput, SetReadEnabled, ResolveReadRequest,
//! RejectReadRequest, ListTerminals

use tracing::{debug, info};

use ttymux_protocol::{ReadResponse, RequestId, ServerMessage};

use super::HandlerContext;
use crate::tty::TtyCenter;

impl HandlerContext {
    /// Handle GetCachedOutput - replay a terminal's history to this viewer
    pub fn handle_get_cached_output(&self, center: &TtyCenter, terminal: i64) -> ServerMessage {
        let terminal = match Self::terminal(terminal) {
            Ok(terminal) => terminal,
            Err(error) => return error,
        };

        let records = center.cached_output(terminal);
        debug!(
            "{} requested {} cached records of {}",
            self.viewer_id,
            records.len(),
            terminal
        );

        ServerMessage::CachedOutput { terminal, records }
    }

    /// Handle SetReadEnabled - claim or give up read authority
    ///
    /// Enabling always succeeds and supersedes any other viewer. Disabling
    /// reports `ok: false` when this viewer did not hold the terminal.
    pub fn handle_set_read_enabled(
        &self,
        center: &mut TtyCenter,
        terminal: i64,
        enabled: bool,
    ) -> ServerMessage {
        let terminal = match Self::terminal(terminal) {
            Ok(terminal) => terminal,
            Err(error) => return error,
        };

        let ok = if enabled {
            // Revocation reaches the viewer as ReadAuthorityRevoked, so the
            // claim future itself is not needed here
            let claim = center.set_reader(terminal, self.viewer_id);
            info!(
                "{} holds read authority for {} ({})",
                self.viewer_id,
                terminal,
                claim.resolver_id()
            );
            true
        } else {
            let released = center.release_reader(terminal, self.viewer_id);
            info!(
                "{} released read authority for {}: {}",
                self.viewer_id, terminal, released
            );
            released
        };

        ServerMessage::ReadEnabled {
            terminal,
            enabled,
            ok,
        }
    }

    /// Handle ResolveReadRequest - answer a pending read
    pub fn handle_resolve(
        &self,
        center: &mut TtyCenter,
        terminal: i64,
        request_id: RequestId,
        value: ReadResponse,
    ) -> ServerMessage {
        let terminal = match Self::terminal(terminal) {
            Ok(terminal) => terminal,
            Err(error) => return error,
        };

        let ok = center.resolve(terminal, self.viewer_id, request_id, value);
        debug!(
            "{} resolved request {} on {}: {}",
            self.viewer_id, request_id, terminal, ok
        );

        ServerMessage::ReadSettled {
            terminal,
            request_id,
            ok,
        }
    }

    /// Handle RejectReadRequest - refuse a pending read
    pub fn handle_reject(
        &self,
        center: &mut TtyCenter,
        terminal: i64,
        request_id: RequestId,
        reason: String,
    ) -> ServerMessage {
        let terminal = match Self::terminal(terminal) {
            Ok(terminal) => terminal,
            Err(error) => return error,
        };

        let ok = center.reject(terminal, self.viewer_id, request_id, reason);
        debug!(
            "{} rejected request {} on {}: {}",
            self.viewer_id, request_id, terminal, ok
        );

        ServerMessage::ReadSettled {
            terminal,
            request_id,
            ok,
        }
    }

    /// Handle ListTerminals - summary of every terminal
    pub fn handle_list_terminals(&self, center: &TtyCenter) -> ServerMessage {
        ServerMessage::TerminalList {
            terminals: center.terminal_info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    use ttymux_protocol::{ClientMessage, ErrorCode, OutputRecord, ReadRequest, TerminalIndex};

    use crate::config::TtyConfig;
    use crate::registry::ViewerRegistry;
    use crate::tty::ReadError;

    struct Viewer {
        ctx: HandlerContext,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl Viewer {
        /// Route a message and return the reply it produces
        fn send(&self, msg: ClientMessage) -> ServerMessage {
            let mut center = self.ctx.center.lock();
            self.ctx.route_message(&mut center, msg)
        }

        fn set_read_enabled(&self, terminal: i64, enabled: bool) -> ServerMessage {
            self.send(ClientMessage::SetReadEnabled { terminal, enabled })
        }

        fn resolve(&self, terminal: i64, request_id: RequestId, value: ReadResponse) -> ServerMessage {
            self.send(ClientMessage::ResolveReadRequest {
                terminal,
                request_id,
                value,
            })
        }
    }

    fn connect(ctx: &HandlerContext) -> Viewer {
        let (tx, rx) = mpsc::channel(32);
        let viewer_id = ctx.registry.register_viewer(tx);
        Viewer {
            ctx: HandlerContext::new(ctx.center.clone(), Arc::clone(&ctx.registry), viewer_id),
            rx,
        }
    }

    fn create_test_context() -> Viewer {
        let registry = Arc::new(ViewerRegistry::new());
        let center = TtyCenter::new(Arc::clone(&registry), TtyConfig::default()).into_shared();
        let (tx, rx) = mpsc::channel(32);
        let viewer_id = registry.register_viewer(tx);
        Viewer {
            ctx: HandlerContext::new(center, registry, viewer_id),
            rx,
        }
    }

    #[test]
    fn test_get_cached_output() {
        let viewer = create_test_context();
        viewer
            .ctx
            .center
            .lock()
            .write(TerminalIndex::from(0), OutputRecord::text("hello"));

        assert_eq!(
            viewer.send(ClientMessage::GetCachedOutput { terminal: 0 }),
            ServerMessage::CachedOutput {
                terminal: TerminalIndex::from(0),
                records: vec![OutputRecord::text("hello")],
            }
        );
    }

    #[test]
    fn test_invalid_terminal_index() {
        let viewer = create_test_context();
        for msg in [
            ClientMessage::GetCachedOutput { terminal: -3 },
            ClientMessage::SetReadEnabled {
                terminal: -1,
                enabled: true,
            },
            ClientMessage::ResolveReadRequest {
                terminal: -1,
                request_id: 0,
                value: ReadResponse::Confirm(true),
            },
            ClientMessage::RejectReadRequest {
                terminal: i64::MAX,
                request_id: 0,
                reason: "no".into(),
            },
        ] {
            match viewer.send(msg) {
                ServerMessage::Error {
                    code: ErrorCode::InvalidTerminal,
                    ..
                } => {}
                other => panic!("Expected InvalidTerminal, got {:?}", other),
            }
        }
        assert!(viewer.ctx.center.lock().terminal_info().is_empty());
    }

    #[test]
    fn test_set_read_enabled_flushes_queued_reads() {
        let mut viewer = create_test_context();
        let _read = viewer
            .ctx
            .center
            .lock()
            .read(TerminalIndex::from(0), ReadRequest::confirm("go?"));

        assert_eq!(
            viewer.set_read_enabled(0, true),
            ServerMessage::ReadEnabled {
                terminal: TerminalIndex::from(0),
                enabled: true,
                ok: true,
            }
        );
        assert!(matches!(
            viewer.rx.try_recv(),
            Ok(ServerMessage::SendReadRequest { request_id: 0, .. })
        ));
    }

    #[test]
    fn test_disable_without_claim_is_not_ok() {
        let viewer = create_test_context();
        assert_eq!(
            viewer.set_read_enabled(0, false),
            ServerMessage::ReadEnabled {
                terminal: TerminalIndex::from(0),
                enabled: false,
                ok: false,
            }
        );
    }

    #[test]
    fn test_disable_after_claim() {
        let viewer = create_test_context();
        viewer.set_read_enabled(0, true);
        assert!(matches!(
            viewer.set_read_enabled(0, false),
            ServerMessage::ReadEnabled { ok: true, .. }
        ));
        assert_eq!(viewer.ctx.center.lock().reader(TerminalIndex::from(0)), None);
    }

    #[tokio::test]
    async fn test_resolve_and_reject() {
        let viewer = create_test_context();
        viewer.set_read_enabled(0, true);
        let (first, second) = {
            let mut center = viewer.ctx.center.lock();
            (
                center.read(TerminalIndex::from(0), ReadRequest::text("name")),
                center.read(TerminalIndex::from(0), ReadRequest::text("age")),
            )
        };

        assert!(matches!(
            viewer.resolve(0, 0, ReadResponse::Text("ann".into())),
            ServerMessage::ReadSettled { ok: true, .. }
        ));
        assert!(matches!(
            viewer.resolve(0, 0, ReadResponse::Text("again".into())),
            ServerMessage::ReadSettled { ok: false, .. }
        ));
        assert!(matches!(
            viewer.send(ClientMessage::RejectReadRequest {
                terminal: 0,
                request_id: 1,
                reason: "skip".into(),
            }),
            ServerMessage::ReadSettled { ok: true, request_id: 1, .. }
        ));

        assert_eq!(first.await, Ok(ReadResponse::Text("ann".into())));
        assert_eq!(second.await, Err(ReadError::Rejected("skip".into())));
    }

    #[test]
    fn test_resolve_from_other_viewer() {
        let owner = create_test_context();
        let mut other = connect(&owner.ctx);
        owner.set_read_enabled(0, true);
        let _read = owner
            .ctx
            .center
            .lock()
            .read(TerminalIndex::from(0), ReadRequest::confirm("?"));

        assert!(matches!(
            other.resolve(0, 0, ReadResponse::Confirm(true)),
            ServerMessage::ReadSettled { ok: false, .. }
        ));

        assert!(matches!(
            owner.resolve(0, 0, ReadResponse::Confirm(true)),
            ServerMessage::ReadSettled { ok: true, .. }
        ));
        assert_eq!(
            other.rx.try_recv().ok(),
            Some(ServerMessage::CancelReadRequest {
                terminal: TerminalIndex::from(0),
                request_id: 0,
            })
        );
    }

    #[test]
    fn test_list_terminals() {
        let viewer = create_test_context();
        viewer.set_read_enabled(4, true);

        match viewer.send(ClientMessage::ListTerminals) {
            ServerMessage::TerminalList { terminals } => {
                assert_eq!(terminals.len(), 1);
                assert_eq!(terminals[0].terminal, TerminalIndex::from(4));
                assert_eq!(terminals[0].reader, Some(viewer.ctx.viewer_id.value()));
            }
            other => panic!("Expected TerminalList, got {:?}", other),
        }
    }
}
