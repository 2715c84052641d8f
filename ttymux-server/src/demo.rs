//! Echo application used by `ttymux-server --demo`

use tracing::{debug, warn};

use ttymux_protocol::{ReadRequest, ReadResponse};

use crate::tty::{ReadError, TtyHandle};

/// Ask for a line of text and write it back, until the terminal goes away
pub async fn run_echo(tty: TtyHandle) {
    tty.print("ttymux echo demo: enable reading on this terminal to answer");

    loop {
        let request = ReadRequest::Text {
            title: Some("Say something".into()),
            max_len: Some(256),
        };

        match tty.read(request).await {
            Ok(ReadResponse::Text(line)) => {
                tty.print(format!("you said: {}", line));
            }
            Ok(other) => {
                tty.print(format!("expected text, got {:?}", other));
            }
            Err(ReadError::Rejected(reason)) => {
                tty.print(format!("rejected: {}", reason));
            }
            Err(ReadError::Disposed { terminal }) => {
                debug!("Echo demo stopping, {} deleted", terminal);
                return;
            }
            Err(e) => {
                warn!("Echo demo stopping: {}", e);
                return;
            }
        }
    }
}
