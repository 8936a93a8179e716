//! Terminal side of the device flow.
//!
//! The device flow never touches stdin, stderr or the browser directly; it goes
//! through [`Interaction`] so tests can script the user.

use std::io::{BufRead, IsTerminal, Write};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::device_flow::DeviceAuthorizationSession;

/// What the device flow needs from the person at the keyboard.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// True if stdin and stderr are attached to a terminal.
    fn is_interactive(&self) -> bool;

    /// Show the user code and verification URI.
    fn show_device_code(&self, session: &DeviceAuthorizationSession);

    /// Resolve once Enter is pressed. `false` if input closed without a keypress.
    ///
    /// Dropping the future must release the caller; the flow drops it as soon
    /// as polling finishes.
    async fn wait_for_enter(&self) -> bool;

    /// Open `url` in the user's browser.
    fn open_browser(&self, url: &str);
}

/// Real terminal: prompt on stderr, Enter on stdin, browser via `open`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalInteraction;

#[async_trait]
impl Interaction for TerminalInteraction {
    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }

    fn show_device_code(&self, session: &DeviceAuthorizationSession) {
        let mut stderr = std::io::stderr().lock();
        // Best effort: a closed stderr must not abort the sign-in.
        let _ = writeln!(
            stderr,
            "\nAuthorize glean-mcp by visiting {}\nand entering the code: {}\n\nPress Enter to open the browser.",
            session.verification_uri, session.user_code
        );
        let _ = stderr.flush();
    }

    async fn wait_for_enter(&self) -> bool {
        let (tx, rx) = tokio::sync::oneshot::channel();

        // A blocking read cannot be aborted, so it runs on a detached thread.
        // When the flow finishes first the receiver is dropped and the thread
        // is left parked on stdin without holding the process open.
        let spawned = std::thread::Builder::new()
            .name("glean-auth-stdin".into())
            .spawn(move || {
                let mut line = String::new();
                let pressed = matches!(std::io::stdin().lock().read_line(&mut line), Ok(n) if n > 0);
                let _ = tx.send(pressed);
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Unable to listen for Enter");
            return false;
        }
        rx.await.unwrap_or(false)
    }

    fn open_browser(&self, url: &str) {
        debug!(%url, "Opening browser");
        if let Err(e) = open::that(url) {
            warn!(error = %e, %url, "Unable to open a browser; visit the URL manually");
        }
    }
}
