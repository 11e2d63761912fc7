//! The current process's stdio as its link to the parent.
//!
//! Available only when the parent spawned this process with
//! [`PROCESS_CHANNEL_ENV`] set and a tokio runtime is running. While the
//! link is active, stdout carries IPC lines and must not be used for other
//! output.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::sync::{Arc, OnceLock};

use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::channel::Subscription;
use crate::channel::listeners::ListenerSet;
use crate::error::{Error, Result};

use super::{IpcHandler, PROCESS_CHANNEL_ENV, ParentLink};

// ============================================================================
// Constants
// ============================================================================

/// The process-wide link, created on first successful detection.
static STDIO_PARENT: OnceLock<Arc<StdioParent>> = OnceLock::new();

// ============================================================================
// StdioParent
// ============================================================================

/// Line-delimited JSON link to the parent over stdin/stdout.
pub struct StdioParent {
    /// Queue drained by the stdout writer task.
    outgoing: mpsc::UnboundedSender<String>,
    /// Listeners for messages from the parent.
    messages: Arc<ListenerSet<Value>>,
}

impl StdioParent {
    /// Returns the link if this process was spawned with one.
    ///
    /// Returns `None` when [`PROCESS_CHANNEL_ENV`] is unset or no tokio
    /// runtime is available.
    #[must_use]
    pub fn detect() -> Option<Arc<Self>> {
        if let Some(existing) = STDIO_PARENT.get() {
            return Some(Arc::clone(existing));
        }

        if env::var_os(PROCESS_CHANNEL_ENV).is_none() {
            trace!(var = PROCESS_CHANNEL_ENV, "No parent IPC link");
            return None;
        }

        let Ok(handle) = Handle::try_current() else {
            debug!("Parent IPC link requires a tokio runtime");
            return None;
        };

        let link = STDIO_PARENT.get_or_init(|| Self::start(&handle));
        Some(Arc::clone(link))
    }

    /// Spawns the stdin reader and stdout writer tasks.
    fn start(handle: &Handle) -> Arc<Self> {
        let messages = ListenerSet::new();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();

        handle.spawn(Self::run_writer(outgoing_rx));
        handle.spawn(Self::run_reader(Arc::clone(&messages)));

        debug!("Parent IPC link established over stdio");

        Arc::new(Self { outgoing, messages })
    }

    /// Forwards queued lines to stdout.
    async fn run_writer(mut outgoing_rx: mpsc::UnboundedReceiver<String>) {
        let mut stdout = tokio::io::stdout();

        while let Some(line) = outgoing_rx.recv().await {
            let written = match stdout.write_all(line.as_bytes()).await {
                Ok(()) => stdout.flush().await,
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                warn!(error = %e, "Failed to write to parent");
                break;
            }
        }
    }

    /// Parses stdin lines and dispatches them to message listeners.
    async fn run_reader(messages: Arc<ListenerSet<Value>>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match from_str::<Value>(&line) {
                    Ok(value) => {
                        messages.emit(&value);
                    }
                    Err(_) => trace!("Ignoring non-IPC input line"),
                },
                Ok(None) => {
                    debug!("Parent closed stdin");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "Reading from parent failed");
                    break;
                }
            }
        }
    }
}

impl ParentLink for StdioParent {
    fn send(&self, message: &str) -> Result<()> {
        let mut line = to_string(message)?;
        line.push('\n');

        self.outgoing
            .send(line)
            .map_err(|_| Error::channel("stdout link to parent is closed"))
    }

    fn on_message(&self, handler: IpcHandler) -> Subscription {
        self.messages.add(handler)
    }
}

// ============================================================================
// Tests
// ============================================================================
