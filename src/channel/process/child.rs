//! Child process spawned through tokio.
//!
//! Messages travel over the child's stdio, one per line, each line holding
//! a JSON value. The relay only ever writes JSON strings; any other line
//! the child prints is parsed, found not to be a string, and ignored.
//!
//! # Lifecycle
//!
//! ```text
//! spawn ──► reader task (stdout lines → message listeners)
//!       ──► writer task (send queue → stdin)
//!       ──► supervisor  (wait / kill → `Exit`, I/O failure → `Error`)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::channel::Subscription;
use crate::channel::listeners::ListenerSet;
use crate::error::{Error, Result};

use super::{IpcHandler, LifecycleHandler, PROCESS_CHANNEL_ENV, PeerProcess, ProcessEvent};

// ============================================================================
// ChildProcess
// ============================================================================

/// A spawned child process with a line-delimited JSON IPC link.
///
/// Dropping the handle kills the child.
pub struct ChildProcess {
    /// Process ID for logging.
    pid: u32,
    /// Queue drained by the writer task.
    outgoing: mpsc::UnboundedSender<String>,
    /// Kill signal for the supervisor.
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    /// Listeners for messages from the child.
    messages: Arc<ListenerSet<Value>>,
    /// Listeners for lifecycle events.
    lifecycle: Arc<ListenerSet<ProcessEvent>>,
    /// Set once the child has exited.
    exited: Arc<AtomicBool>,
}

impl ChildProcess {
    /// Spawns `command` with piped stdio and the IPC marker set.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the process cannot be started.
    pub fn spawn(mut command: Command) -> Result<Arc<Self>> {
        command
            .env(PROCESS_CHANNEL_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let pid = child.id().unwrap_or(0);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::channel("child stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::channel("child stdout was not captured"))?;

        let messages = ListenerSet::new();
        let lifecycle = ListenerSet::new();
        let exited = Arc::new(AtomicBool::new(false));
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(Self::run_writer(
            pid,
            stdin,
            outgoing_rx,
            Arc::clone(&lifecycle),
        ));
        let reader = tokio::spawn(Self::run_reader(pid, stdout, Arc::clone(&messages)));
        tokio::spawn(Self::run_supervisor(
            pid,
            child,
            reader,
            kill_rx,
            Arc::clone(&lifecycle),
            Arc::clone(&exited),
        ));

        info!(pid, "Child process spawned");

        Ok(Arc::new(Self {
            pid,
            outgoing,
            kill_tx: Mutex::new(Some(kill_tx)),
            messages,
            lifecycle,
            exited,
        }))
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns `true` once the child has exited.
    #[inline]
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Asks the supervisor to kill the child. `exit` is reported afterwards.
    pub fn kill(&self) {
        if let Some(tx) = self.kill_tx.lock().take() {
            debug!(pid = self.pid, "Killing child process");
            let _ = tx.send(());
        }
    }

    /// Forwards queued lines to the child's stdin.
    async fn run_writer(
        pid: u32,
        mut stdin: ChildStdin,
        mut outgoing_rx: mpsc::UnboundedReceiver<String>,
        lifecycle: Arc<ListenerSet<ProcessEvent>>,
    ) {
        while let Some(line) = outgoing_rx.recv().await {
            let written = match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                warn!(pid, error = %e, "Failed to write to child stdin");
                lifecycle.emit(&ProcessEvent::Error(e.to_string()));
                break;
            }
        }

        trace!(pid, "Writer task terminated");
    }

    /// Parses stdout lines and dispatches them to message listeners.
    async fn run_reader(pid: u32, stdout: ChildStdout, messages: Arc<ListenerSet<Value>>) {
        let mut lines = BufReader::new(stdout).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match from_str::<Value>(&line) {
                    Ok(value) => {
                        messages.emit(&value);
                    }
                    Err(_) => trace!(pid, "Ignoring non-IPC output line"),
                },
                Ok(None) => break,
                Err(e) => {
                    debug!(pid, error = %e, "Child stdout read failed");
                    break;
                }
            }
        }

        trace!(pid, "Reader task terminated");
    }

    /// Waits for exit (or kills on request) and reports it.
    async fn run_supervisor(
        pid: u32,
        mut child: Child,
        reader: JoinHandle<()>,
        kill_rx: oneshot::Receiver<()>,
        lifecycle: Arc<ListenerSet<ProcessEvent>>,
        exited: Arc<AtomicBool>,
    ) {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = kill_rx => {
                if let Err(e) = child.kill().await {
                    debug!(pid, error = %e, "Failed to kill child process");
                }
                child.wait().await
            }
        };

        // Drain remaining output before reporting exit.
        let _ = reader.await;
        exited.store(true, Ordering::SeqCst);

        match status {
            Ok(status) => {
                info!(pid, code = ?status.code(), "Child process exited");
                lifecycle.emit(&ProcessEvent::Exit(status.code()));
            }
            Err(e) => {
                warn!(pid, error = %e, "Failed to wait for child process");
                lifecycle.emit(&ProcessEvent::Error(e.to_string()));
            }
        }
    }
}

impl PeerProcess for ChildProcess {
    fn send(&self, message: &str) -> Result<()> {
        if self.has_exited() {
            return Err(Error::channel(format!("child process {} has exited", self.pid)));
        }

        let mut line = to_string(message)?;
        line.push('\n');

        self.outgoing
            .send(line)
            .map_err(|_| Error::channel(format!("child process {} stdin is closed", self.pid)))
    }

    fn on_message(&self, handler: IpcHandler) -> Subscription {
        self.messages.add(handler)
    }

    fn on_lifecycle(&self, handler: LifecycleHandler) -> Subscription {
        self.lifecycle.add(handler)
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

// ============================================================================
// Tests
// ============================================================================
