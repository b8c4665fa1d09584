//! Debouncing
//!
//! A [`Debouncer`] wraps a function so that a burst of calls results in a
//! single invocation, made once `window` has elapsed without another call.
//!
//! This is a host-side utility: it is independent of the reactive core and
//! is typically used to rate-limit work triggered from watcher callbacks.
//!
//! # Implementation
//!
//! Each debouncer owns a worker task on the current tokio runtime. Calls are
//! sent over a channel; the worker waits for the first call, then restarts a
//! sleep every time another call arrives before the sleep completes.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Call,
    Cancel,
}

/// Rate-limits a function to one call per quiet window.
///
/// Dropping the debouncer cancels any pending invocation.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    commands: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn a debouncer for `func` on the current tokio runtime.
    ///
    /// Fails with [`Error::NoRuntime`](crate::Error::NoRuntime) outside a
    /// runtime.
    pub fn new<F>(window: Duration, func: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let handle = Handle::try_current()?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(window, receiver, func));

        Ok(Self {
            window,
            commands,
            worker,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Request an invocation, restarting the quiet window.
    pub fn call(&self) {
        self.send(Command::Call);
    }

    /// Drop a pending invocation, if any.
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            trace!(?command, "debounce worker has stopped");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker<F>(window: Duration, mut commands: mpsc::UnboundedReceiver<Command>, func: F)
where
    F: Fn(),
{
    while let Some(command) = commands.recv().await {
        if command == Command::Cancel {
            continue;
        }

        // Armed: wait for a quiet window.
        loop {
            tokio::select! {
                next = commands.recv() => match next {
                    Some(Command::Call) => continue,
                    Some(Command::Cancel) => break,
                    None => return,
                },
                _ = tokio::time::sleep(window) => {
                    trace!(?window, "debounce window elapsed");
                    func();
                    break;
                }
            }
        }
    }
}
