//! Event loop and user events.
//!
//! Owns `UserEvent`, `run_event_loop`, and the notifier that turns override
//! changes into pushed `argumentsChanged` events.
//! IPC responses are batched: producers push to a queue and send `IpcFlush`;
//! the loop drains the queue and writes the whole batch with one flush.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::java_args::JavaArguments;
use crate::manager::ArgumentsNotifier;
use crate::storage;

/// Events sent from the reader, workers, and the manager into the loop.
#[derive(Debug)]
pub enum UserEvent {
    /// Wake to drain the IPC response queue and write a batch.
    IpcFlush,
    /// A profile's override changed; dependent views should refresh.
    ArgumentsChanged(ArgumentsChanged),
    /// Input closed and in-flight work finished.
    Quit,
}

/// Pushed event payload, written as one JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentsChanged {
    pub event: &'static str,
    pub id: String,
    pub profile_id: String,
    pub override_memory: Option<u32>,
    pub args: Vec<String>,
}

/// Forwards manager notifications into the event loop with freshly derived arguments.
pub struct ChannelNotifier {
    tx: Sender<UserEvent>,
    root: PathBuf,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new(tx: Sender<UserEvent>, root: PathBuf) -> Self {
        Self { tx, root }
    }
}

impl ArgumentsNotifier for ChannelNotifier {
    fn arguments_changed(&self, profile_id: &str, override_memory: Option<u32>) {
        let java = storage::load_settings(&self.root).java;
        let memory = override_memory.unwrap_or(java.memory);
        let event = ArgumentsChanged {
            event: "argumentsChanged",
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            override_memory,
            args: JavaArguments::build(memory, &java.args).as_slice().to_vec(),
        };
        if self.tx.send(UserEvent::ArgumentsChanged(event)).is_err() {
            log::warn!("Event loop gone; dropping argumentsChanged for '{}'", profile_id);
        }
    }
}

/// Pushes one IPC response JSON to the queue and sends `IpcFlush` only when this is the first item
/// (so the loop is woken once per batch). Recovers from mutex poison.
pub fn push_ipc_and_wake(tx: &Sender<UserEvent>, queue: &Mutex<Vec<String>>, json: String) {
    let was_first = {
        let mut q = queue.lock().unwrap_or_else(|e| {
            log::error!("IPC queue mutex was poisoned, recovering");
            e.into_inner()
        });
        q.push(json);
        q.len() == 1
    };
    if was_first {
        let _ = tx.send(UserEvent::IpcFlush);
    }
}

/// Drains the IPC queue and writes one line per response. Returns true if any were written.
fn drain_ipc_queue_and_deliver<W: Write>(
    queue: &Mutex<Vec<String>>,
    pending_ipc: &AtomicUsize,
    out: &mut W,
) -> std::io::Result<bool> {
    let batch: Vec<String> = {
        let mut q = queue.lock().unwrap_or_else(|e| {
            log::error!("IPC queue mutex was poisoned, recovering");
            e.into_inner()
        });
        std::mem::take(&mut *q)
    };
    let n = batch.len();
    if n == 0 {
        return Ok(false);
    }
    let to_sub = n.min(pending_ipc.load(Ordering::Relaxed));
    pending_ipc.fetch_sub(to_sub, Ordering::Relaxed);

    for response_json in batch {
        writeln!(out, "{}", response_json)?;
    }
    out.flush()?;
    Ok(true)
}

fn write_event<W: Write>(out: &mut W, event: &ArgumentsChanged) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()
}

/// Runs until `Quit` or until every sender is gone. Output errors end the loop.
pub fn run_event_loop<W: Write>(
    events: Receiver<UserEvent>,
    pending_ipc: Arc<AtomicUsize>,
    ipc_queue: Arc<Mutex<Vec<String>>>,
    mut out: W,
) -> std::io::Result<()> {
    for ev in events {
        match ev {
            UserEvent::IpcFlush => {
                drain_ipc_queue_and_deliver(&ipc_queue, &pending_ipc, &mut out)?;
            }
            UserEvent::ArgumentsChanged(event) => write_event(&mut out, &event)?,
            UserEvent::Quit => break,
        }
    }
    drain_ipc_queue_and_deliver(&ipc_queue, &pending_ipc, &mut out)?;
    Ok(())
}
