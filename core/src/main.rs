//! Instance memory host: headless sidecar for a launcher front end, typed JSON-lines IPC.
//!
//! Reads one envelope per stdin line, answers on stdout, logs to stderr.
//! Commands that touch disk or spawn java run on a small worker pool.

mod config;
mod error;
mod event_loop;
mod ipc;
mod java_args;
mod manager;
mod memory;
mod paths;
mod storage;
mod system;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use crate::config::{ENV_JAVA, IPC_WORKER_POOL_SIZE, MAX_PENDING_IPC};
use crate::event_loop::{ChannelNotifier, UserEvent, push_ipc_and_wake, run_event_loop};
use crate::ipc::{
    IpcContext, IpcEnvelope, IpcResponse, handle_command, is_blocking_command, parse_message,
};
use crate::manager::MemoryOverrideManager;
use crate::paths::{instances_dir, user_data_dir};
use crate::storage::JsonFileStore;
use crate::system::{HostFacts, SystemFacts};

/// Exits the process with code 1 after logging. Use for unrecoverable startup failures.
fn exit_fatal(msg: &str) -> ! {
    log::error!("{}", msg);
    std::process::exit(1);
}

fn respond<F: SystemFacts>(
    ctx: &IpcContext<JsonFileStore, F>,
    envelope: IpcEnvelope,
) -> IpcResponse {
    match handle_command(ctx, &envelope.command) {
        Ok(data) => IpcResponse::ok(envelope.id, data),
        Err(e) => {
            log::debug!("Command {:?} failed: {}", envelope.command, e.message);
            IpcResponse::err(envelope.id, e)
        }
    }
}

fn enqueue(
    tx: &Sender<UserEvent>,
    queue: &Mutex<Vec<String>>,
    pending: &AtomicUsize,
    resp: &IpcResponse,
) {
    match serde_json::to_string(resp) {
        Ok(json) => push_ipc_and_wake(tx, queue, json),
        Err(e) => {
            log::error!("IPC response serialization failed (id={}): {}", resp.id, e);
            pending.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

fn java_executable(root: &std::path::Path) -> PathBuf {
    std::env::var(ENV_JAVA)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| storage::load_settings(root).java.path)
        .unwrap_or_else(|| PathBuf::from("java"))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let root = user_data_dir();
    let (tx, rx) = mpsc::channel::<UserEvent>();
    let pending_ipc = Arc::new(AtomicUsize::new(0));
    let ipc_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let ipc_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(IPC_WORKER_POOL_SIZE)
        .build()
        .unwrap_or_else(|e| exit_fatal(&format!("IPC worker pool: {}", e)));

    let facts = HostFacts::new(java_executable(&root));
    let manager = MemoryOverrideManager::new(
        JsonFileStore::new(instances_dir(&root)),
        facts,
        Arc::new(ChannelNotifier::new(tx.clone(), root.clone())),
    );
    let ctx = IpcContext::new(root.clone(), manager);
    log::info!("Serving profiles under {}", instances_dir(&root).display());

    let reader_tx = tx.clone();
    let reader_pending = Arc::clone(&pending_ipc);
    let reader_queue = Arc::clone(&ipc_queue);
    let reader = std::thread::spawn(move || {
        let ctx = &ctx;
        ipc_pool.in_place_scope(|scope| {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        log::error!("stdin read failed: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(envelope) = parse_message(&line) else {
                    log::warn!("Ignoring invalid IPC message");
                    continue;
                };
                if reader_pending.load(Ordering::Relaxed) >= MAX_PENDING_IPC {
                    log::warn!("IPC backpressure: dropping request (id={})", envelope.id);
                    continue;
                }
                reader_pending.fetch_add(1, Ordering::Relaxed);

                if is_blocking_command(&envelope.command) {
                    let worker_tx = reader_tx.clone();
                    let worker_pending = Arc::clone(&reader_pending);
                    let worker_queue = Arc::clone(&reader_queue);
                    scope.spawn(move |_| {
                        let resp = respond(ctx, envelope);
                        enqueue(&worker_tx, &worker_queue, &worker_pending, &resp);
                    });
                    continue;
                }

                let resp = respond(ctx, envelope);
                enqueue(&reader_tx, &reader_queue, &reader_pending, &resp);
            }
        });
        let _ = reader_tx.send(UserEvent::Quit);
    });
    drop(tx);

    if let Err(e) = run_event_loop(rx, pending_ipc, ipc_queue, std::io::stdout().lock()) {
        exit_fatal(&format!("stdout closed: {}", e));
    }
    if reader.join().is_err() {
        exit_fatal("IPC reader thread panicked");
    }
}
