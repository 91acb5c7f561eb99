//! Single-consumer execution queue
//!
//! Units of work run on one named worker thread in submission order. A
//! closed executor refuses new work with `REPLAY_EXECUTOR_CLOSED`. A task
//! that panics is logged and dropped; the worker moves on to the next one.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use super::errors::{ReplayError, ReplayResult};
use crate::observability::{log_event_with_fields, Event};

/// A zero-argument unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Accepts units of work and runs them FIFO on a single consumer
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task) -> ReplayResult<()>;
}

enum Command {
    Run(Task),
    Sync(Sender<()>),
    Shutdown,
}

/// Executor backed by one dedicated worker thread
pub struct SingleThreadExecutor {
    name: String,
    command_tx: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SingleThreadExecutor {
    /// Spawn the worker thread
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (command_tx, command_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(command_rx))?;

        Ok(Self {
            name,
            command_tx: Mutex::new(Some(command_tx)),
            worker: Mutex::new(Some(join)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, command: Command) -> ReplayResult<()> {
        let guard = self
            .command_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.send(command).map_err(|_| ReplayError::executor_closed()),
            None => Err(ReplayError::executor_closed()),
        }
    }

    /// Block until every unit submitted before this call has run
    pub fn sync(&self) -> ReplayResult<()> {
        let (tx, rx) = mpsc::channel();
        self.send(Command::Sync(tx))?;
        rx.recv().map_err(|_| ReplayError::executor_closed())
    }

    /// Run queued work, then stop the worker. Later submissions are refused.
    pub fn shutdown(&self) {
        let sender = self
            .command_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(Command::Shutdown);
        }
        let join = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = join {
            let _ = handle.join();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl Executor for SingleThreadExecutor {
    fn execute(&self, task: Task) -> ReplayResult<()> {
        self.send(Command::Run(task))
    }
}

impl Drop for SingleThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(command_rx: Receiver<Command>) {
    while let Ok(command) = command_rx.recv() {
        match command {
            Command::Run(task) => run_task(task),
            Command::Sync(done) => {
                let _ = done.send(());
            }
            Command::Shutdown => break,
        }
    }
}

fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let reason = panic_message(payload.as_ref());
        let worker = thread::current().name().unwrap_or("unnamed").to_string();
        log_event_with_fields(
            Event::ReplayExecutorTaskPanic,
            &[("worker", worker.as_str()), ("reason", reason.as_str())],
        );
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
