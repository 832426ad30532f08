use crate::error::ControlError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Single-slot, last-write-wins mailbox.
///
/// A `post` overwrites whatever the worker has not consumed yet. This is not
/// a queue: commands posted faster than the worker applies them are dropped
/// except for the most recent one.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    signal: Condvar,
    pending: AtomicBool,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            signal: Condvar::new(),
            pending: AtomicBool::new(false),
        }
    }

    pub fn post(&self, value: T) {
        let mut slot = self.slot.lock();
        *slot = Some(value);
        self.pending.store(true, Ordering::Release);
        self.signal.notify_one();
    }

    /// Wake a blocked `wait` without posting anything
    pub fn wake(&self) {
        let _slot = self.slot.lock();
        self.signal.notify_all();
    }

    /// Relaxed check used by inner loops between periods/frames
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }

    /// Block until a value is posted or `running` is cleared.
    ///
    /// A posted value wins over a cleared flag, so a final command posted
    /// right before `stop` is still delivered.
    pub fn wait(&self, running: &AtomicBool) -> Option<T> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.take() {
                self.pending.store(false, Ordering::Release);
                return Some(value);
            }
            if !running.load(Ordering::Acquire) {
                return None;
            }
            self.signal.wait(&mut slot);
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between a controller and its worker thread
pub struct WorkerShared<T> {
    pub mailbox: Mailbox<T>,
    running: AtomicBool,
}

impl<T> WorkerShared<T> {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block for the next command; `None` once the controller is stopping
    pub fn next_command(&self) -> Option<T> {
        self.mailbox.wait(&self.running)
    }

    /// Called by the worker itself to leave the Running state.
    /// The thread is reaped by the next `start` or `stop`.
    pub fn halt(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Halt on error before the caller unwinds and drops its hardware, so a
    /// `start` issued during teardown spawns a fresh worker.
    pub fn fatal<R>(&self, result: Result<R, ControlError>) -> Result<R, ControlError> {
        if result.is_err() {
            self.halt();
        }
        result
    }
}

/// Lifecycle of one background worker: `Stopped -> Running -> Stopped`.
///
/// At most one thread exists per `Worker`. `stop` joins it, so once it
/// returns every hardware handle owned by the thread has been dropped.
pub struct Worker<T> {
    name: &'static str,
    shared: Arc<WorkerShared<T>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shared: Arc::new(WorkerShared {
                mailbox: Mailbox::new(),
                running: AtomicBool::new(false),
            }),
            thread: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn post(&self, command: T) {
        self.shared.mailbox.post(command);
    }

    /// Spawn the worker unless one is already running.
    ///
    /// An error returned by `body` is fatal to the worker: it is logged and
    /// the controller drops back to Stopped.
    pub fn start<F>(&self, body: F)
    where
        F: FnOnce(&WorkerShared<T>) -> Result<(), ControlError> + Send + 'static,
    {
        let mut thread = self.thread.lock();
        if self.shared.is_running() {
            tracing::debug!("{} worker already running", self.name);
            return;
        }

        // A worker that halted on its own is still waiting to be joined
        if let Some(stale) = thread.take() {
            self.join(stale);
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(format!("{name}-worker"))
            .spawn(move || {
                tracing::debug!("{} worker started", name);
                if let Err(e) = body(&shared) {
                    shared.halt();
                    tracing::error!("{} worker terminated: {}", name, e);
                    if shared.mailbox.has_pending() {
                        tracing::warn!("{} command left pending until the next start", name);
                    }
                }
                shared.halt();
                tracing::debug!("{} worker exited", name);
            });

        match spawned {
            Ok(handle) => {
                *thread = Some(handle);
                tracing::info!("{} controller running", self.name);
            }
            Err(e) => {
                self.shared.halt();
                tracing::error!("Failed to spawn {} worker: {}", self.name, e);
            }
        }
    }

    /// Clear Running, wake the worker, and wait for it to exit.
    /// Returns whether a thread was joined.
    pub fn stop(&self) -> bool {
        let mut thread = self.thread.lock();
        self.shared.halt();
        self.shared.mailbox.wake();

        match thread.take() {
            Some(handle) => {
                self.join(handle);
                tracing::info!("{} controller stopped", self.name);
                true
            }
            None => false,
        }
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.thread().id() == thread::current().id() {
            tracing::warn!("{} worker cannot join itself", self.name);
            return;
        }
        if handle.join().is_err() {
            tracing::error!("{} worker panicked", self.name);
        }
    }
}
