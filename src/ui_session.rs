use crate::readiness::ReadinessGate;
use anyhow::Result;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Lifecycle of the progress surface, owned by the session thread.
/// `Ready` is reachable exactly once per session; no transition skips a
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    NotStarted,
    Starting,
    Ready,
    Closing,
    Closed,
}

/// Message marshalled onto the session thread's own queue. The surface is
/// never touched from another context; other contexts only post requests.
#[derive(Debug, Clone, Copy)]
pub enum UiRequest {
    Close,
}

/// Clone-able handle for posting requests to a running session. A real
/// surface wires its close button to this so user-initiated close goes
/// through the same queue as orchestrator teardown.
#[derive(Clone)]
pub struct SessionHandle {
    requests: Sender<UiRequest>,
}

impl SessionHandle {
    /// Posts a close request. Tolerated after the pump has already exited;
    /// double close is a no-op.
    pub fn request_close(&self) {
        let _ = self.requests.send(UiRequest::Close);
    }
}

/// Progress surface hosted by the session thread. Implementations belong
/// to that thread exclusively once the factory has produced them.
pub trait ProgressSurface {
    fn show(&mut self) -> Result<()>;
    fn close(&mut self);
}

/// Owns one dedicated thread per load operation, running a cooperative
/// message pump that hosts a [`ProgressSurface`]. Construction failures
/// inside the thread are logged there and never reach the caller; the
/// readiness gate is signaled only on successful bring-up.
pub struct UiThreadSession {
    handle: SessionHandle,
    join: Option<JoinHandle<()>>,
    state: Arc<Mutex<ProgressState>>,
}

impl UiThreadSession {
    /// Spawns the session thread. Inside it: construct the surface, show
    /// it, signal `gate`, then pump requests until a close arrives. The
    /// factory receives a [`SessionHandle`] so the surface can post its
    /// own close. After this returns the thread is either pumping or has
    /// already exited after a local failure, never mid-construction for
    /// an observer that waited on the gate.
    pub fn start<S, F>(gate: ReadinessGate, make_surface: F) -> Self
    where
        S: ProgressSurface + 'static,
        F: FnOnce(SessionHandle) -> Result<S> + Send + 'static,
    {
        let (tx, rx) = channel();
        let handle = SessionHandle { requests: tx };
        let state = Arc::new(Mutex::new(ProgressState::NotStarted));
        let thread_state = Arc::clone(&state);
        let thread_handle = handle.clone();
        let join = thread::spawn(move || {
            run_pump(gate, make_surface, thread_handle, rx, thread_state);
        });
        Self { handle, join: Some(join), state }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn request_close(&self) {
        self.handle.request_close();
    }

    pub fn state(&self) -> ProgressState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Requests close and blocks until the session thread has exited.
    /// Failures here are teardown-path failures: logged, never returned.
    pub fn close_and_join(&mut self) {
        self.handle.request_close();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                eprintln!("[ui] session thread panicked during teardown");
            }
        }
    }
}

impl Drop for UiThreadSession {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn set_state(state: &Mutex<ProgressState>, next: ProgressState) {
    let mut guard = match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = next;
}

fn run_pump<S, F>(
    gate: ReadinessGate,
    make_surface: F,
    handle: SessionHandle,
    rx: Receiver<UiRequest>,
    state: Arc<Mutex<ProgressState>>,
) where
    S: ProgressSurface,
    F: FnOnce(SessionHandle) -> Result<S>,
{
    set_state(&state, ProgressState::Starting);
    let mut surface = match make_surface(handle) {
        Ok(surface) => surface,
        Err(err) => {
            // Local failure stays local: log, skip Ready, exit the thread.
            eprintln!("[ui] progress surface construction failed: {err:#}");
            set_state(&state, ProgressState::Closing);
            set_state(&state, ProgressState::Closed);
            return;
        }
    };
    if let Err(err) = surface.show() {
        eprintln!("[ui] progress surface failed to show: {err:#}");
        set_state(&state, ProgressState::Closing);
        surface.close();
        set_state(&state, ProgressState::Closed);
        return;
    }
    set_state(&state, ProgressState::Ready);
    gate.signal();
    // Cooperative pump: blocks on the queue, exits on the first close
    // request or when every sender is gone.
    loop {
        match rx.recv() {
            Ok(UiRequest::Close) | Err(_) => break,
        }
    }
    set_state(&state, ProgressState::Closing);
    surface.close();
    set_state(&state, ProgressState::Closed);
}

/// Console progress surface for hosts without a windowing system.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    label: String,
}

impl ConsoleProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressSurface for ConsoleProgress {
    fn show(&mut self) -> Result<()> {
        eprintln!("[ui] {} ...", self.label);
        Ok(())
    }

    fn close(&mut self) {
        eprintln!("[ui] {} done", self.label);
    }
}
