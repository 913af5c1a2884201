use crate::host::{DrawingHost, EditorHost};
use crate::readiness::{ReadinessGate, DEFAULT_READY_TIMEOUT};
use crate::ui_session::{ProgressSurface, SessionHandle, UiThreadSession};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Existence check for the load target. Missing is a branch, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Found(PathBuf),
    Missing(PathBuf),
}

pub fn resolve_target(path: &Path) -> TargetResolution {
    if path.is_file() {
        TargetResolution::Found(path.to_path_buf())
    } else {
        TargetResolution::Missing(path.to_path_buf())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The target drawing was opened.
    Loaded(PathBuf),
    /// The target was missing; a sample drawing was created instead and no
    /// UI session was spawned.
    CreatedFallback(PathBuf),
}

/// Drives one load operation: spawn the UI session, wait on the readiness
/// gate, run the blocking open, then tear the session down no matter how
/// the open ended. A missed readiness signal degrades the UX only; it never
/// blocks or fails the load.
pub struct LoadOrchestrator {
    ready_timeout: Duration,
}

impl LoadOrchestrator {
    pub fn new(ready_timeout: Duration) -> Self {
        Self { ready_timeout }
    }

    pub fn load<D, E, S, F>(
        &self,
        drawings: &mut D,
        editor: &E,
        target: &Path,
        make_surface: F,
    ) -> Result<LoadOutcome>
    where
        D: DrawingHost,
        E: EditorHost,
        S: ProgressSurface + 'static,
        F: FnOnce(SessionHandle) -> Result<S> + Send + 'static,
    {
        let target = match resolve_target(target) {
            TargetResolution::Missing(_) => {
                editor.write_message("Drawing not found. Creating a sample drawing...");
                let created = drawings.create_sample()?;
                return Ok(LoadOutcome::CreatedFallback(created));
            }
            TargetResolution::Found(path) => path,
        };

        let gate = ReadinessGate::new();
        let mut session = UiThreadSession::start(gate.clone(), make_surface);
        if !gate.wait(self.ready_timeout) {
            // Degraded outcome: the load proceeds without a confirmed
            // progress surface.
            editor.write_message("Progress window did not open in time.");
            eprintln!("[load] readiness gate timed out after {:?}", self.ready_timeout);
        }

        let result = drawings.open_blocking(&target);
        // Teardown runs on every path; its failures are logged inside the
        // session and never replace the load result.
        session.close_and_join();
        result?;
        Ok(LoadOutcome::Loaded(target))
    }
}

impl Default for LoadOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_READY_TIMEOUT)
    }
}
