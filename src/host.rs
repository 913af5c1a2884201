use crate::scene::SceneDb;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};

/// Viewport rectangle of the editor, centered on `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: (f64, f64),
    pub width: f64,
    pub height: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { center: (0.0, 0.0), width: 420.0, height: 297.0 }
    }
}

/// Message and viewport surface of the hosting editor. `write_message` is
/// fire-and-forget and never fails the caller; the view accessors exist for
/// the best-effort post-commit recenter.
pub trait EditorHost {
    fn write_message(&self, text: &str);
    fn current_view(&self) -> ViewState;
    fn set_current_view(&self, view: ViewState) -> Result<()>;
}

/// Console-backed editor used by the binary and as a test double. Interior
/// mutability keeps the trait object shareable from the command context.
#[derive(Debug, Default)]
pub struct ConsoleEditor {
    view: RefCell<ViewState>,
}

impl ConsoleEditor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorHost for ConsoleEditor {
    fn write_message(&self, text: &str) {
        println!("{text}");
    }

    fn current_view(&self) -> ViewState {
        *self.view.borrow()
    }

    fn set_current_view(&self, view: ViewState) -> Result<()> {
        *self.view.borrow_mut() = view;
        Ok(())
    }
}

/// Drawing management surface of the host: the blocking open that the
/// orchestrator drives, and the cheap fallback creation for a missing
/// target. The open is not cancellable once started; no timeout wraps it.
pub trait DrawingHost {
    fn open_blocking(&mut self, path: &Path) -> Result<()>;
    fn create_sample(&mut self) -> Result<PathBuf>;
}

/// Filesystem-backed drawing host. Drawings are serialized scene databases;
/// opening one parses it into the active document slot.
#[derive(Debug, Default)]
pub struct LocalDrawings {
    active: Option<(PathBuf, SceneDb)>,
}

impl LocalDrawings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn active_document(&self) -> Option<&SceneDb> {
        self.active.as_ref().map(|(_, db)| db)
    }
}

impl DrawingHost for LocalDrawings {
    fn open_blocking(&mut self, path: &Path) -> Result<()> {
        let db = SceneDb::load_from_path(path)
            .with_context(|| format!("Opening drawing {}", path.display()))?;
        self.active = Some((path.to_path_buf(), db));
        Ok(())
    }

    fn create_sample(&mut self) -> Result<PathBuf> {
        let path = env::temp_dir().join("sample_drawing.json");
        if self.active_path() == Some(path.as_path()) {
            return Ok(path);
        }
        let db = SceneDb::new();
        db.save_to_path(&path).context("Creating sample drawing")?;
        self.active = Some((path.clone(), db));
        Ok(path)
    }
}
