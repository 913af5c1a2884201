use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const JOURNAL_FILE_NAME: &str = "ipstamp_journal.txt";

/// Append-only execution journal: one `"<timestamp>: <message>"` line per
/// entry, written to a per-user path. Write failures are swallowed; the
/// journal never fails a command.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal in the user's documents directory, falling back to the
    /// temp directory when the platform reports none.
    pub fn default_location() -> Self {
        let base = dirs::document_dir().unwrap_or_else(std::env::temp_dir);
        Self { path: base.join(JOURNAL_FILE_NAME) }
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) {
        let line = format!("{}: {message}\n", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            eprintln!("[journal] write to {} failed: {err}", self.path.display());
        }
    }
}
