pub mod cli;
pub mod command;
pub mod config;
pub mod host;
pub mod idle;
pub mod journal;
pub mod net;
pub mod orchestrator;
pub mod readiness;
pub mod scene;
pub mod transaction;
pub mod ui_session;

pub use orchestrator::{LoadOrchestrator, LoadOutcome, TargetResolution};
pub use readiness::ReadinessGate;
pub use transaction::{MutationFailed, MutationOp, MutationRequest};
pub use ui_session::{ProgressState, UiThreadSession};
