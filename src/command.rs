use crate::config::{AppConfig, StampConfig};
use crate::host::{DrawingHost, EditorHost};
use crate::idle::{one_shot, IdleHost};
use crate::journal::Journal;
use crate::net;
use crate::orchestrator::LoadOrchestrator;
use crate::scene::{AttachmentPoint, ContainerRef, DocumentHost, Point3Data, TextSpec};
use crate::transaction::{self, MutationOp, MutationRequest};
use crate::ui_session::{ProgressSurface, SessionHandle};
use anyhow::Result;
use std::time::Duration;

/// Plugin bring-up: greet on the editor channel and defer the remaining
/// setup to the host's next idle moment. The registration fires once and
/// disarms itself.
pub fn initialize<E: EditorHost, I: IdleHost>(editor: &E, idle: &mut I, journal: &Journal) {
    editor.write_message("IP stamp plugin initialized. Run the stamp command to begin.");
    let deferred = journal.clone();
    idle.register_idle(one_shot(move || {
        deferred.append("Deferred plugin setup complete");
    }));
}

/// The end-to-end stamp command. Every error is caught at this boundary
/// and converted into a single user-visible message line; nothing here may
/// terminate the host or leave the scene graph in an indeterminate state.
pub fn run_ip_stamp<D, H, E, S, F>(
    doc: &mut D,
    drawings: &mut H,
    editor: &E,
    config: &AppConfig,
    journal: &Journal,
    make_surface: F,
) where
    D: DocumentHost,
    H: DrawingHost,
    E: EditorHost,
    S: ProgressSurface + 'static,
    F: FnOnce(SessionHandle) -> Result<S> + Send + 'static,
{
    if let Err(err) = execute(doc, drawings, editor, config, journal, make_surface) {
        editor.write_message(&format!("Error: {err:#}"));
    }
}

fn execute<D, H, E, S, F>(
    doc: &mut D,
    drawings: &mut H,
    editor: &E,
    config: &AppConfig,
    journal: &Journal,
    make_surface: F,
) -> Result<()>
where
    D: DocumentHost,
    H: DrawingHost,
    E: EditorHost,
    S: ProgressSurface + 'static,
    F: FnOnce(SessionHandle) -> Result<S> + Send + 'static,
{
    editor.write_message("Retrieving IPv4 address...");
    let ip = net::public_ipv4(&config.network);
    editor.write_message(&format!("Your IPv4: {ip}"));

    let request = stamp_request(&config.stamp, &ip);
    transaction::run(doc, editor, &request)?;
    editor.write_message("Text created in model space");

    editor.write_message("Loading drawing...");
    let orchestrator = LoadOrchestrator::new(Duration::from_millis(config.load.ready_timeout_ms));
    orchestrator.load(drawings, editor, &config.load.drawing_path, make_surface)?;

    journal.append("Plugin execution finished!");
    editor.write_message("Operation completed successfully!");
    Ok(())
}

/// The rotate-and-insert mutation: one text entity at the origin, rotated
/// about its own placement point by the configured angle around +Z. Angle
/// and axis are fixed here, at submission time.
pub fn stamp_request(stamp: &StampConfig, ip: &str) -> MutationRequest {
    let spec = TextSpec {
        contents: format!("Your public IPv4: {ip}"),
        layer: stamp.layer.clone(),
        color_index: stamp.color_index,
        height: stamp.text_height,
        placement: Point3Data::default(),
        attachment: AttachmentPoint::MiddleCenter,
    };
    let ops = vec![
        MutationOp::CreateText(spec),
        MutationOp::Rotate {
            angle_rad: stamp.rotation_deg.to_radians(),
            axis: Point3Data { x: 0.0, y: 0.0, z: 1.0 },
        },
    ];
    MutationRequest::new(ContainerRef::model_space(), ops)
}
