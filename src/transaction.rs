use crate::host::EditorHost;
use crate::scene::{ContainerRef, DocumentHost, EntityId, EntityTransform, Point3Data, TextSpec, TransactionHandle};
use anyhow::{bail, Result};
use thiserror::Error;

/// Any failure while applying a mutation request. The scene graph is
/// guaranteed rolled back when this is returned; the message carries the
/// original cause chain for the user-visible channel.
#[derive(Debug, Error)]
#[error("scene mutation failed: {source:#}")]
pub struct MutationFailed {
    #[from]
    pub source: anyhow::Error,
}

/// Ordered edit applied by a mutation request. `Translate` and `Rotate`
/// target the most recently created entity of the same request.
#[derive(Debug, Clone)]
pub enum MutationOp {
    CreateText(TextSpec),
    Translate { delta: Point3Data },
    Rotate { angle_rad: f64, axis: Point3Data },
}

/// Immutable description of one all-or-nothing scene edit: a target
/// container plus the ordered operations to apply under a single handle.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    container: ContainerRef,
    ops: Vec<MutationOp>,
}

impl MutationRequest {
    pub fn new(container: ContainerRef, ops: Vec<MutationOp>) -> Self {
        Self { container, ops }
    }

    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn ops(&self) -> &[MutationOp] {
        &self.ops
    }
}

/// Drop-guard around the transaction handle. Whatever path leaves the
/// scope, the handle is released exactly once: `commit` consumes it, and
/// drop aborts whatever is still open.
struct Txn<'a, D: DocumentHost> {
    doc: &'a mut D,
    handle: Option<TransactionHandle>,
}

impl<'a, D: DocumentHost> Txn<'a, D> {
    fn begin(doc: &'a mut D) -> Result<Self> {
        let handle = doc.begin_transaction()?;
        Ok(Self { doc, handle: Some(handle) })
    }

    fn append(&mut self, container: &ContainerRef, spec: TextSpec) -> Result<EntityId> {
        let handle = match self.handle.as_ref() {
            Some(handle) => handle,
            None => bail!("transaction handle already released"),
        };
        self.doc.append_entity(handle, container, spec)
    }

    fn transform(&mut self, id: EntityId, transform: EntityTransform) -> Result<()> {
        let handle = match self.handle.as_ref() {
            Some(handle) => handle,
            None => bail!("transaction handle already released"),
        };
        self.doc.transform_entity(handle, id, transform)
    }

    fn commit(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => self.doc.commit(handle),
            None => bail!("transaction handle already released"),
        }
    }
}

impl<'a, D: DocumentHost> Drop for Txn<'a, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.doc.abort(handle) {
                eprintln!("[txn] abort failed: {err:#}");
            }
        }
    }
}

/// Applies `request` to the scene graph under a single transaction. On
/// success every created entity identifier is returned and the editor view
/// is recentered on the first created entity; on any failure the graph is
/// left untouched and a [`MutationFailed`] carries the cause. The recenter
/// runs strictly after commit and its failure never fails the call.
pub fn run<D: DocumentHost, E: EditorHost>(
    doc: &mut D,
    editor: &E,
    request: &MutationRequest,
) -> Result<Vec<EntityId>, MutationFailed> {
    let (created, reference) = apply(doc, request)?;
    if let Some(point) = reference {
        recenter_view(editor, point);
    }
    Ok(created)
}

fn apply<D: DocumentHost>(
    doc: &mut D,
    request: &MutationRequest,
) -> Result<(Vec<EntityId>, Option<Point3Data>)> {
    let mut txn = Txn::begin(doc)?;
    let mut created: Vec<EntityId> = Vec::new();
    // Final placement of the first created entity, tracked through
    // translations so the recenter target matches what was committed.
    let mut reference: Option<Point3Data> = None;
    for op in request.ops() {
        match op {
            MutationOp::CreateText(spec) => {
                if reference.is_none() {
                    reference = Some(spec.placement);
                }
                created.push(txn.append(request.container(), spec.clone())?);
            }
            MutationOp::Translate { delta } => {
                let Some(&target) = created.last() else {
                    bail!("translate requested before any entity was created");
                };
                txn.transform(target, EntityTransform::Translate { delta: *delta })?;
                if created.len() == 1 {
                    if let Some(point) = reference.as_mut() {
                        let moved = glam::DVec3::from(*point) + glam::DVec3::from(*delta);
                        *point = moved.into();
                    }
                }
            }
            MutationOp::Rotate { angle_rad, axis } => {
                let Some(&target) = created.last() else {
                    bail!("rotate requested before any entity was created");
                };
                txn.transform(target, EntityTransform::Rotate { angle_rad: *angle_rad, axis: *axis })?;
            }
        }
    }
    txn.commit()?;
    Ok((created, reference))
}

/// Cosmetic step after commit: center a 100x100 view window on the
/// reference point. Best effort only.
fn recenter_view<E: EditorHost>(editor: &E, point: Point3Data) {
    let mut view = editor.current_view();
    view.center = (point.x, point.y);
    view.width = 100.0;
    view.height = 100.0;
    if let Err(err) = editor.set_current_view(view) {
        eprintln!("[txn] viewport recenter failed: {err:#}");
    }
}
