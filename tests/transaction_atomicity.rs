use anyhow::{bail, Result};
use ipstamp::host::{EditorHost, ViewState};
use ipstamp::scene::{
    AttachmentPoint, ContainerRef, DocumentHost, EntityId, EntityTransform, Point3Data, SceneDb,
    TextSpec, TransactionHandle,
};
use ipstamp::transaction::{self, MutationOp, MutationRequest};
use std::cell::RefCell;

struct RecordingEditor {
    view: RefCell<ViewState>,
    fail_view: bool,
}

impl RecordingEditor {
    fn new() -> Self {
        Self { view: RefCell::new(ViewState::default()), fail_view: false }
    }

    fn failing_view() -> Self {
        Self { fail_view: true, ..Self::new() }
    }
}

impl EditorHost for RecordingEditor {
    fn write_message(&self, _text: &str) {}

    fn current_view(&self) -> ViewState {
        *self.view.borrow()
    }

    fn set_current_view(&self, view: ViewState) -> Result<()> {
        if self.fail_view {
            bail!("view is locked");
        }
        *self.view.borrow_mut() = view;
        Ok(())
    }
}

/// Wraps a scene database and fails the nth append/transform, counting
/// every attempt so tests can assert that later operations were never
/// tried.
struct FailingDoc {
    inner: SceneDb,
    fail_at: Option<usize>,
    attempted: usize,
}

impl FailingDoc {
    fn new(fail_at: Option<usize>) -> Self {
        Self { inner: SceneDb::new(), fail_at, attempted: 0 }
    }

    fn check_injection(&mut self) -> Result<()> {
        let index = self.attempted;
        self.attempted += 1;
        if self.fail_at == Some(index) {
            bail!("injected failure at operation {index}");
        }
        Ok(())
    }
}

impl DocumentHost for FailingDoc {
    fn begin_transaction(&mut self) -> Result<TransactionHandle> {
        self.inner.begin_transaction()
    }

    fn append_entity(
        &mut self,
        handle: &TransactionHandle,
        container: &ContainerRef,
        spec: TextSpec,
    ) -> Result<EntityId> {
        self.check_injection()?;
        self.inner.append_entity(handle, container, spec)
    }

    fn transform_entity(
        &mut self,
        handle: &TransactionHandle,
        id: EntityId,
        transform: EntityTransform,
    ) -> Result<()> {
        self.check_injection()?;
        self.inner.transform_entity(handle, id, transform)
    }

    fn commit(&mut self, handle: TransactionHandle) -> Result<()> {
        self.inner.commit(handle)
    }

    fn abort(&mut self, handle: TransactionHandle) -> Result<()> {
        self.inner.abort(handle)
    }
}

fn text_spec(contents: &str, placement: Point3Data) -> TextSpec {
    TextSpec {
        contents: contents.to_string(),
        layer: "0".to_string(),
        color_index: 1,
        height: 15.0,
        placement,
        attachment: AttachmentPoint::MiddleCenter,
    }
}

const Z_AXIS: Point3Data = Point3Data { x: 0.0, y: 0.0, z: 1.0 };

#[test]
fn single_create_returns_exactly_one_identifier() {
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::new();
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![MutationOp::CreateText(text_spec("stamp", Point3Data::default()))],
    );
    let created = transaction::run(&mut doc, &editor, &request).expect("mutation");
    assert_eq!(created.len(), 1);
    assert_eq!(doc.entity_count(), 1);
    assert!(doc.entity(created[0]).is_some());
}

#[test]
fn failure_at_any_index_leaves_the_graph_untouched() {
    let ops = |spec_count: usize| -> Vec<MutationOp> {
        (0..spec_count)
            .map(|i| MutationOp::CreateText(text_spec(&format!("entity {i}"), Point3Data::default())))
            .collect()
    };
    for fail_at in 0..3 {
        let mut doc = FailingDoc::new(Some(fail_at));
        let editor = RecordingEditor::new();
        let request = MutationRequest::new(ContainerRef::model_space(), ops(3));
        let err = transaction::run(&mut doc, &editor, &request)
            .expect_err("injected failure must fail the transaction");
        assert!(err.to_string().contains("scene mutation failed"));
        assert!(err.to_string().contains(&format!("injected failure at operation {fail_at}")));
        assert_eq!(doc.inner.entity_count(), 0, "graph must contain zero entities from the request");
        assert!(!doc.inner.has_open_transaction(), "handle must be released on the abort path");
        assert_eq!(doc.attempted, fail_at + 1, "operations after the failure must never be attempted");
    }
}

#[test]
fn transform_before_any_create_fails_and_rolls_back() {
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::new();
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![MutationOp::Rotate { angle_rad: 1.0, axis: Z_AXIS }],
    );
    let err = transaction::run(&mut doc, &editor, &request).expect_err("rotate with no target");
    assert!(err.to_string().contains("before any entity was created"));
    assert_eq!(doc.entity_count(), 0);
    assert!(!doc.has_open_transaction());
}

#[test]
fn rotation_and_its_inverse_cancel_out() {
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::new();
    let placement = Point3Data { x: 12.5, y: -8.0, z: 0.0 };
    let theta = 1.234_f64;
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![
            MutationOp::CreateText(text_spec("spin", placement)),
            MutationOp::Rotate { angle_rad: theta, axis: Z_AXIS },
            MutationOp::Rotate { angle_rad: -theta, axis: Z_AXIS },
        ],
    );
    let created = transaction::run(&mut doc, &editor, &request).expect("mutation");
    let entity = doc.entity(created[0]).expect("entity");
    assert_eq!(entity.placement, placement, "rotation about the placement point must not move it");
    let quat = glam::DQuat::from(entity.rotation);
    assert!(quat.angle_between(glam::DQuat::IDENTITY) < 1e-9);
}

#[test]
fn translate_before_rotate_moves_the_rotation_center() {
    // The ordering dependency is deliberate: the rotation center follows
    // the entity, so placement after translate+rotate equals the
    // translated placement.
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::new();
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![
            MutationOp::CreateText(text_spec("moved", Point3Data::default())),
            MutationOp::Translate { delta: Point3Data { x: 30.0, y: 0.0, z: 0.0 } },
            MutationOp::Rotate { angle_rad: std::f64::consts::PI, axis: Z_AXIS },
        ],
    );
    let created = transaction::run(&mut doc, &editor, &request).expect("mutation");
    let entity = doc.entity(created[0]).expect("entity");
    assert_eq!(entity.placement, Point3Data { x: 30.0, y: 0.0, z: 0.0 });
}

#[test]
fn successful_commit_recenters_the_view() {
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::new();
    let placement = Point3Data { x: 7.0, y: 3.0, z: 0.0 };
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![MutationOp::CreateText(text_spec("centered", placement))],
    );
    transaction::run(&mut doc, &editor, &request).expect("mutation");
    let view = editor.current_view();
    assert_eq!(view.center, (7.0, 3.0));
    assert_eq!(view.width, 100.0);
    assert_eq!(view.height, 100.0);
}

#[test]
fn recenter_failure_does_not_fail_the_transaction() {
    let mut doc = SceneDb::new();
    let editor = RecordingEditor::failing_view();
    let request = MutationRequest::new(
        ContainerRef::model_space(),
        vec![MutationOp::CreateText(text_spec("still committed", Point3Data::default()))],
    );
    let created = transaction::run(&mut doc, &editor, &request).expect("commit must survive a view error");
    assert_eq!(created.len(), 1);
    assert_eq!(doc.entity_count(), 1);
}
