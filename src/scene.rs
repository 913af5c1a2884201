use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub type EntityId = Uuid;

pub const MODEL_SPACE: &str = "model_space";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerRef(pub String);

impl ContainerRef {
    pub fn model_space() -> Self {
        Self(MODEL_SPACE.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point3Data {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QuatData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for QuatData {
    fn default() -> Self {
        glam::DQuat::IDENTITY.into()
    }
}

impl From<glam::DVec3> for Point3Data {
    fn from(value: glam::DVec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

impl From<Point3Data> for glam::DVec3 {
    fn from(value: Point3Data) -> Self {
        glam::DVec3::new(value.x, value.y, value.z)
    }
}

impl From<glam::DQuat> for QuatData {
    fn from(value: glam::DQuat) -> Self {
        let v = value.normalize();
        Self { x: v.x, y: v.y, z: v.z, w: v.w }
    }
}

impl From<QuatData> for glam::DQuat {
    fn from(value: QuatData) -> Self {
        glam::DQuat::from_xyzw(value.x, value.y, value.z, value.w)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPoint {
    TopLeft,
    MiddleCenter,
    BottomRight,
}

impl Default for AttachmentPoint {
    fn default() -> Self {
        AttachmentPoint::MiddleCenter
    }
}

/// Specification for a text entity before it exists in the graph.
/// Identifier assignment happens on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSpec {
    pub contents: String,
    #[serde(default = "TextSpec::default_layer")]
    pub layer: String,
    #[serde(default = "TextSpec::default_color_index")]
    pub color_index: u16,
    #[serde(default = "TextSpec::default_height")]
    pub height: f64,
    #[serde(default)]
    pub placement: Point3Data,
    #[serde(default)]
    pub attachment: AttachmentPoint,
}

impl TextSpec {
    fn default_layer() -> String {
        "0".to_string()
    }

    const fn default_color_index() -> u16 {
        1
    }

    const fn default_height() -> f64 {
        15.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEntity {
    pub id: EntityId,
    pub contents: String,
    pub layer: String,
    pub color_index: u16,
    pub height: f64,
    pub placement: Point3Data,
    #[serde(default)]
    pub rotation: QuatData,
    #[serde(default)]
    pub attachment: AttachmentPoint,
}

impl TextEntity {
    fn from_spec(spec: TextSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            contents: spec.contents,
            layer: spec.layer,
            color_index: spec.color_index,
            height: spec.height,
            placement: spec.placement,
            rotation: QuatData::default(),
            attachment: spec.attachment,
        }
    }
}

/// Geometric edit applied to one entity inside a transaction. Rotation is
/// composed about the entity's own placement point, not the container
/// origin, so translating before rotating moves the rotation center with
/// the entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityTransform {
    Translate { delta: Point3Data },
    Rotate { angle_rad: f64, axis: Point3Data },
}

/// Mutation contract of the externally-owned scene graph. The host
/// serializes writers itself: only one live handle exists at a time, and
/// abort fully undoes every append and transform made under that handle.
pub trait DocumentHost {
    fn begin_transaction(&mut self) -> Result<TransactionHandle>;
    fn append_entity(
        &mut self,
        handle: &TransactionHandle,
        container: &ContainerRef,
        spec: TextSpec,
    ) -> Result<EntityId>;
    fn transform_entity(
        &mut self,
        handle: &TransactionHandle,
        id: EntityId,
        transform: EntityTransform,
    ) -> Result<()>;
    fn commit(&mut self, handle: TransactionHandle) -> Result<()>;
    fn abort(&mut self, handle: TransactionHandle) -> Result<()>;
}

/// Token for exclusive mutation rights. Deliberately neither `Clone` nor
/// `Copy`: commit and abort consume it, so it is released exactly once.
#[derive(Debug)]
pub struct TransactionHandle {
    token: u64,
}

impl TransactionHandle {
    pub fn token(&self) -> u64 {
        self.token
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SceneContents {
    containers: BTreeMap<String, Vec<EntityId>>,
    entities: BTreeMap<EntityId, TextEntity>,
}

/// In-memory scene database, the reference `DocumentHost`. Edits under an
/// open transaction go to a staged copy of the contents; commit swaps the
/// staged copy in, abort drops it, so the live graph is all-or-nothing.
#[derive(Debug, Default)]
pub struct SceneDb {
    live: SceneContents,
    staged: Option<StagedTransaction>,
    next_token: u64,
}

#[derive(Debug)]
struct StagedTransaction {
    token: u64,
    contents: SceneContents,
}

impl SceneDb {
    pub fn new() -> Self {
        let mut live = SceneContents::default();
        live.containers.insert(MODEL_SPACE.to_string(), Vec::new());
        Self { live, staged: None, next_token: 1 }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading drawing file {}", path.display()))?;
        let live = serde_json::from_slice::<SceneContents>(&bytes)
            .with_context(|| format!("Parsing drawing file {}", path.display()))?;
        Ok(Self { live, staged: None, next_token: 1 })
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating drawing directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.live)?;
        fs::write(path, json.as_bytes())
            .with_context(|| format!("Writing drawing file {}", path.display()))?;
        Ok(())
    }

    pub fn entity(&self, id: EntityId) -> Option<&TextEntity> {
        self.live.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.live.entities.len()
    }

    pub fn container_entities(&self, container: &ContainerRef) -> &[EntityId] {
        self.live.containers.get(container.name()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_open_transaction(&self) -> bool {
        self.staged.is_some()
    }

    fn staged_for(&mut self, handle: &TransactionHandle) -> Result<&mut SceneContents> {
        match self.staged.as_mut() {
            Some(staged) if staged.token == handle.token => Ok(&mut staged.contents),
            Some(_) => bail!("transaction handle {} does not match the open transaction", handle.token),
            None => bail!("no open transaction for handle {}", handle.token),
        }
    }

    fn take_staged(&mut self, handle: &TransactionHandle) -> Result<SceneContents> {
        match self.staged.take() {
            Some(staged) if staged.token == handle.token => Ok(staged.contents),
            Some(other) => {
                self.staged = Some(other);
                bail!("transaction handle {} does not match the open transaction", handle.token)
            }
            None => bail!("no open transaction for handle {}", handle.token),
        }
    }
}

impl DocumentHost for SceneDb {
    fn begin_transaction(&mut self) -> Result<TransactionHandle> {
        if self.staged.is_some() {
            bail!("a transaction is already open on this document");
        }
        let token = self.next_token;
        self.next_token += 1;
        self.staged = Some(StagedTransaction { token, contents: self.live.clone() });
        Ok(TransactionHandle { token })
    }

    fn append_entity(
        &mut self,
        handle: &TransactionHandle,
        container: &ContainerRef,
        spec: TextSpec,
    ) -> Result<EntityId> {
        let contents = self.staged_for(handle)?;
        let Some(ids) = contents.containers.get_mut(container.name()) else {
            bail!("container '{}' does not exist", container.name());
        };
        let entity = TextEntity::from_spec(spec);
        let id = entity.id;
        ids.push(id);
        contents.entities.insert(id, entity);
        Ok(id)
    }

    fn transform_entity(
        &mut self,
        handle: &TransactionHandle,
        id: EntityId,
        transform: EntityTransform,
    ) -> Result<()> {
        let contents = self.staged_for(handle)?;
        let Some(entity) = contents.entities.get_mut(&id) else {
            bail!("entity {id} is not present in the open transaction");
        };
        apply_transform(entity, transform);
        Ok(())
    }

    fn commit(&mut self, handle: TransactionHandle) -> Result<()> {
        let contents = self.take_staged(&handle)?;
        self.live = contents;
        Ok(())
    }

    fn abort(&mut self, handle: TransactionHandle) -> Result<()> {
        let _ = self.take_staged(&handle)?;
        Ok(())
    }
}

fn apply_transform(entity: &mut TextEntity, transform: EntityTransform) {
    match transform {
        EntityTransform::Translate { delta } => {
            let placement = glam::DVec3::from(entity.placement) + glam::DVec3::from(delta);
            entity.placement = placement.into();
        }
        EntityTransform::Rotate { angle_rad, axis } => {
            let axis = glam::DVec3::from(axis).normalize_or_zero();
            if axis == glam::DVec3::ZERO {
                return;
            }
            let rotation = glam::DQuat::from_axis_angle(axis, angle_rad);
            let composed = rotation * glam::DQuat::from(entity.rotation);
            entity.rotation = composed.normalize().into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec(contents: &str) -> TextSpec {
        TextSpec {
            contents: contents.to_string(),
            layer: "0".to_string(),
            color_index: 1,
            height: 15.0,
            placement: Point3Data::default(),
            attachment: AttachmentPoint::MiddleCenter,
        }
    }

    #[test]
    fn commit_makes_appends_visible() {
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        let id = db
            .append_entity(&handle, &ContainerRef::model_space(), sample_spec("hello"))
            .expect("append");
        assert_eq!(db.entity_count(), 0, "staged append must not be visible before commit");
        db.commit(handle).expect("commit");
        assert_eq!(db.entity_count(), 1);
        assert_eq!(db.container_entities(&ContainerRef::model_space()), &[id]);
    }

    #[test]
    fn abort_undoes_appends() {
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        db.append_entity(&handle, &ContainerRef::model_space(), sample_spec("hello")).expect("append");
        db.abort(handle).expect("abort");
        assert_eq!(db.entity_count(), 0);
        assert!(!db.has_open_transaction());
    }

    #[test]
    fn only_one_transaction_at_a_time() {
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        assert!(db.begin_transaction().is_err());
        db.abort(handle).expect("abort");
        assert!(db.begin_transaction().is_ok());
    }

    #[test]
    fn append_into_unknown_container_fails() {
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        let missing = ContainerRef("paper_space".to_string());
        assert!(db.append_entity(&handle, &missing, sample_spec("hello")).is_err());
        db.abort(handle).expect("abort");
    }

    #[test]
    fn rotation_composes_about_placement() {
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        let mut spec = sample_spec("spin");
        spec.placement = Point3Data { x: 4.0, y: -2.0, z: 0.0 };
        let id = db.append_entity(&handle, &ContainerRef::model_space(), spec).expect("append");
        let axis = Point3Data { x: 0.0, y: 0.0, z: 1.0 };
        db.transform_entity(
            &handle,
            id,
            EntityTransform::Rotate { angle_rad: std::f64::consts::FRAC_PI_2, axis },
        )
        .expect("rotate");
        db.commit(handle).expect("commit");
        let entity = db.entity(id).expect("entity");
        // Placement is the rotation center, so it must not move.
        assert_eq!(entity.placement, Point3Data { x: 4.0, y: -2.0, z: 0.0 });
        let quat = glam::DQuat::from(entity.rotation);
        let expected = glam::DQuat::from_axis_angle(glam::DVec3::Z, std::f64::consts::FRAC_PI_2);
        assert!(quat.angle_between(expected) < 1e-9);
    }

    #[test]
    fn drawing_roundtrip_preserves_entities() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roundtrip.json");
        let mut db = SceneDb::new();
        let handle = db.begin_transaction().expect("begin");
        let id = db
            .append_entity(&handle, &ContainerRef::model_space(), sample_spec("persisted"))
            .expect("append");
        db.commit(handle).expect("commit");
        db.save_to_path(&path).expect("save");

        let loaded = SceneDb::load_from_path(&path).expect("load");
        assert_eq!(loaded.entity_count(), 1);
        assert_eq!(loaded.entity(id).expect("entity").contents, "persisted");
    }
}
