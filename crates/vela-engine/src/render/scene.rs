//! The renderer seam and the in-tree scene graph.
//!
//! [`SceneRenderer`] is everything the runtime asks of a renderer: mesh and
//! light nodes keyed by entity id, transform pushes, queued model loads,
//! camera, viewport and lifecycle. [`HeadlessRenderer`] implements it with a
//! plain scene graph and produces a [`DrawCommand`] list every frame, which
//! the windowed debug view draws when the `renderer` feature is on.

use std::collections::BTreeMap;
use std::task::Poll;

use vela_ecs::entity::EntityId;

use super::model::{MemoryModelSource, ModelAsset, ModelLoadOutcome, ModelOptions, ModelSource};
use crate::components::{Geometry, Light, Material, ShadowFlags};
use crate::error::RenderError;
use crate::math::Vec3;

// ---------------------------------------------------------------------------
// Camera and draw output
// ---------------------------------------------------------------------------

/// Where the scene is viewed from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraView {
    /// Eye position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f64,
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// What a draw command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    /// A primitive mesh owned by an entity.
    Mesh(EntityId),
    /// A loaded model owned by an entity.
    Model(EntityId),
    /// An editor preview object, by index.
    Preview(usize),
}

/// One visible node flattened for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub source: DrawSource,
    /// World-space position of the node.
    pub position: Vec3,
    /// XYZ Euler angles in radians.
    pub rotation: Vec3,
    /// Per-axis scale applied to `footprint`.
    pub scale: Vec3,
    /// Extent on the XZ plane before scaling.
    pub footprint: (f64, f64),
    /// `0xRRGGBB`.
    pub color: u32,
}

// ---------------------------------------------------------------------------
// SceneRenderer
// ---------------------------------------------------------------------------

/// A render scene graph keyed by entity id.
///
/// Operations on ids with no node are no-ops: transforms may arrive before an
/// asynchronously loaded model exists.
pub trait SceneRenderer {
    /// Add a primitive node for `entity` at the origin, replacing any
    /// existing one.
    fn create_mesh(
        &mut self,
        entity: EntityId,
        geometry: &Geometry,
        material: Option<&Material>,
        shadows: ShadowFlags,
    );

    /// Add a light node for `entity` at the origin.
    fn create_light(&mut self, entity: EntityId, light: &Light);

    /// Remove the mesh of `entity` and cancel any load still in flight for
    /// it. Returns `true` if either existed.
    fn remove_mesh(&mut self, entity: EntityId) -> bool;

    /// Returns `true` if `entity` had a light.
    fn remove_light(&mut self, entity: EntityId) -> bool;

    /// Move the mesh or model node of `entity`.
    fn update_mesh_transform(&mut self, entity: EntityId, position: Vec3, rotation: Vec3, scale: Vec3);

    fn update_light_position(&mut self, entity: EntityId, position: Vec3);

    /// Hidden nodes stay in the graph but are not drawn.
    fn set_mesh_visible(&mut self, entity: EntityId, visible: bool);

    /// Queue a model load for `entity`. A load already queued for the same
    /// entity is cancelled.
    fn load_model(&mut self, entity: EntityId, url: &str, options: &ModelOptions);

    /// Advance queued loads. Completed models are attached to the scene graph
    /// before being reported.
    fn poll_model_loads(&mut self) -> Vec<ModelLoadOutcome>;

    /// Use `view` for the next render.
    fn set_camera(&mut self, view: &CameraView);

    /// New viewport size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Ambient settings; opaque to the runtime.
    fn configure(&mut self, settings: &serde_json::Value);

    /// Drop every mesh, light, preview object and queued load.
    fn clear_all_meshes(&mut self);

    /// Draw one frame from the current graph and camera.
    fn render(&mut self);

    /// Release all resources. Idempotent.
    fn dispose(&mut self);

    /// Mesh and model nodes owned by entities.
    fn mesh_count(&self) -> usize;

    fn light_count(&self) -> usize;

    /// Whether a model load for `entity` is queued and not yet reported.
    fn has_pending_load(&self, entity: EntityId) -> bool;
}

// ---------------------------------------------------------------------------
// Scene graph nodes
// ---------------------------------------------------------------------------

/// What a mesh node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeShape {
    Primitive(Geometry),
    Model(ModelAsset),
}

/// A drawable node in the headless scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub shape: NodeShape,
    /// `None` for models, which carry their own materials.
    pub material: Option<Material>,
    pub shadows: ShadowFlags,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub visible: bool,
}

impl MeshNode {
    fn footprint(&self) -> (f64, f64) {
        match &self.shape {
            NodeShape::Primitive(g) => g.footprint(),
            NodeShape::Model(_) => (1.0, 1.0),
        }
    }

    fn color(&self) -> u32 {
        self.material.as_ref().map_or(MODEL_COLOR, |m| m.color)
    }
}

/// A light in the headless scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    /// Parameters as created; only the position changes afterwards.
    pub light: Light,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    url: String,
    options: ModelOptions,
}

const MODEL_COLOR: u32 = 0xc0c0c0;

// ---------------------------------------------------------------------------
// HeadlessRenderer
// ---------------------------------------------------------------------------

/// Scene graph without a GPU.
pub struct HeadlessRenderer {
    meshes: BTreeMap<EntityId, MeshNode>,
    lights: BTreeMap<EntityId, LightNode>,
    previews: Vec<MeshNode>,
    loads: BTreeMap<EntityId, PendingLoad>,
    /// Outcomes for loads cancelled since the last poll.
    cancelled: Vec<ModelLoadOutcome>,
    source: Box<dyn ModelSource>,
    camera: CameraView,
    viewport: (u32, u32),
    settings: serde_json::Map<String, serde_json::Value>,
    draw_list: Vec<DrawCommand>,
    frames_rendered: u64,
    disposed: bool,
}

impl std::fmt::Debug for HeadlessRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessRenderer")
            .field("meshes", &self.meshes.len())
            .field("lights", &self.lights.len())
            .field("previews", &self.previews.len())
            .field("loads", &self.loads.len())
            .field("viewport", &self.viewport)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(MemoryModelSource::new())
    }
}

impl HeadlessRenderer {
    pub fn new(source: impl ModelSource + 'static) -> Self {
        Self {
            meshes: BTreeMap::new(),
            lights: BTreeMap::new(),
            previews: Vec::new(),
            loads: BTreeMap::new(),
            cancelled: Vec::new(),
            source: Box::new(source),
            camera: CameraView::default(),
            viewport: (800, 600),
            settings: serde_json::Map::new(),
            draw_list: Vec::new(),
            frames_rendered: 0,
            disposed: false,
        }
    }

    /// The mesh or model node of `entity`.
    pub fn mesh(&self, entity: EntityId) -> Option<&MeshNode> {
        self.meshes.get(&entity)
    }

    pub fn light(&self, entity: EntityId) -> Option<&LightNode> {
        self.lights.get(&entity)
    }

    /// Add an editor object that belongs to no entity. Returns its index.
    pub fn add_preview(&mut self, geometry: Geometry, material: Option<Material>, position: Vec3) -> usize {
        self.previews.push(MeshNode {
            shape: NodeShape::Primitive(geometry),
            material,
            shadows: ShadowFlags::default(),
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
        });
        self.previews.len() - 1
    }

    pub fn preview_count(&self) -> usize {
        self.previews.len()
    }

    /// The view set by the last frame.
    pub fn camera(&self) -> &CameraView {
        &self.camera
    }

    /// `(width, height)` in physical pixels.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Settings merged from every [`configure`](SceneRenderer::configure).
    pub fn settings(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.settings
    }

    /// Draw commands produced by the last [`render`](SceneRenderer::render).
    pub fn draw_list(&self) -> &[DrawCommand] {
        &self.draw_list
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn cancel_load(&mut self, entity: EntityId) -> bool {
        let Some(load) = self.loads.remove(&entity) else {
            return false;
        };
        tracing::debug!(entity = %entity, url = %load.url, "model load cancelled");
        self.cancelled.push(ModelLoadOutcome {
            entity,
            url: load.url.clone(),
            result: Err(RenderError::Cancelled { url: load.url }),
        });
        true
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn create_mesh(
        &mut self,
        entity: EntityId,
        geometry: &Geometry,
        material: Option<&Material>,
        shadows: ShadowFlags,
    ) {
        if self.disposed {
            return;
        }
        self.meshes.insert(
            entity,
            MeshNode {
                shape: NodeShape::Primitive(geometry.clone()),
                material: material.cloned(),
                shadows,
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                scale: Vec3::ONE,
                visible: true,
            },
        );
    }

    fn create_light(&mut self, entity: EntityId, light: &Light) {
        if self.disposed {
            return;
        }
        self.lights.insert(
            entity,
            LightNode {
                light: light.clone(),
                position: Vec3::ZERO,
            },
        );
    }

    fn remove_mesh(&mut self, entity: EntityId) -> bool {
        let cancelled = self.cancel_load(entity);
        self.meshes.remove(&entity).is_some() || cancelled
    }

    fn remove_light(&mut self, entity: EntityId) -> bool {
        self.lights.remove(&entity).is_some()
    }

    fn update_mesh_transform(&mut self, entity: EntityId, position: Vec3, rotation: Vec3, scale: Vec3) {
        if let Some(node) = self.meshes.get_mut(&entity) {
            node.position = position;
            node.rotation = rotation;
            node.scale = scale;
        }
    }

    fn update_light_position(&mut self, entity: EntityId, position: Vec3) {
        if let Some(node) = self.lights.get_mut(&entity) {
            node.position = position;
        }
    }

    fn set_mesh_visible(&mut self, entity: EntityId, visible: bool) {
        if let Some(node) = self.meshes.get_mut(&entity) {
            node.visible = visible;
        }
    }

    fn load_model(&mut self, entity: EntityId, url: &str, options: &ModelOptions) {
        if self.disposed {
            return;
        }
        self.cancel_load(entity);
        tracing::debug!(entity = %entity, url, "model load queued");
        self.loads.insert(
            entity,
            PendingLoad {
                url: url.to_owned(),
                options: options.clone(),
            },
        );
    }

    fn poll_model_loads(&mut self) -> Vec<ModelLoadOutcome> {
        let mut outcomes = std::mem::take(&mut self.cancelled);
        let ids: Vec<EntityId> = self.loads.keys().copied().collect();
        for entity in ids {
            let Some(load) = self.loads.get(&entity) else {
                continue;
            };
            let result = match self.source.fetch(&load.url) {
                Poll::Pending => continue,
                Poll::Ready(result) => result,
            };
            let Some(load) = self.loads.remove(&entity) else {
                continue;
            };
            let result = result.map(|asset| {
                let s = load.options.scale;
                self.meshes.insert(
                    entity,
                    MeshNode {
                        shape: NodeShape::Model(asset),
                        material: None,
                        shadows: load.options.shadows,
                        position: load.options.position,
                        rotation: load.options.rotation,
                        scale: Vec3::new(s, s, s),
                        visible: true,
                    },
                );
            });
            outcomes.push(ModelLoadOutcome {
                entity,
                url: load.url,
                result,
            });
        }
        outcomes
    }

    fn set_camera(&mut self, view: &CameraView) {
        self.camera = view.clone();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    fn configure(&mut self, settings: &serde_json::Value) {
        match settings {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    self.settings.insert(k.clone(), v.clone());
                }
            }
            serde_json::Value::Null => {}
            other => {
                tracing::warn!(settings = %other, "renderer settings must be an object; ignored");
            }
        }
    }

    fn clear_all_meshes(&mut self) {
        self.meshes.clear();
        self.lights.clear();
        self.previews.clear();
        self.loads.clear();
        self.cancelled.clear();
        self.draw_list.clear();
    }

    fn render(&mut self) {
        if self.disposed {
            return;
        }
        self.draw_list.clear();
        for (&entity, node) in &self.meshes {
            if !node.visible {
                continue;
            }
            let source = match node.shape {
                NodeShape::Primitive(_) => DrawSource::Mesh(entity),
                NodeShape::Model(_) => DrawSource::Model(entity),
            };
            self.draw_list.push(DrawCommand {
                source,
                position: node.position,
                rotation: node.rotation,
                scale: node.scale,
                footprint: node.footprint(),
                color: node.color(),
            });
        }
        for (i, node) in self.previews.iter().enumerate() {
            self.draw_list.push(DrawCommand {
                source: DrawSource::Preview(i),
                position: node.position,
                rotation: node.rotation,
                scale: node.scale,
                footprint: node.footprint(),
                color: node.color(),
            });
        }
        self.frames_rendered += 1;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_all_meshes();
        self.disposed = true;
        tracing::debug!(frames = self.frames_rendered, "renderer disposed");
    }

    fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn light_count(&self) -> usize {
        self.lights.len()
    }

    fn has_pending_load(&self, entity: EntityId) -> bool {
        self.loads.contains_key(&entity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GLTF: &str = r#"{"asset":{"version":"2.0"},"meshes":[{}]}"#;

    fn cube() -> Geometry {
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    fn e(i: u32) -> EntityId {
        EntityId::new(i, 0)
    }

    #[test]
    fn transform_before_mesh_is_noop() {
        let mut r = HeadlessRenderer::default();
        r.update_mesh_transform(e(1), Vec3::ONE, Vec3::ZERO, Vec3::ONE);
        assert_eq!(r.mesh_count(), 0);
    }

    #[test]
    fn create_update_remove_mesh() {
        let mut r = HeadlessRenderer::default();
        r.create_mesh(e(1), &cube(), None, ShadowFlags::default());
        r.update_mesh_transform(e(1), Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::ONE);
        assert_eq!(r.mesh(e(1)).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert!(r.remove_mesh(e(1)));
        assert!(!r.remove_mesh(e(1)));
        assert_eq!(r.mesh_count(), 0);
    }

    #[test]
    fn load_attaches_on_poll() {
        let source = MemoryModelSource::new();
        source.insert("tree.gltf", GLTF);
        source.hold("tree.gltf");
        let mut r = HeadlessRenderer::new(source.clone());

        r.load_model(e(2), "tree.gltf", &ModelOptions::default());
        assert!(r.poll_model_loads().is_empty());
        assert_eq!(r.mesh_count(), 0);

        source.release("tree.gltf");
        let outcomes = r.poll_model_loads();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(r.mesh_count(), 1);
        assert!(!r.has_pending_load(e(2)));
    }

    #[test]
    fn failed_load_reports_error_without_mesh() {
        let mut r = HeadlessRenderer::default();
        r.load_model(e(3), "missing.glb", &ModelOptions::default());
        let outcomes = r.poll_model_loads();
        assert!(matches!(
            outcomes[0].result,
            Err(RenderError::ModelNotFound { .. })
        ));
        assert_eq!(r.mesh_count(), 0);
    }

    #[test]
    fn remove_mesh_cancels_pending_load() {
        let source = MemoryModelSource::new();
        source.insert("tree.gltf", GLTF);
        source.hold("tree.gltf");
        let mut r = HeadlessRenderer::new(source.clone());
        r.load_model(e(4), "tree.gltf", &ModelOptions::default());
        assert!(r.remove_mesh(e(4)));

        source.release("tree.gltf");
        let outcomes = r.poll_model_loads();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].result, Err(RenderError::Cancelled { .. })));
        assert_eq!(r.mesh_count(), 0);
        assert!(r.poll_model_loads().is_empty());
    }

    #[test]
    fn clear_all_includes_previews_and_lights() {
        let mut r = HeadlessRenderer::default();
        r.create_mesh(e(1), &cube(), None, ShadowFlags::default());
        r.create_light(e(2), &Light::default());
        r.add_preview(cube(), None, Vec3::ZERO);
        r.load_model(e(3), "x.glb", &ModelOptions::default());
        r.clear_all_meshes();
        assert_eq!(r.mesh_count(), 0);
        assert_eq!(r.light_count(), 0);
        assert_eq!(r.preview_count(), 0);
        assert!(!r.has_pending_load(e(3)));
        assert!(r.poll_model_loads().is_empty());
    }

    #[test]
    fn render_builds_draw_list() {
        let mut r = HeadlessRenderer::default();
        let red = Material {
            color: 0xff0000,
            ..Material::default()
        };
        r.create_mesh(e(1), &cube(), Some(&red), ShadowFlags::default());
        r.add_preview(cube(), None, Vec3::new(0.0, 0.0, 5.0));
        r.render();
        let list = r.draw_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].source, DrawSource::Mesh(e(1)));
        assert_eq!(list[0].color, 0xff0000);
        assert_eq!(list[1].source, DrawSource::Preview(0));
        assert_eq!(r.frames_rendered(), 1);
    }

    #[test]
    fn hidden_mesh_is_not_drawn() {
        let mut r = HeadlessRenderer::default();
        r.create_mesh(e(1), &cube(), None, ShadowFlags::default());
        r.set_mesh_visible(e(1), false);
        r.render();
        assert!(r.draw_list().is_empty());
        assert_eq!(r.mesh_count(), 1);
    }

    #[test]
    fn configure_merges_objects() {
        let mut r = HeadlessRenderer::default();
        r.configure(&serde_json::json!({"background": "#000000"}));
        r.configure(&serde_json::json!({"fog": true}));
        assert_eq!(r.settings().len(), 2);
        r.configure(&serde_json::json!(42));
        assert_eq!(r.settings().len(), 2);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut r = HeadlessRenderer::default();
        r.create_mesh(e(1), &cube(), None, ShadowFlags::default());
        r.dispose();
        r.dispose();
        assert!(r.is_disposed());
        assert_eq!(r.mesh_count(), 0);
        r.create_mesh(e(1), &cube(), None, ShadowFlags::default());
        assert_eq!(r.mesh_count(), 0);
    }

    #[test]
    fn resize_clamps_to_one() {
        let mut r = HeadlessRenderer::default();
        r.resize(0, 300);
        assert_eq!(r.viewport(), (1, 300));
    }
}
