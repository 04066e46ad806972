//! Scene description format.
//!
//! Content generators and project files describe a scene as JSON: a list of
//! named entities, each with an optional block per component kind. Keys are
//! camelCase; unknown keys are ignored so older runtimes accept newer files.
//!
//! ```json
//! {
//!   "name": "playground",
//!   "settings": { "background": "#87ceeb" },
//!   "entities": [
//!     { "name": "ground",
//!       "components": {
//!         "transform3d": { "x": 0, "y": 0, "z": 0 },
//!         "collider3d": { "shape": "plane" },
//!         "rigidbody3d": { "type": "static" } } },
//!     { "name": "player",
//!       "components": {
//!         "transform3d": { "y": 3 },
//!         "mesh": { "geometry": "capsule", "radius": 0.5, "length": 1 },
//!         "material": { "color": "#3366ff" },
//!         "input3d": { "moveSpeed": 6 },
//!         "velocity3d": {},
//!         "collider3d": { "shape": "capsule", "radius": 0.5, "length": 1 },
//!         "rigidbody3d": { "fixedRotation": true, "material": "player" } },
//!       "tags": ["player"] }
//!   ]
//! }
//! ```

use std::path::Path;

use crate::components::{
    Camera, Collider, Geometry, InputControl, Light, LightKind, Material, Mesh, Model,
    ModelStatus, RigidBody, ShadowFlags, Transform, Velocity,
};
use crate::error::SceneError;
use crate::math::Vec3;
use crate::physics::{BodyKind, BodyShape, PhysicsMaterial};

/// File name of the scene inside a project directory.
pub const PROJECT_SCENE_FILE: &str = "game.json";

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// A whole scene: what [`Game3D::load_spec`](crate::game::Game3D::load_spec)
/// replaces the current scene with.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneDescription {
    /// Display name; informational only.
    pub name: Option<String>,
    /// Renderer settings, passed through untouched.
    pub settings: Option<serde_json::Value>,
    /// Created in order, so a later entity with the same name wins.
    pub entities: Vec<EntityDescription>,
}

/// One entity of a scene.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityDescription {
    /// Lookup key for [`Game3D::entity`](crate::game::Game3D::entity) and
    /// camera follow targets.
    pub name: String,
    pub components: EntityComponents,
    /// Stored as a [`Tags`](crate::components::Tags) component when non-empty.
    pub tags: Vec<String>,
}

/// One optional block per component kind.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityComponents {
    /// Implied at the origin when another spatial block is present.
    pub transform3d: Option<TransformDesc>,
    pub mesh: Option<MeshDesc>,
    /// Applied to the mesh; ignored without one.
    pub material: Option<MaterialDesc>,
    pub light: Option<LightDesc>,
    pub velocity3d: Option<VelocityDesc>,
    pub camera3d: Option<CameraDesc>,
    pub input3d: Option<InputDesc>,
    /// With `rigidbody3d` and a transform, gives the entity a physics body.
    pub collider3d: Option<ColliderDesc>,
    pub rigidbody3d: Option<RigidBodyDesc>,
    pub model3d: Option<ModelDesc>,
}

impl SceneDescription {
    /// Parse a scene from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Parse`] if the text is not a valid scene.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Read `<dir>/game.json`.
///
/// # Errors
///
/// Returns [`SceneError::NotFound`] when the file is missing,
/// [`SceneError::Io`] when it cannot be read and [`SceneError::Parse`] when
/// it is not a valid scene.
pub fn load_project(dir: impl AsRef<Path>) -> Result<SceneDescription, SceneError> {
    let path = dir.as_ref().join(PROJECT_SCENE_FILE);
    let text = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SceneError::NotFound { path: path.clone() }
        } else {
            SceneError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;
    let scene = SceneDescription::from_json(&text)?;
    tracing::info!(
        path = %path.display(),
        entities = scene.entities.len(),
        "project scene read"
    );
    Ok(scene)
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// A `0xRRGGBB` color written as `"#rrggbb"` or as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ColorRepr", into = "u32")]
pub struct Color(pub u32);

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Int(u32),
    Text(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        let raw = match repr {
            ColorRepr::Int(v) => v,
            ColorRepr::Text(s) => {
                let hex = s
                    .strip_prefix('#')
                    .or_else(|| s.strip_prefix("0x"))
                    .ok_or_else(|| format!("color '{s}' must start with '#' or '0x'"))?;
                if hex.len() != 6 {
                    return Err(format!("color '{s}' must have six hex digits"));
                }
                u32::from_str_radix(hex, 16).map_err(|e| format!("color '{s}': {e}"))?
            }
        };
        if raw > 0xff_ffff {
            return Err(format!("color {raw:#x} exceeds 0xffffff"));
        }
        Ok(Self(raw))
    }
}

impl From<Color> for u32 {
    fn from(c: Color) -> u32 {
        c.0
    }
}

// ---------------------------------------------------------------------------
// Component blocks
// ---------------------------------------------------------------------------

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

/// `transform3d` block. Every key is flat; missing scale keys are `1`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformDesc {
    /// Position.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Euler angles in radians.
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_z: f64,
    /// Per-axis scale.
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
}

impl Default for TransformDesc {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_z: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
        }
    }
}

impl TransformDesc {
    /// The [`Transform`] this block describes.
    pub fn to_component(&self) -> Transform {
        Transform {
            position: Vec3::new(self.x, self.y, self.z),
            rotation: Vec3::new(self.rotation_x, self.rotation_y, self.rotation_z),
            scale: Vec3::new(self.scale_x, self.scale_y, self.scale_z),
        }
    }
}

/// Shape kind plus every dimension any kind uses; missing dimensions take
/// per-kind defaults.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dimensions {
    /// Box and plane X extent.
    pub width: Option<f64>,
    /// Box, cylinder and cone Y extent; plane Z extent.
    pub height: Option<f64>,
    /// Box Z extent.
    pub depth: Option<f64>,
    /// Sphere, cylinder, capsule and cone radius.
    pub radius: Option<f64>,
    /// Capsule length between the caps.
    pub length: Option<f64>,
}

impl Dimensions {
    fn geometry(&self, kind: &str) -> Geometry {
        let w = self.width.unwrap_or(1.0);
        let h = self.height.unwrap_or(1.0);
        let r = self.radius.unwrap_or(0.5);
        match kind {
            "sphere" => Geometry::Sphere { radius: r },
            "cylinder" => Geometry::Cylinder { radius: r, height: h },
            "capsule" => Geometry::Capsule {
                radius: r,
                length: self.length.unwrap_or(1.0),
            },
            "cone" => Geometry::Cone { radius: r, height: h },
            "plane" => Geometry::Plane {
                width: self.width.unwrap_or(10.0),
                height: self.height.unwrap_or(10.0),
            },
            "box" => Geometry::Box {
                width: w,
                height: h,
                depth: self.depth.unwrap_or(1.0),
            },
            other => {
                tracing::warn!(geometry = other, "unknown geometry; using a unit box");
                Geometry::Box {
                    width: 1.0,
                    height: 1.0,
                    depth: 1.0,
                }
            }
        }
    }
}

/// `mesh` block. Dimension keys sit beside `geometry`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshDesc {
    /// `box`, `sphere`, `cylinder`, `capsule`, `cone` or `plane`. Anything
    /// else becomes a unit box with a warning.
    pub geometry: String,
    #[serde(flatten)]
    pub dimensions: Dimensions,
    #[serde(default = "yes")]
    pub cast_shadow: bool,
    #[serde(default = "yes")]
    pub receive_shadow: bool,
    #[serde(default = "yes")]
    pub visible: bool,
}

impl Default for MeshDesc {
    fn default() -> Self {
        Self {
            geometry: "box".to_owned(),
            dimensions: Dimensions::default(),
            cast_shadow: true,
            receive_shadow: true,
            visible: true,
        }
    }
}

impl MeshDesc {
    /// Resolve the geometry kind and dimensions into a [`Mesh`].
    pub fn to_component(&self) -> Mesh {
        Mesh {
            geometry: self.dimensions.geometry(&self.geometry),
            shadows: ShadowFlags {
                cast: self.cast_shadow,
                receive: self.receive_shadow,
            },
            visible: self.visible,
        }
    }
}

/// `material` block.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialDesc {
    pub color: Color,
    pub metalness: f64,
    pub roughness: f64,
    /// Clamped to `[0, 1]` on conversion.
    #[serde(default = "one")]
    pub opacity: f64,
    pub emissive: Color,
    pub emissive_intensity: f64,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        let m = Material::default();
        Self {
            color: Color(m.color),
            metalness: m.metalness,
            roughness: m.roughness,
            opacity: m.opacity,
            emissive: Color(m.emissive),
            emissive_intensity: m.emissive_intensity,
        }
    }
}

impl MaterialDesc {
    /// The [`Material`] this block describes.
    pub fn to_component(&self) -> Material {
        Material {
            color: self.color.0,
            metalness: self.metalness,
            roughness: self.roughness,
            opacity: self.opacity.clamp(0.0, 1.0),
            emissive: self.emissive.0,
            emissive_intensity: self.emissive_intensity,
        }
    }
}

/// `light` block. The kind is spelled `type`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightDesc {
    #[serde(rename = "type")]
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f64,
    pub cast_shadow: bool,
    pub target: Vec3,
    pub distance: f64,
    pub decay: f64,
    pub angle: f64,
    pub penumbra: f64,
}

impl Default for LightDesc {
    fn default() -> Self {
        let l = Light::default();
        Self {
            kind: l.kind,
            color: Color(l.color),
            intensity: l.intensity,
            cast_shadow: l.cast_shadow,
            target: l.target,
            distance: l.distance,
            decay: l.decay,
            angle: l.angle,
            penumbra: l.penumbra,
        }
    }
}

impl LightDesc {
    /// The [`Light`] this block describes.
    pub fn to_component(&self) -> Light {
        Light {
            kind: self.kind,
            color: self.color.0,
            intensity: self.intensity,
            cast_shadow: self.cast_shadow,
            target: self.target,
            distance: self.distance,
            decay: self.decay,
            angle: self.angle,
            penumbra: self.penumbra,
        }
    }
}

/// `velocity3d` block: initial velocity.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VelocityDesc {
    /// Linear velocity.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Angular velocity in radians per second.
    pub angular_x: f64,
    pub angular_y: f64,
    pub angular_z: f64,
}

impl VelocityDesc {
    /// The [`Velocity`] this block describes.
    pub fn to_component(&self) -> Velocity {
        Velocity {
            linear: Vec3::new(self.x, self.y, self.z),
            angular: Vec3::new(self.angular_x, self.angular_y, self.angular_z),
        }
    }
}

/// `camera3d` block.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraDesc {
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub active: bool,
    /// Name of the entity to follow.
    pub follow: Option<String>,
    pub offset: Vec3,
    pub smoothing: f64,
    pub look_at: Vec3,
}

impl Default for CameraDesc {
    fn default() -> Self {
        let c = Camera::default();
        Self {
            fov: c.fov,
            near: c.near,
            far: c.far,
            active: c.active,
            follow: None,
            offset: c.offset,
            smoothing: c.smoothing,
            look_at: c.look_at,
        }
    }
}

impl CameraDesc {
    /// The follow target is left unresolved; names are bound by the game.
    pub fn to_component(&self) -> Camera {
        Camera {
            fov: self.fov,
            near: self.near,
            far: self.far,
            active: self.active,
            follow: None,
            offset: self.offset,
            smoothing: self.smoothing,
            look_at: self.look_at,
        }
    }
}

/// `input3d` block: marks the entity as player controlled.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputDesc {
    pub move_speed: f64,
    pub jump_force: f64,
    pub can_jump: bool,
}

impl Default for InputDesc {
    fn default() -> Self {
        let i = InputControl::default();
        Self {
            move_speed: i.move_speed,
            jump_force: i.jump_force,
            can_jump: i.can_jump,
        }
    }
}

impl InputDesc {
    /// The [`InputControl`] this block describes, not yet grounded.
    pub fn to_component(&self) -> InputControl {
        InputControl {
            move_speed: self.move_speed,
            jump_force: self.jump_force,
            is_grounded: false,
            can_jump: self.can_jump,
        }
    }
}

/// `collider3d` block.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderDesc {
    /// Shape kind; when absent the mesh geometry is used.
    pub shape: Option<String>,
    #[serde(flatten)]
    pub dimensions: Dimensions,
    /// Kilograms.
    pub mass: f64,
    pub friction: f64,
    pub restitution: f64,
    /// Sensor collider.
    pub is_trigger: bool,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        let c = Collider::default();
        Self {
            shape: None,
            dimensions: Dimensions::default(),
            mass: c.mass,
            friction: c.friction,
            restitution: c.restitution,
            is_trigger: c.is_trigger,
        }
    }
}

impl ColliderDesc {
    /// Build the collider, falling back to the mesh geometry for its shape.
    pub fn to_component(&self, mesh: Option<&Mesh>) -> Collider {
        let shape = match (self.shape.as_deref(), mesh) {
            (Some("plane"), _) => BodyShape::Plane,
            (Some(kind), _) => shape_of(&self.dimensions.geometry(kind)),
            (None, Some(mesh)) => shape_of(&mesh.geometry),
            (None, None) => shape_of(&self.dimensions.geometry("box")),
        };
        Collider {
            shape,
            mass: self.mass,
            friction: self.friction,
            restitution: self.restitution,
            is_trigger: self.is_trigger,
        }
    }
}

/// Closest collision shape for a render geometry. Cones collide as cylinders
/// and finite planes as the infinite ground plane.
fn shape_of(geometry: &Geometry) -> BodyShape {
    match *geometry {
        Geometry::Box {
            width,
            height,
            depth,
        } => BodyShape::Box {
            width,
            height,
            depth,
        },
        Geometry::Sphere { radius } => BodyShape::Sphere { radius },
        Geometry::Cylinder { radius, height } | Geometry::Cone { radius, height } => {
            BodyShape::Cylinder { radius, height }
        }
        Geometry::Capsule { radius, length } => BodyShape::Capsule { radius, length },
        Geometry::Plane { .. } => BodyShape::Plane,
    }
}

/// `rigidbody3d` block. The body kind is spelled `type`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RigidBodyDesc {
    /// `dynamic`, `static` or `kinematic`.
    #[serde(rename = "type")]
    pub kind: BodyKind,
    pub linear_damping: f64,
    pub angular_damping: f64,
    pub fixed_rotation: bool,
    /// Preset name such as `ground`, `player`, `ice` or `bouncy`.
    pub material: Option<PhysicsMaterial>,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        let r = RigidBody::default();
        Self {
            kind: r.kind,
            linear_damping: r.linear_damping,
            angular_damping: r.angular_damping,
            fixed_rotation: r.fixed_rotation,
            material: r.material,
        }
    }
}

impl RigidBodyDesc {
    /// The [`RigidBody`] this block describes.
    pub fn to_component(&self) -> RigidBody {
        RigidBody {
            kind: self.kind,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            fixed_rotation: self.fixed_rotation,
            material: self.material,
        }
    }
}

/// `model3d` block: an external asset loaded in the background.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelDesc {
    /// Resolved by the renderer's model source.
    pub url: String,
    /// Uniform scale.
    pub scale: f64,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for ModelDesc {
    fn default() -> Self {
        Self {
            url: String::new(),
            scale: 1.0,
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

impl ModelDesc {
    /// A [`Model`] in the `Loading` state.
    pub fn to_component(&self) -> Model {
        Model {
            url: self.url.clone(),
            scale: self.scale,
            shadows: ShadowFlags {
                cast: self.cast_shadow,
                receive: self.receive_shadow,
            },
            status: ModelStatus::Loading,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
