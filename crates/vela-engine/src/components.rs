//! Component records attached to entities.
//!
//! Every record is plain data. Systems query the world by the presence of
//! these types; [`register_components`] registers all of them under stable
//! names.

use vela_ecs::entity::EntityId;
use vela_ecs::world::World;

use crate::math::Vec3;
use crate::physics::{BodyKind, BodyOptions, BodyShape, PhysicsMaterial};

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// Position, XYZ Euler rotation in radians, and scale.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    /// World-space position.
    pub position: Vec3,
    /// XYZ Euler angles in radians.
    pub rotation: Vec3,
    /// Per-axis scale; `(1, 1, 1)` is unscaled.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Unrotated, unscaled transform at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Linear velocity in units per second and angular velocity in radians per
/// second.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Velocity {
    /// Units per second.
    pub linear: Vec3,
    /// Radians per second about each axis.
    pub angular: Vec3,
}

// ---------------------------------------------------------------------------
// Visual
// ---------------------------------------------------------------------------

/// Primitive mesh geometry. Dimensions are full extents.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    /// Axis-aligned box.
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    /// Y-aligned cylinder.
    Cylinder { radius: f64, height: f64 },
    /// Y-aligned capsule; `length` excludes the caps.
    Capsule { radius: f64, length: f64 },
    /// Y-aligned cone, apex up.
    Cone { radius: f64, height: f64 },
    /// Flat quad on the XZ plane; `height` spans Z.
    Plane { width: f64, height: f64 },
}

impl Geometry {
    /// Footprint on the XZ plane, used by the top-down debug view.
    pub fn footprint(&self) -> (f64, f64) {
        match *self {
            Self::Box { width, depth, .. } => (width, depth),
            Self::Sphere { radius }
            | Self::Cylinder { radius, .. }
            | Self::Capsule { radius, .. }
            | Self::Cone { radius, .. } => (radius * 2.0, radius * 2.0),
            Self::Plane { width, height } => (width, height),
        }
    }
}

/// Shadow participation of a mesh or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShadowFlags {
    /// Occludes light for other surfaces.
    pub cast: bool,
    /// Shows shadows cast onto it.
    pub receive: bool,
}

impl Default for ShadowFlags {
    fn default() -> Self {
        Self {
            cast: true,
            receive: true,
        }
    }
}

/// A primitive render mesh. Its node follows the entity's [`Transform`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    pub geometry: Geometry,
    pub shadows: ShadowFlags,
    /// Hidden meshes keep their node but are left out of the draw list.
    pub visible: bool,
}

/// Surface parameters. Colors are `0xRRGGBB`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    /// Base color.
    pub color: u32,
    /// `0` dielectric, `1` metal.
    pub metalness: f64,
    /// `0` mirror, `1` fully diffuse.
    pub roughness: f64,
    /// Clamped to `[0, 1]`; below `1` the surface is transparent.
    pub opacity: f64,
    /// Self-illumination color.
    pub emissive: u32,
    pub emissive_intensity: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: 0x808080,
            metalness: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            emissive: 0x000000,
            emissive_intensity: 0.0,
        }
    }
}

/// Which kind of light source a [`Light`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    /// Uniform fill; position is ignored.
    Ambient,
    /// Parallel rays from `position` toward `target`.
    #[default]
    Directional,
    /// Omnidirectional from `position`.
    Point,
    /// Cone from `position` toward `target`.
    Spot,
    /// Sky/ground gradient fill.
    Hemisphere,
}

/// A light source placed at the entity's position.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Light {
    pub kind: LightKind,
    /// `0xRRGGBB`.
    pub color: u32,
    pub intensity: f64,
    pub cast_shadow: bool,
    /// Point a directional or spot light aims at.
    pub target: Vec3,
    /// Falloff range for point/spot lights; `0` means unlimited.
    pub distance: f64,
    /// Falloff exponent over `distance`.
    pub decay: f64,
    /// Spot cone half-angle in radians.
    pub angle: f64,
    /// Fraction of the spot cone that is soft-edged, in `[0, 1]`.
    pub penumbra: f64,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            color: 0xffffff,
            intensity: 1.0,
            cast_shadow: false,
            target: Vec3::ZERO,
            distance: 0.0,
            decay: 2.0,
            angle: std::f64::consts::FRAC_PI_3,
            penumbra: 0.0,
        }
    }
}

/// Perspective camera, optionally following another entity.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f64,
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
    /// The first active camera found in id order drives the view.
    pub active: bool,
    /// Entity tracked by the camera. Resolved from a name when the scene is
    /// loaded; a target that is later removed leaves the camera in place.
    pub follow: Option<EntityId>,
    /// Offset from the followed entity's position.
    pub offset: Vec3,
    /// Fraction of the remaining distance covered per render frame, in `(0, 1]`.
    pub smoothing: f64,
    /// Where the camera looks when it follows nothing.
    pub look_at: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            active: true,
            follow: None,
            offset: Vec3::new(0.0, 5.0, 10.0),
            smoothing: 0.1,
            look_at: Vec3::ZERO,
        }
    }
}

/// Progress of a [`Model`] load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Queued with the renderer.
    #[default]
    Loading,
    /// Attached to the scene graph.
    Loaded,
    /// The load failed; the entity lives on without a render node.
    Failed,
}

/// An externally loaded model. The render handle appears once the load
/// completes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    /// Asset location, resolved by the renderer's model source.
    pub url: String,
    /// Uniform scale, multiplied with the transform's.
    pub scale: f64,
    pub shadows: ShadowFlags,
    pub status: ModelStatus,
}

// ---------------------------------------------------------------------------
// Control and physics
// ---------------------------------------------------------------------------

/// Player-controlled movement parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputControl {
    /// Horizontal speed while a movement key is held, units per second.
    pub move_speed: f64,
    /// Vertical velocity set by a jump, units per second.
    pub jump_force: f64,
    /// Mirrored from the ground-contact table every step.
    pub is_grounded: bool,
    /// Jumping is disabled when `false`.
    pub can_jump: bool,
}

impl Default for InputControl {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_force: 8.0,
            is_grounded: false,
            can_jump: true,
        }
    }
}

/// Collision shape and surface response. Together with a [`RigidBody`] and a
/// [`Transform`] it gives the entity a physics body.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Collider {
    pub shape: BodyShape,
    /// Kilograms; non-positive keeps the density-derived mass.
    pub mass: f64,
    pub friction: f64,
    /// Bounciness, `0` to `1`.
    pub restitution: f64,
    /// Sensor: reports contacts without pushing back.
    pub is_trigger: bool,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: BodyShape::default(),
            mass: 1.0,
            friction: 0.3,
            restitution: 0.3,
            is_trigger: false,
        }
    }
}

/// How the solver moves the entity's body.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RigidBody {
    pub kind: BodyKind,
    pub linear_damping: f64,
    pub angular_damping: f64,
    /// Lock all rotation, as a character controller wants.
    pub fixed_rotation: bool,
    /// Preset that overrides the collider's friction and restitution.
    pub material: Option<PhysicsMaterial>,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            linear_damping: 0.01,
            angular_damping: 0.01,
            fixed_rotation: false,
            material: None,
        }
    }
}

impl RigidBody {
    /// Combine with the collider into the options the physics adapter takes.
    pub fn body_options(&self, collider: &Collider) -> BodyOptions {
        BodyOptions {
            kind: self.kind,
            mass: collider.mass,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            fixed_rotation: self.fixed_rotation,
            is_trigger: collider.is_trigger,
            friction: collider.friction,
            restitution: collider.restitution,
            material: self.material,
        }
    }
}

/// Free-form labels from the scene description.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Tags(pub Vec<String>);

impl Tags {
    /// Whether `tag` is one of the labels.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register every runtime component kind with `world`. Idempotent.
pub fn register_components(world: &mut World) {
    world.register_component::<Transform>("transform3d");
    world.register_component::<Velocity>("velocity3d");
    world.register_component::<Mesh>("mesh");
    world.register_component::<Material>("material");
    world.register_component::<Light>("light");
    world.register_component::<Camera>("camera3d");
    world.register_component::<Model>("model3d");
    world.register_component::<InputControl>("input3d");
    world.register_component::<Collider>("collider3d");
    world.register_component::<RigidBody>("rigidbody3d");
    world.register_component::<Tags>("tags");
}
