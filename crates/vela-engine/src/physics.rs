//! rapier3d integration keyed by entity id.
//!
//! [`PhysicsWorld`] owns a rapier3d simulation and a table mapping each
//! [`EntityId`] to its rigid body and collider. It knows nothing about the ECS:
//! the physics system decides when bodies are created or removed and copies
//! state across in both directions.
//!
//! Contact transitions are batched. [`PhysicsWorld::step`] returns every
//! begin/end of the step as a sorted list, so no caller can mutate the world
//! while contacts are being reported. Removing a body mid-contact synthesizes
//! the matching end events; they are returned first by the next step.
//!
//! # Determinism
//!
//! rapier3d is compiled with `enhanced-determinism`. With a fixed timestep and
//! the sorted event list the simulation replays identically on one platform.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rapier3d::geometry::CollisionEvent as RapierCollisionEvent;
use rapier3d::na::{Isometry3, Translation3};
use rapier3d::prelude::*;
use vela_ecs::entity::EntityId;

use crate::math::{Quat, Vec3};

/// Default gravity, metres per second squared.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.82, 0.0);

// ---------------------------------------------------------------------------
// Body descriptors
// ---------------------------------------------------------------------------

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// Fully simulated.
    #[default]
    Dynamic,
    /// Immovable.
    Static,
    /// Moved by game logic through its velocity.
    Kinematic,
}

/// Collision geometry. Dimensions are full extents, not half extents.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BodyShape {
    /// Axis-aligned in the body frame.
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    /// Y-aligned capsule; `length` is the cylindrical part between the caps.
    Capsule { radius: f64, length: f64 },
    /// Y-aligned cylinder.
    Cylinder { radius: f64, height: f64 },
    /// Infinite ground plane through the body position with a +Y normal.
    Plane,
}

impl Default for BodyShape {
    fn default() -> Self {
        Self::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

/// Friction/restitution presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsMaterial {
    /// `(0.3, 0.3)`.
    Default,
    /// Slightly grippier than the default.
    Ground,
    /// No friction, so a character does not stick to walls.
    Player,
    /// Nearly frictionless.
    Ice,
    /// Restitution `0.9`.
    Bouncy,
}

impl PhysicsMaterial {
    /// `(friction, restitution)` for this preset.
    pub fn coefficients(self) -> (f64, f64) {
        match self {
            Self::Default => (0.3, 0.3),
            Self::Ground => (0.4, 0.3),
            Self::Player => (0.0, 0.0),
            Self::Ice => (0.05, 0.1),
            Self::Bouncy => (0.3, 0.9),
        }
    }
}

/// Everything about a body except its shape and initial pose.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyOptions {
    /// Ignored for [`BodyShape::Plane`], which is always static.
    pub kind: BodyKind,
    /// Collider mass in kilograms. Non-positive values keep rapier's
    /// density-derived mass.
    pub mass: f64,
    /// Linear damping coefficient; `0` keeps velocity forever.
    pub linear_damping: f64,
    /// Angular damping coefficient.
    pub angular_damping: f64,
    /// Lock all three rotation axes.
    pub fixed_rotation: bool,
    /// Sensor collider: reports contacts but exerts no force.
    pub is_trigger: bool,
    pub friction: f64,
    pub restitution: f64,
    /// Overrides `friction` and `restitution` when set.
    pub material: Option<PhysicsMaterial>,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass: 1.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
            fixed_rotation: false,
            is_trigger: false,
            friction: 0.3,
            restitution: 0.3,
            material: None,
        }
    }
}

impl BodyOptions {
    fn friction_restitution(&self) -> (f64, f64) {
        self.material
            .map(PhysicsMaterial::coefficients)
            .unwrap_or((self.friction, self.restitution))
    }
}

/// Snapshot of one body after a step.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    /// Center of the body in world space.
    pub position: Vec3,
    pub rotation: Quat,
    /// Linear velocity, units per second.
    pub linear: Vec3,
    /// Angular velocity, radians per second.
    pub angular: Vec3,
    pub kind: BodyKind,
}

// ---------------------------------------------------------------------------
// Collision events
// ---------------------------------------------------------------------------

/// Whether a contact pair started or stopped touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContactPhase {
    /// The pair started touching.
    Begin,
    /// The pair stopped touching, or one side was removed.
    End,
}

/// A contact transition between two bodies. `a < b` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionEvent {
    /// Lower id of the pair.
    pub a: EntityId,
    /// Higher id of the pair.
    pub b: EntityId,
    pub phase: ContactPhase,
}

impl CollisionEvent {
    fn new(x: EntityId, y: EntityId, phase: ContactPhase) -> Self {
        Self {
            a: x.min(y),
            b: x.max(y),
            phase,
        }
    }

    /// The other side of the pair, if `entity` is one side.
    pub fn other(&self, entity: EntityId) -> Option<EntityId> {
        if self.a == entity {
            Some(self.b)
        } else if self.b == entity {
            Some(self.a)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

struct BodyEntry {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    kind: BodyKind,
    is_trigger: bool,
}

/// Owns the rapier3d simulation and the entity ↔ handle tables.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Ordered so `body_states` is deterministic without sorting.
    bodies: BTreeMap<EntityId, BodyEntry>,
    collider_to_entity: HashMap<ColliderHandle, EntityId>,
    /// Pairs currently touching, stored as `(min, max)`.
    contacts: BTreeSet<(EntityId, EntityId)>,
    /// End events synthesized by `remove_body`, flushed by the next step.
    pending_events: Vec<CollisionEvent>,
    /// Bodies with a one-step force applied.
    forced: Vec<RigidBodyHandle>,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("body_count", &self.bodies.len())
            .field("contacts", &self.contacts.len())
            .finish()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl PhysicsWorld {
    /// An empty world with the given gravity.
    pub fn new(gravity: Vec3) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: gravity.to_rapier(),
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: BTreeMap::new(),
            collider_to_entity: HashMap::new(),
            contacts: BTreeSet::new(),
            pending_events: Vec::new(),
            forced: Vec::new(),
        }
    }

    /// Gravity applied to dynamic bodies.
    pub fn gravity(&self) -> Vec3 {
        Vec3::from_rapier(&self.gravity)
    }

    /// Create a body and its collider for `entity`.
    ///
    /// Creating a body for an id that already has one is a no-op. A plane is
    /// always static regardless of `options.kind`.
    pub fn create_body(
        &mut self,
        entity: EntityId,
        shape: &BodyShape,
        position: Vec3,
        rotation: Vec3,
        options: &BodyOptions,
    ) {
        if self.bodies.contains_key(&entity) {
            return;
        }

        let kind = match shape {
            BodyShape::Plane => BodyKind::Static,
            _ => options.kind,
        };
        let pose = Isometry3::from_parts(
            Translation3::from(position.to_rapier()),
            Quat::from_euler(rotation).to_rapier(),
        );
        let mut builder = match kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
        }
        .position(pose)
        .linear_damping(options.linear_damping as Real)
        .angular_damping(options.angular_damping as Real);
        if options.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let body = self.rigid_body_set.insert(builder.build());

        let (friction, restitution) = options.friction_restitution();
        let mut collider = ColliderBuilder::new(shared_shape(shape))
            .friction(friction as Real)
            .restitution(restitution as Real)
            .sensor(options.is_trigger)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(
                ActiveCollisionTypes::default()
                    | ActiveCollisionTypes::KINEMATIC_FIXED
                    | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
            );
        if kind == BodyKind::Dynamic && options.mass > 0.0 {
            collider = collider.mass(options.mass as Real);
        }
        let collider =
            self.collider_set
                .insert_with_parent(collider.build(), body, &mut self.rigid_body_set);

        self.collider_to_entity.insert(collider, entity);
        self.bodies.insert(
            entity,
            BodyEntry {
                body,
                collider,
                kind,
                is_trigger: options.is_trigger,
            },
        );
        tracing::debug!(entity = %entity, ?kind, "physics body created");
    }

    /// Remove the body for `entity`. Returns `false` if it had none.
    ///
    /// Every contact the body was part of produces an end event, delivered at
    /// the front of the next [`step`](Self::step).
    pub fn remove_body(&mut self, entity: EntityId) -> bool {
        let Some(entry) = self.bodies.remove(&entity) else {
            return false;
        };
        self.collider_to_entity.remove(&entry.collider);
        self.forced.retain(|h| *h != entry.body);
        self.rigid_body_set.remove(
            entry.body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );

        let broken: Vec<(EntityId, EntityId)> = self
            .contacts
            .iter()
            .filter(|(a, b)| *a == entity || *b == entity)
            .copied()
            .collect();
        for pair in broken {
            self.contacts.remove(&pair);
            self.pending_events
                .push(CollisionEvent::new(pair.0, pair.1, ContactPhase::End));
        }
        tracing::debug!(entity = %entity, "physics body removed");
        true
    }

    /// Whether `entity` has a body.
    pub fn has_body(&self, entity: EntityId) -> bool {
        self.bodies.contains_key(&entity)
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the body of `entity` is a sensor. `false` for unknown ids.
    pub fn is_trigger(&self, entity: EntityId) -> bool {
        self.bodies.get(&entity).is_some_and(|e| e.is_trigger)
    }

    /// The kind the body was created with, after the plane override.
    pub fn body_kind(&self, entity: EntityId) -> Option<BodyKind> {
        self.bodies.get(&entity).map(|e| e.kind)
    }

    /// Whether `a` and `b` are currently touching.
    pub fn in_contact(&self, a: EntityId, b: EntityId) -> bool {
        self.contacts.contains(&(a.min(b), a.max(b)))
    }

    fn body_mut(&mut self, entity: EntityId) -> Option<&mut RigidBody> {
        let handle = self.bodies.get(&entity)?.body;
        self.rigid_body_set.get_mut(handle)
    }

    /// Overwrite the linear velocity. Unknown ids are ignored.
    pub fn set_velocity(&mut self, entity: EntityId, linear: Vec3) {
        if let Some(rb) = self.body_mut(entity) {
            rb.set_linvel(linear.to_rapier(), true);
        }
    }

    /// Overwrite the angular velocity. Unknown ids are ignored.
    pub fn set_angular_velocity(&mut self, entity: EntityId, angular: Vec3) {
        if let Some(rb) = self.body_mut(entity) {
            rb.set_angvel(angular.to_rapier(), true);
        }
    }

    /// Apply a force for the next step only.
    pub fn apply_force(&mut self, entity: EntityId, force: Vec3) {
        let Some(handle) = self.bodies.get(&entity).map(|e| e.body) else {
            return;
        };
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.add_force(force.to_rapier(), true);
            if !self.forced.contains(&handle) {
                self.forced.push(handle);
            }
        }
    }

    /// Instant change of momentum at the center of mass.
    pub fn apply_impulse(&mut self, entity: EntityId, impulse: Vec3) {
        if let Some(rb) = self.body_mut(entity) {
            rb.apply_impulse(impulse.to_rapier(), true);
        }
    }

    /// Teleport a body. Velocity is kept.
    pub fn set_position(&mut self, entity: EntityId, position: Vec3) {
        if let Some(rb) = self.body_mut(entity) {
            rb.set_translation(position.to_rapier(), true);
        }
    }

    /// Advance the simulation by exactly `dt` seconds.
    ///
    /// Returns the contact transitions of this step, preceded by any end
    /// events synthesized by [`remove_body`](Self::remove_body) since the
    /// previous step. Each group is sorted by pair; a pair's begin precedes
    /// its end.
    pub fn step(&mut self, dt: f64) -> Vec<CollisionEvent> {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier3d::crossbeam::channel::unbounded::<RapierCollisionEvent>();
        let (force_send, _force_recv) =
            rapier3d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        for handle in self.forced.drain(..) {
            if let Some(rb) = self.rigid_body_set.get_mut(handle) {
                rb.reset_forces(false);
            }
        }

        let mut events = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            let (h1, h2, phase) = match event {
                RapierCollisionEvent::Started(h1, h2, _) => (h1, h2, ContactPhase::Begin),
                RapierCollisionEvent::Stopped(h1, h2, _) => (h1, h2, ContactPhase::End),
            };
            let (Some(&x), Some(&y)) = (
                self.collider_to_entity.get(&h1),
                self.collider_to_entity.get(&h2),
            ) else {
                continue;
            };
            let event = CollisionEvent::new(x, y, phase);
            // Keep the transition only if it changes the touching set, so a
            // begin is never reported twice and an end never precedes a begin.
            let changed = match phase {
                ContactPhase::Begin => self.contacts.insert((event.a, event.b)),
                ContactPhase::End => self.contacts.remove(&(event.a, event.b)),
            };
            if changed {
                events.push(event);
            }
        }
        // Channel delivery order is not part of rapier's contract; stable sort
        // by pair keeps per-pair order.
        events.sort_by_key(|e| (e.a, e.b));

        let mut out = std::mem::take(&mut self.pending_events);
        out.sort_by_key(|e| (e.a, e.b));
        out.extend(events);
        out
    }

    /// Pose and velocity of `entity`'s body.
    pub fn body_state(&self, entity: EntityId) -> Option<BodyState> {
        let entry = self.bodies.get(&entity)?;
        let rb = self.rigid_body_set.get(entry.body)?;
        Some(BodyState {
            position: Vec3::from_rapier(rb.translation()),
            rotation: Quat::from_rapier(rb.rotation()),
            linear: Vec3::from_rapier(rb.linvel()),
            angular: Vec3::from_rapier(rb.angvel()),
            kind: entry.kind,
        })
    }

    /// State of every live body in ascending entity order.
    pub fn body_states(&self) -> Vec<(EntityId, BodyState)> {
        self.bodies
            .keys()
            .filter_map(|&e| self.body_state(e).map(|s| (e, s)))
            .collect()
    }

    /// Drop every body at once. No end events are produced.
    pub fn clear(&mut self) {
        let gravity = Vec3::from_rapier(&self.gravity);
        let count = self.bodies.len();
        *self = Self::new(gravity);
        tracing::debug!(count, "physics world cleared");
    }
}

fn shared_shape(shape: &BodyShape) -> SharedShape {
    match *shape {
        BodyShape::Box {
            width,
            height,
            depth,
        } => SharedShape::cuboid(
            (width / 2.0) as Real,
            (height / 2.0) as Real,
            (depth / 2.0) as Real,
        ),
        BodyShape::Sphere { radius } => SharedShape::ball(radius as Real),
        BodyShape::Capsule { radius, length } => {
            SharedShape::capsule_y((length / 2.0) as Real, radius as Real)
        }
        BodyShape::Cylinder { radius, height } => {
            SharedShape::cylinder((height / 2.0) as Real, radius as Real)
        }
        BodyShape::Plane => SharedShape::halfspace(Vector::y_axis()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
