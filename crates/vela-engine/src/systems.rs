//! Per-frame systems.
//!
//! Each fixed step runs [`input_system`], [`physics_system`] and
//! [`transform_system`] in that order; [`render_system`] runs once per
//! rendered frame after all steps. Systems are plain functions over the world
//! and the adapters. The only state that outlives a call is the
//! [`GroundContacts`] table.

use std::collections::{BTreeMap, BTreeSet};

use vela_ecs::entity::EntityId;
use vela_ecs::query::Signature;
use vela_ecs::world::World;

use crate::components::{
    Camera, Collider, InputControl, Light, Mesh, Model, RigidBody, Transform, Velocity,
};
use crate::input::{keys, InputCapture};
use crate::math::Vec3;
use crate::physics::{BodyKind, CollisionEvent, ContactPhase, PhysicsWorld};
use crate::render::{CameraView, SceneRenderer};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Signatures the systems query by, resolved once against a world whose
/// components are registered.
#[derive(Debug, Clone)]
pub struct SystemQueries {
    /// Transform + Collider + RigidBody: entities that own a physics body.
    pub physical: Signature,
    /// InputControl + Velocity.
    pub controlled: Signature,
    /// Transform + Velocity without a RigidBody.
    pub free_movers: Signature,
    /// Transform + Mesh.
    pub meshes: Signature,
    /// Transform + Model.
    pub models: Signature,
    /// Transform + Light.
    pub lights: Signature,
    /// Transform + Camera.
    pub cameras: Signature,
}

impl SystemQueries {
    /// Resolve every signature against `world`'s registry.
    pub fn new(world: &World) -> Self {
        let rigid = world.mask_of::<(RigidBody,)>();
        Self {
            physical: world.signature::<(Transform, Collider, RigidBody)>(),
            controlled: world.signature::<(InputControl, Velocity)>(),
            free_movers: world.signature::<(Transform, Velocity)>().without(rigid),
            meshes: world.signature::<(Transform, Mesh)>(),
            models: world.signature::<(Transform, Model)>(),
            lights: world.signature::<(Transform, Light)>(),
            cameras: world.signature::<(Transform, Camera)>(),
        }
    }
}

// ---------------------------------------------------------------------------
// GroundContacts
// ---------------------------------------------------------------------------

/// Per controlled entity, the entities it is currently touching.
#[derive(Debug, Clone, Default)]
pub struct GroundContacts {
    sets: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl GroundContacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `entity` touches anything.
    pub fn is_grounded(&self, entity: EntityId) -> bool {
        self.sets.get(&entity).is_some_and(|s| !s.is_empty())
    }

    /// Entities `entity` touches, in id order.
    pub fn contacts_of(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.sets.get(&entity).into_iter().flatten().copied()
    }

    pub fn add(&mut self, entity: EntityId, other: EntityId) {
        self.sets.entry(entity).or_default().insert(other);
    }

    pub fn remove(&mut self, entity: EntityId, other: EntityId) {
        if let Some(set) = self.sets.get_mut(&entity) {
            set.remove(&other);
            if set.is_empty() {
                self.sets.remove(&entity);
            }
        }
    }

    /// Forget `entity` as a holder of contacts and as a contact of anyone.
    pub fn purge(&mut self, entity: EntityId) {
        self.sets.remove(&entity);
        self.sets.retain(|_, set| {
            set.remove(&entity);
            !set.is_empty()
        });
    }

    /// Whether `entity` appears anywhere in the table.
    pub fn mentions(&self, entity: EntityId) -> bool {
        self.sets.contains_key(&entity) || self.sets.values().any(|s| s.contains(&entity))
    }

    /// Forget every contact.
    pub fn clear(&mut self) {
        self.sets.clear();
    }

    /// Apply a step's contact transitions. A pair counts when at least one
    /// side carries [`InputControl`] and neither side is a trigger.
    pub fn apply(&mut self, world: &World, physics: &PhysicsWorld, events: &[CollisionEvent]) {
        for event in events {
            let (a, b) = (event.a, event.b);
            let a_ctrl = world.has_component::<InputControl>(a);
            let b_ctrl = world.has_component::<InputControl>(b);
            if !(a_ctrl || b_ctrl) {
                continue;
            }
            match event.phase {
                ContactPhase::Begin => {
                    if physics.is_trigger(a) || physics.is_trigger(b) {
                        continue;
                    }
                    if a_ctrl {
                        self.add(a, b);
                    }
                    if b_ctrl {
                        self.add(b, a);
                    }
                }
                // Ends are applied unconditionally; the other side may be gone.
                ContactPhase::End => {
                    self.remove(a, b);
                    self.remove(b, a);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Turn held keys into horizontal velocity and a pressed jump into vertical
/// velocity. Forward is −Z.
pub fn input_system(
    world: &mut World,
    queries: &SystemQueries,
    input: &InputCapture,
    contacts: &GroundContacts,
) {
    let axis = |neg: &[&str], pos: &[&str]| -> f64 {
        f64::from(u8::from(input.any_down(pos))) - f64::from(u8::from(input.any_down(neg)))
    };
    let direction = Vec3::new(
        axis(keys::LEFT, keys::RIGHT),
        0.0,
        axis(keys::FORWARD, keys::BACKWARD),
    )
    .normalized();
    let jump = input.is_pressed(keys::JUMP);

    let ids: Vec<EntityId> = world.query(&queries.controlled).collect();
    for e in ids {
        let Some(ctrl) = world.get_component::<InputControl>(e).copied() else {
            continue;
        };
        let grounded = contacts.is_grounded(e);
        if let Some(v) = world.get_component_mut::<Velocity>(e) {
            v.linear.x = direction.x * ctrl.move_speed;
            v.linear.z = direction.z * ctrl.move_speed;
            if jump && grounded && ctrl.can_jump {
                v.linear.y = ctrl.jump_force;
                tracing::trace!(entity = %e, vy = ctrl.jump_force, "jump");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Create bodies for entities that gained Transform+Collider+RigidBody and
/// remove bodies of entities that lost one of them.
///
/// Exits are processed before enters so an entity that left and re-entered
/// between two calls ends up with a fresh body.
pub fn sync_bodies(
    world: &mut World,
    queries: &SystemQueries,
    physics: &mut PhysicsWorld,
    contacts: &mut GroundContacts,
) {
    for e in world.query_exited(&queries.physical) {
        if physics.remove_body(e) {
            contacts.purge(e);
        }
    }
    for e in world.query_entered(&queries.physical) {
        let (Some(t), Some(collider), Some(body)) = (
            world.get_component::<Transform>(e),
            world.get_component::<Collider>(e),
            world.get_component::<RigidBody>(e),
        ) else {
            continue;
        };
        let options = body.body_options(collider);
        physics.create_body(e, &collider.shape, t.position, t.rotation, &options);
        if let Some(v) = world.get_component::<Velocity>(e) {
            physics.set_velocity(e, v.linear);
            physics.set_angular_velocity(e, v.angular);
        }
    }
}

/// One physics step: sync bodies, push ECS velocity, step, read back, and
/// update ground contacts. Returns the step's contact transitions.
pub fn physics_system<R: SceneRenderer + ?Sized>(
    world: &mut World,
    queries: &SystemQueries,
    physics: &mut PhysicsWorld,
    renderer: &mut R,
    contacts: &mut GroundContacts,
    dt: f64,
) -> Vec<CollisionEvent> {
    sync_bodies(world, queries, physics, contacts);

    // Gravity stays physics-owned: a controlled dynamic body keeps its own
    // vertical velocity unless the ECS asks for an upward one (a jump).
    let ids: Vec<EntityId> = world.query(&queries.physical).collect();
    for &e in &ids {
        let Some(v) = world.get_component::<Velocity>(e).copied() else {
            continue;
        };
        match physics.body_kind(e) {
            Some(BodyKind::Kinematic) => {
                physics.set_velocity(e, v.linear);
                physics.set_angular_velocity(e, v.angular);
            }
            Some(BodyKind::Dynamic) if world.has_component::<InputControl>(e) => {
                let Some(current) = physics.body_state(e).map(|s| s.linear) else {
                    continue;
                };
                let vy = if v.linear.y > 0.0 { v.linear.y } else { current.y };
                physics.set_velocity(e, Vec3::new(v.linear.x, vy, v.linear.z));
            }
            _ => {}
        }
    }

    let events = physics.step(dt);

    for (e, state) in physics.body_states() {
        let rotation = state.rotation.to_euler();
        let Some(t) = world.get_component_mut::<Transform>(e) else {
            continue;
        };
        t.position = state.position;
        t.rotation = rotation;
        let t = *t;
        if let Some(v) = world.get_component_mut::<Velocity>(e) {
            v.linear = state.linear;
            v.angular = state.angular;
        }
        renderer.update_mesh_transform(e, t.position, t.rotation, render_scale(world, e, &t));
    }

    contacts.apply(world, physics, &events);
    let controlled: Vec<EntityId> = world
        .query(&queries.controlled)
        .collect();
    for e in controlled {
        let grounded = contacts.is_grounded(e);
        if let Some(ctrl) = world.get_component_mut::<InputControl>(e) {
            ctrl.is_grounded = grounded;
        }
    }

    events
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Integrate velocity for entities the physics engine does not own.
pub fn transform_system(world: &mut World, queries: &SystemQueries, dt: f64) {
    let ids: Vec<EntityId> = world.query(&queries.free_movers).collect();
    for e in ids {
        let Some(v) = world.get_component::<Velocity>(e).copied() else {
            continue;
        };
        if let Some(t) = world.get_component_mut::<Transform>(e) {
            t.position += v.linear * dt;
            t.rotation += v.angular * dt;
        }
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// Scale pushed to the renderer: model entities multiply in the model scale.
pub fn render_scale(world: &World, entity: EntityId, transform: &Transform) -> Vec3 {
    match world.get_component::<Model>(entity) {
        Some(m) => Vec3::new(
            transform.scale.x * m.scale,
            transform.scale.y * m.scale,
            transform.scale.z * m.scale,
        ),
        None => transform.scale,
    }
}

/// Push transforms, light positions and the active camera to the renderer.
pub fn render_system<R: SceneRenderer + ?Sized>(
    world: &mut World,
    queries: &SystemQueries,
    renderer: &mut R,
) {
    let drawn: BTreeSet<EntityId> = world
        .query(&queries.meshes)
        .chain(world.query(&queries.models))
        .collect();
    for e in drawn {
        if let Some(t) = world.get_component::<Transform>(e) {
            renderer.update_mesh_transform(e, t.position, t.rotation, render_scale(world, e, t));
        }
    }

    let lights: Vec<EntityId> = world.query(&queries.lights).collect();
    for e in lights {
        if let Some(t) = world.get_component::<Transform>(e) {
            renderer.update_light_position(e, t.position);
        }
    }

    if let Some(view) = update_camera(world, queries) {
        renderer.set_camera(&view);
    }
}

/// Move the first active camera toward its follow target and build the view.
fn update_camera(world: &mut World, queries: &SystemQueries) -> Option<CameraView> {
    let e = world
        .query(&queries.cameras)
        .find(|&e| world.get_component::<Camera>(e).is_some_and(|c| c.active))?;
    let camera = world.get_component::<Camera>(e)?.clone();

    let target = camera
        .follow
        .filter(|&f| world.is_alive(f))
        .and_then(|f| world.get_component::<Transform>(f))
        .map(|t| t.position);

    let t = world.get_component_mut::<Transform>(e)?;
    let look_at = match target {
        Some(target) => {
            let desired = target + camera.offset;
            t.position = t.position.lerp(desired, camera.smoothing.clamp(0.0, 1.0));
            target
        }
        None => camera.look_at,
    };
    Some(CameraView {
        position: t.position,
        target: look_at,
        fov: camera.fov,
        near: camera.near,
        far: camera.far,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
