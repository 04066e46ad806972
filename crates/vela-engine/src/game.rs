//! The scene orchestrator.
//!
//! [`Game3D`] owns the component world, the physics world, the renderer and
//! the input capture, and is the only place entities are created or
//! destroyed. Every entity exists in all three stores or in none of them.
//!
//! Time advances with a fixed-step accumulator: each animation frame adds its
//! delta and drains whole steps, so physics never sees a partial step.
//!
//! ```
//! use vela_engine::prelude::*;
//!
//! let mut game = Game3D::new(GameConfig::headless());
//! game.load_spec_json(r#"{
//!     "entities": [
//!         { "name": "crate",
//!           "components": {
//!             "transform3d": { "x": 1, "y": 2, "z": 3 },
//!             "mesh": { "geometry": "box" } } }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(game.renderer().mesh_count(), 1);
//! assert!(game.remove_entity("crate"));
//! assert_eq!(game.renderer().mesh_count(), 0);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use vela_ecs::entity::EntityId;
use vela_ecs::world::World;

use crate::components::{
    register_components, Camera, Light, Mesh, Model, ModelStatus, Tags, Transform,
};
use crate::config::GameConfig;
use crate::error::{EngineError, RenderError};
use crate::input::InputCapture;
use crate::math::Vec3;
use crate::physics::{CollisionEvent, PhysicsWorld};
use crate::render::{HeadlessRenderer, ModelLoadOutcome, ModelOptions, SceneRenderer};
use crate::scene::{self, EntityComponents, SceneDescription};
use crate::systems::{self, GroundContacts, SystemQueries};

/// Slack when comparing the accumulator against a whole step, so deltas that
/// sum to N steps in exact arithmetic drain exactly N steps in floating point.
const STEP_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// GameState / FrameReport
// ---------------------------------------------------------------------------

/// Lifecycle of a [`Game3D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    /// Frames are ignored; the scene can still be edited.
    #[default]
    Stopped,
    /// Frames advance the simulation and render.
    Running,
    /// Everything released. Terminal.
    Disposed,
}

/// What one call to [`Game3D::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// Fixed steps executed.
    pub steps: u32,
    /// Seconds discarded because the frame hit `max_steps_per_frame`.
    pub dropped_time: f64,
}

// ---------------------------------------------------------------------------
// Game3D
// ---------------------------------------------------------------------------

/// Owns the stores of one scene and drives them frame by frame.
pub struct Game3D<R: SceneRenderer = HeadlessRenderer> {
    config: GameConfig,
    state: GameState,
    world: World,
    queries: SystemQueries,
    physics: PhysicsWorld,
    renderer: R,
    input: InputCapture,
    contacts: GroundContacts,
    names: BTreeMap<String, EntityId>,
    names_by_id: BTreeMap<EntityId, String>,
    /// Cameras whose follow target had not been created yet.
    pending_follows: Vec<(EntityId, String)>,
    accumulator: f64,
    last_timestamp: Option<f64>,
    tick_counter: u64,
    /// Contact transitions from the steps of the last frame.
    collisions: Vec<CollisionEvent>,
}

impl<R: SceneRenderer> std::fmt::Debug for Game3D<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game3D")
            .field("state", &self.state)
            .field("entities", &self.world.entity_count())
            .field("bodies", &self.physics.body_count())
            .field("tick", &self.tick_counter)
            .finish_non_exhaustive()
    }
}

impl Game3D<HeadlessRenderer> {
    /// A game drawing into a [`HeadlessRenderer`].
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`GameConfig::validate`].
    pub fn new(config: GameConfig) -> Self {
        Self::with_renderer(config, HeadlessRenderer::default())
    }
}

impl<R: SceneRenderer> Game3D<R> {
    /// A game drawing into `renderer`.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`GameConfig::validate`].
    pub fn with_renderer(config: GameConfig, renderer: R) -> Self {
        config.validate();
        let mut world = World::new();
        register_components(&mut world);
        let queries = SystemQueries::new(&world);
        world.track(&queries.physical);
        Self {
            physics: PhysicsWorld::new(config.gravity),
            config,
            state: GameState::Stopped,
            world,
            queries,
            renderer,
            input: InputCapture::new(),
            contacts: GroundContacts::new(),
            names: BTreeMap::new(),
            names_by_id: BTreeMap::new(),
            pending_follows: Vec::new(),
            accumulator: 0.0,
            last_timestamp: None,
            tick_counter: 0,
            collisions: Vec::new(),
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Begin accepting frames. The next frame after a start has zero delta.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Disposed`] after [`dispose`](Self::dispose).
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            GameState::Disposed => Err(EngineError::Disposed),
            GameState::Running => Ok(()),
            GameState::Stopped => {
                self.state = GameState::Running;
                self.last_timestamp = None;
                tracing::debug!(entities = self.world.entity_count(), "game started");
                Ok(())
            }
        }
    }

    /// Takes effect before the next frame. Pending accumulator time is kept.
    pub fn stop(&mut self) {
        if self.state == GameState::Running {
            self.state = GameState::Stopped;
            tracing::debug!(tick = self.tick_counter, "game stopped");
        }
    }

    /// Release the input listeners, the renderer and every entity. A second
    /// call does nothing.
    pub fn dispose(&mut self) {
        if self.state == GameState::Disposed {
            return;
        }
        self.input.cleanup();
        self.renderer.dispose();
        self.physics.clear();
        self.contacts.clear();
        self.world.clear();
        self.names.clear();
        self.names_by_id.clear();
        self.pending_follows.clear();
        self.collisions.clear();
        self.accumulator = 0.0;
        self.state = GameState::Disposed;
        tracing::debug!("game disposed");
    }

    // -- stepping -----------------------------------------------------------

    /// Animation-frame callback: `timestamp` is in seconds on any monotonic
    /// clock. The first frame after [`start`](Self::start) has zero delta.
    pub fn frame(&mut self, timestamp: f64) -> FrameReport {
        if self.state != GameState::Running {
            return FrameReport::default();
        }
        let delta = match self.last_timestamp.replace(timestamp) {
            Some(previous) => (timestamp - previous).max(0.0),
            None => 0.0,
        };
        self.advance(delta)
    }

    /// Add `delta` seconds to the accumulator, drain whole fixed steps, then
    /// attach finished model loads and render once.
    pub fn advance(&mut self, delta: f64) -> FrameReport {
        if self.state != GameState::Running {
            return FrameReport::default();
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let delta = match self.config.max_frame_delta {
            Some(max) => delta.min(max),
            None => delta,
        };
        self.accumulator += delta;
        self.collisions.clear();

        let dt = self.config.fixed_dt;
        let mut report = FrameReport::default();
        while self.accumulator + STEP_TOLERANCE >= dt {
            if Some(report.steps) == self.config.max_steps_per_frame {
                report.dropped_time = self.accumulator;
                self.accumulator = 0.0;
                tracing::warn!(
                    steps = report.steps,
                    dropped = report.dropped_time,
                    "frame hit the step cap; dropping simulation time"
                );
                break;
            }
            self.step();
            self.accumulator = (self.accumulator - dt).max(0.0);
            report.steps += 1;
        }

        self.finish_frame();
        report
    }

    /// Run `count` fixed steps and one render regardless of the accumulator.
    /// Works while stopped, for headless drivers and tests.
    pub fn run_steps(&mut self, count: u32) -> Result<(), EngineError> {
        if self.state == GameState::Disposed {
            return Err(EngineError::Disposed);
        }
        self.collisions.clear();
        for _ in 0..count {
            self.step();
        }
        self.finish_frame();
        Ok(())
    }

    fn step(&mut self) {
        let dt = self.config.fixed_dt;
        systems::input_system(&mut self.world, &self.queries, &self.input, &self.contacts);
        let events = systems::physics_system(
            &mut self.world,
            &self.queries,
            &mut self.physics,
            &mut self.renderer,
            &mut self.contacts,
            dt,
        );
        systems::transform_system(&mut self.world, &self.queries, dt);
        self.input.update();
        self.tick_counter += 1;
        self.collisions.extend(events);
    }

    fn finish_frame(&mut self) {
        for outcome in self.renderer.poll_model_loads() {
            self.on_model_loaded(outcome);
        }
        systems::render_system(&mut self.world, &self.queries, &mut self.renderer);
        self.renderer.render();
    }

    /// Continuation of a model load. The entity may have moved, or been
    /// removed, while the load was in flight.
    fn on_model_loaded(&mut self, outcome: ModelLoadOutcome) {
        let ModelLoadOutcome { entity, url, result } = outcome;
        if !self.world.has_component::<Model>(entity) {
            tracing::trace!(entity = %entity, url, "load finished for a removed entity");
            return;
        }
        let status = match result {
            Ok(()) => ModelStatus::Loaded,
            Err(RenderError::Cancelled { .. }) => return,
            Err(error) => {
                tracing::warn!(entity = %entity, url, %error, "model load failed");
                ModelStatus::Failed
            }
        };
        if let Some(model) = self.world.get_component_mut::<Model>(entity) {
            model.status = status;
        }
        if status == ModelStatus::Loaded {
            if let Some(t) = self.world.get_component::<Transform>(entity).copied() {
                let scale = systems::render_scale(&self.world, entity, &t);
                self.renderer
                    .update_mesh_transform(entity, t.position, t.rotation, scale);
            }
            tracing::debug!(entity = %entity, url, "model attached");
        }
    }

    // -- entities -----------------------------------------------------------

    /// Create `name` in every store. A name already in use is rebound to the
    /// new entity; the previous entity stays alive, unnamed.
    pub fn create_entity(
        &mut self,
        name: &str,
        components: &EntityComponents,
        tags: &[String],
    ) -> Result<EntityId, EngineError> {
        if self.state == GameState::Disposed {
            return Err(EngineError::Disposed);
        }
        let e = self.world.spawn();
        if let Err(err) = self.attach(e, components, tags) {
            // Leave nothing half-built behind.
            self.renderer.remove_mesh(e);
            self.renderer.remove_light(e);
            let _ = self.world.despawn(e);
            return Err(err);
        }

        if let Some(previous) = self.names.insert(name.to_owned(), e) {
            self.names_by_id.remove(&previous);
            tracing::debug!(name, previous = %previous, "entity name rebound");
        }
        self.names_by_id.insert(e, name.to_owned());

        systems::sync_bodies(
            &mut self.world,
            &self.queries,
            &mut self.physics,
            &mut self.contacts,
        );
        self.resolve_follows();
        tracing::debug!(entity = %e, name, "entity created");
        Ok(e)
    }

    fn attach(
        &mut self,
        e: EntityId,
        c: &EntityComponents,
        tags: &[String],
    ) -> Result<(), EngineError> {
        let spatial = c.mesh.is_some()
            || c.light.is_some()
            || c.model3d.is_some()
            || c.collider3d.is_some()
            || c.camera3d.is_some()
            || c.velocity3d.is_some();
        let transform = match &c.transform3d {
            Some(desc) => Some(desc.to_component()),
            None if spatial => Some(Transform::default()),
            None => None,
        };
        if let Some(t) = transform {
            self.world.insert_component(e, t)?;
        }
        let t = transform.unwrap_or_default();

        let material = c.material.as_ref().map(|m| m.to_component());
        let mesh = c.mesh.as_ref().map(|m| m.to_component());
        if let Some(mesh) = &mesh {
            self.renderer
                .create_mesh(e, &mesh.geometry, material.as_ref(), mesh.shadows);
            self.renderer
                .update_mesh_transform(e, t.position, t.rotation, t.scale);
            if !mesh.visible {
                self.renderer.set_mesh_visible(e, false);
            }
            self.world.insert_component(e, mesh.clone())?;
        }
        if let Some(material) = material {
            self.world.insert_component(e, material)?;
        }

        if let Some(desc) = &c.light {
            let light = desc.to_component();
            self.renderer.create_light(e, &light);
            self.renderer.update_light_position(e, t.position);
            self.world.insert_component(e, light)?;
        }
        if let Some(desc) = &c.velocity3d {
            self.world.insert_component(e, desc.to_component())?;
        }
        if let Some(desc) = &c.input3d {
            self.world.insert_component(e, desc.to_component())?;
        }
        if let Some(desc) = &c.rigidbody3d {
            self.world.insert_component(e, desc.to_component())?;
        }
        if let Some(desc) = &c.collider3d {
            self.world
                .insert_component(e, desc.to_component(mesh.as_ref()))?;
        }
        if let Some(desc) = &c.camera3d {
            self.world.insert_component(e, desc.to_component())?;
            if let Some(target) = &desc.follow {
                self.pending_follows.push((e, target.clone()));
            }
        }
        if let Some(desc) = &c.model3d {
            let model = desc.to_component();
            let options = ModelOptions {
                scale: model.scale,
                shadows: model.shadows,
                position: t.position,
                rotation: t.rotation,
            };
            self.renderer.load_model(e, &model.url, &options);
            self.world.insert_component(e, model)?;
        }
        if !tags.is_empty() {
            self.world.insert_component(e, Tags(tags.to_vec()))?;
        }
        Ok(())
    }

    /// Bind camera follow targets whose names now exist.
    fn resolve_follows(&mut self) {
        let names = &self.names;
        let world = &mut self.world;
        self.pending_follows.retain(|(camera, target)| {
            if !world.is_alive(*camera) {
                return false;
            }
            let Some(&id) = names.get(target) else {
                return true;
            };
            if let Some(c) = world.get_component_mut::<Camera>(*camera) {
                c.follow = Some(id);
            }
            false
        });
    }

    pub fn remove_entity(&mut self, name: &str) -> bool {
        match self.names.get(name).copied() {
            Some(e) => self.remove_entity_id(e),
            None => false,
        }
    }

    /// Tear `entity` down in every store at once.
    pub fn remove_entity_id(&mut self, entity: EntityId) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }
        self.renderer.remove_mesh(entity);
        self.renderer.remove_light(entity);
        self.physics.remove_body(entity);
        self.contacts.purge(entity);
        if self.world.despawn(entity).is_err() {
            return false;
        }
        if let Some(name) = self.names_by_id.remove(&entity) {
            self.names.remove(&name);
        }
        self.pending_follows.retain(|(camera, _)| *camera != entity);
        tracing::debug!(entity = %entity, "entity removed");
        true
    }

    /// Remove every entity.
    pub fn clear(&mut self) {
        self.world.clear();
        self.physics.clear();
        self.contacts.clear();
        self.renderer.clear_all_meshes();
        self.names.clear();
        self.names_by_id.clear();
        self.pending_follows.clear();
        tracing::debug!("scene cleared");
    }

    // -- scenes -------------------------------------------------------------

    /// Replace the current scene with `description`.
    pub fn load_spec(&mut self, description: &SceneDescription) -> Result<(), EngineError> {
        if self.state == GameState::Disposed {
            return Err(EngineError::Disposed);
        }
        self.clear();
        if let Some(settings) = &description.settings {
            self.renderer.configure(settings);
        }
        for entity in &description.entities {
            self.create_entity(&entity.name, &entity.components, &entity.tags)?;
        }
        if !self.pending_follows.is_empty() {
            let missing: Vec<&str> = self.pending_follows.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(?missing, "camera follow targets not found in scene");
        }
        tracing::info!(
            scene = description.name.as_deref().unwrap_or("<unnamed>"),
            entities = self.world.entity_count(),
            "scene loaded"
        );
        Ok(())
    }

    pub fn load_spec_json(&mut self, json: &str) -> Result<(), EngineError> {
        let description = SceneDescription::from_json(json)?;
        self.load_spec(&description)
    }

    /// Load `<dir>/game.json`.
    pub fn load_project(&mut self, dir: impl AsRef<Path>) -> Result<(), EngineError> {
        let description = scene::load_project(dir)?;
        self.load_spec(&description)
    }

    // -- queries ------------------------------------------------------------

    /// The entity currently bound to `name`.
    pub fn entity(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Reverse of [`entity`](Self::entity); `None` once the name moved on.
    pub fn entity_name(&self, entity: EntityId) -> Option<&str> {
        self.names_by_id.get(&entity).map(String::as_str)
    }

    /// Live entities, named or not.
    pub fn entity_count(&self) -> usize {
        self.world.entity_count()
    }

    /// Whether a controlled `entity` is touching any non-trigger body.
    pub fn is_grounded(&self, entity: EntityId) -> bool {
        self.contacts.is_grounded(entity)
    }

    /// Read access to the component world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Attach or replace a component on a live entity. Physics components
    /// reach the physics world at the next step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ecs`] if `entity` is not alive or `T` is not an
    /// engine component.
    pub fn insert_component<T: 'static>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<(), EngineError> {
        self.world.insert_component(entity, value)?;
        Ok(())
    }

    /// Detach a component, returning it. The entity itself stays alive; use
    /// [`remove_entity_id`](Self::remove_entity_id) to destroy it. Render
    /// nodes left without a `Mesh`, `Model` or `Light` are removed with it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ecs`] if `entity` is not alive or `T` is not an
    /// engine component.
    pub fn remove_component<T: 'static>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, EngineError> {
        let removed = self.world.remove_component::<T>(entity)?;
        if !self.world.has_component::<Mesh>(entity) && !self.world.has_component::<Model>(entity)
        {
            self.renderer.remove_mesh(entity);
        }
        if !self.world.has_component::<Light>(entity) {
            self.renderer.remove_light(entity);
        }
        Ok(removed)
    }

    /// Mutable access to one component, for game logic that steers an entity
    /// between frames.
    pub fn component_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.world.get_component_mut(entity)
    }

    /// Read access to the physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Read access to the renderer's scene graph.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Current key state.
    pub fn input(&self) -> &InputCapture {
        &self.input
    }

    /// Where the host forwards key events.
    pub fn input_mut(&mut self) -> &mut InputCapture {
        &mut self.input
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Fixed steps executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// `tick_count * fixed_dt`, so repeated addition never drifts.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    /// Contact transitions from the most recent frame.
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.collisions
    }

    // -- editor helpers -----------------------------------------------------

    /// Move `name` in the component world, the physics world and the renderer
    /// together.
    pub fn set_entity_position(&mut self, name: &str, position: Vec3) -> bool {
        let Some(e) = self.entity(name) else {
            return false;
        };
        let Some(t) = self.world.get_component_mut::<Transform>(e) else {
            return false;
        };
        t.position = position;
        let t = *t;
        self.physics.set_position(e, position);
        let scale = systems::render_scale(&self.world, e, &t);
        self.renderer
            .update_mesh_transform(e, t.position, t.rotation, scale);
        self.renderer.update_light_position(e, position);
        true
    }

    /// Forward a viewport change to the renderer.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    /// Forward renderer settings, as a scene's `settings` block does.
    pub fn configure(&mut self, settings: &serde_json::Value) {
        self.renderer.configure(settings);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{InputControl, Velocity};
    use crate::scene::{MeshDesc, TransformDesc, VelocityDesc};

    const DT: f64 = 1.0 / 60.0;

    fn running_game() -> Game3D {
        let mut game = Game3D::new(GameConfig::headless());
        game.start().unwrap();
        game
    }

    fn boxed_at(x: f64, y: f64, z: f64) -> EntityComponents {
        EntityComponents {
            transform3d: Some(TransformDesc {
                x,
                y,
                z,
                ..TransformDesc::default()
            }),
            mesh: Some(MeshDesc::default()),
            ..EntityComponents::default()
        }
    }

    // -- 1. lifecycle ----------------------------------------------------------

    #[test]
    fn stopped_game_does_not_step() {
        let mut game = Game3D::new(GameConfig::headless());
        assert_eq!(game.advance(1.0).steps, 0);
        assert_eq!(game.tick_count(), 0);
    }

    #[test]
    fn dispose_is_terminal_and_idempotent() {
        let mut game = running_game();
        game.create_entity("a", &boxed_at(0.0, 0.0, 0.0), &[]).unwrap();
        game.dispose();
        game.dispose();
        assert_eq!(game.state(), GameState::Disposed);
        assert!(game.renderer().is_disposed());
        assert_eq!(game.entity_count(), 0);
        assert!(!game.input().is_attached());
        assert!(matches!(game.start(), Err(EngineError::Disposed)));
        assert!(matches!(
            game.create_entity("b", &EntityComponents::default(), &[]),
            Err(EngineError::Disposed)
        ));
    }

    // -- 2. accumulator --------------------------------------------------------

    #[test]
    fn leftover_time_carries_over() {
        let mut game = running_game();
        assert_eq!(game.advance(DT * 1.5).steps, 1);
        assert_eq!(game.advance(DT * 0.5).steps, 1);
        assert_eq!(game.tick_count(), 2);
    }

    #[test]
    fn step_cap_drops_excess() {
        let mut game = Game3D::new(GameConfig {
            max_steps_per_frame: Some(3),
            ..GameConfig::headless()
        });
        game.start().unwrap();
        let report = game.advance(DT * 5.0);
        assert_eq!(report.steps, 3);
        assert!((report.dropped_time - DT * 2.0).abs() < 1e-6);
        assert_eq!(game.advance(0.0).steps, 0);
    }

    #[test]
    fn long_pause_is_clamped_when_limited() {
        let mut game = Game3D::new(GameConfig::headless().with_frame_limits(0.25, 8));
        game.start().unwrap();
        game.frame(0.0);
        let report = game.frame(30.0);
        // 0.25 s clamp = 15 steps, capped at 8.
        assert_eq!(report.steps, 8);
    }

    #[test]
    fn default_config_never_drops_time() {
        let mut whole = running_game();
        let report = whole.advance(DT * 20.0);
        assert_eq!(report.steps, 20);
        assert_eq!(report.dropped_time, 0.0);

        let mut split = running_game();
        for _ in 0..20 {
            split.advance(DT);
        }
        assert_eq!(whole.tick_count(), split.tick_count());

        let mut paused = running_game();
        paused.frame(0.0);
        assert_eq!(paused.frame(2.0).steps, 120);
    }

    #[test]
    fn frame_uses_timestamp_deltas() {
        let mut game = running_game();
        assert_eq!(game.frame(10.0).steps, 0);
        assert_eq!(game.frame(10.0 + DT).steps, 1);
        assert_eq!(game.frame(10.0 + 3.0 * DT).steps, 2);
    }

    // -- 3. entities -----------------------------------------------------------

    #[test]
    fn create_then_remove_leaves_nothing() {
        let mut game = running_game();
        let e = game.create_entity("x", &boxed_at(1.0, 2.0, 3.0), &[]).unwrap();
        assert_eq!(game.renderer().mesh(e).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert!(game.remove_entity("x"));
        assert_eq!(game.renderer().mesh_count(), 0);
        assert_eq!(game.entity("x"), None);
        assert!(!game.world().is_alive(e));
        assert!(!game.remove_entity("x"));
    }

    #[test]
    fn names_rebind_to_last_writer() {
        let mut game = running_game();
        let first = game.create_entity("x", &boxed_at(0.0, 0.0, 0.0), &[]).unwrap();
        let second = game.create_entity("x", &boxed_at(1.0, 0.0, 0.0), &[]).unwrap();
        assert_eq!(game.entity("x"), Some(second));
        assert_eq!(game.entity_name(first), None);
        assert!(game.world().is_alive(first));
        assert!(game.remove_entity_id(first));
        assert_eq!(game.entity("x"), Some(second));
    }

    #[test]
    fn spatial_components_imply_a_transform() {
        let mut game = running_game();
        let c = EntityComponents {
            mesh: Some(MeshDesc::default()),
            ..EntityComponents::default()
        };
        let e = game.create_entity("m", &c, &[]).unwrap();
        assert!(game.world().has_component::<Transform>(e));
        assert!(game.world().has_component::<Mesh>(e));
    }

    #[test]
    fn free_mover_integrates_velocity() {
        let mut game = running_game();
        let c = EntityComponents {
            velocity3d: Some(VelocityDesc {
                x: 5.0,
                ..VelocityDesc::default()
            }),
            ..boxed_at(0.0, 0.0, 0.0)
        };
        let e = game.create_entity("mover", &c, &[]).unwrap();
        game.run_steps(1).unwrap();
        let t = game.world().get_component::<Transform>(e).unwrap();
        assert!((t.position.x - 5.0 / 60.0).abs() < 1e-12);
        assert!(game.world().has_component::<Velocity>(e));
    }

    #[test]
    fn camera_follow_resolves_later_targets() {
        let mut game = running_game();
        game.load_spec_json(
            r#"{"entities":[
                {"name":"cam","components":{"camera3d":{"follow":"hero","smoothing":1}}},
                {"name":"hero","components":{"transform3d":{"x":4},"input3d":{},"velocity3d":{}}}
            ]}"#,
        )
        .unwrap();
        let cam = game.entity("cam").unwrap();
        let hero = game.entity("hero").unwrap();
        assert_eq!(game.world().get_component::<Camera>(cam).unwrap().follow, Some(hero));
        assert!(game.world().has_component::<InputControl>(hero));

        game.run_steps(1).unwrap();
        let view = game.renderer().camera();
        assert_eq!(view.target, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(view.position, Vec3::new(4.0, 5.0, 10.0));
    }

    #[test]
    fn load_spec_replaces_previous_scene() {
        let mut game = running_game();
        game.create_entity("old", &boxed_at(0.0, 0.0, 0.0), &[]).unwrap();
        game.load_spec_json(r#"{"settings":{"fog":true},"entities":[{"name":"new","components":{"mesh":{}}}]}"#)
            .unwrap();
        assert_eq!(game.entity("old"), None);
        assert_eq!(game.entity_count(), 1);
        assert_eq!(game.renderer().settings().get("fog"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn set_entity_position_moves_every_store() {
        let mut game = running_game();
        game.load_spec_json(
            r#"{"entities":[{"name":"b","components":{"transform3d":{"y":5},"mesh":{},"collider3d":{},"rigidbody3d":{"type":"kinematic"}}}]}"#,
        )
        .unwrap();
        let e = game.entity("b").unwrap();
        let to = Vec3::new(2.0, 3.0, 4.0);
        assert!(game.set_entity_position("b", to));
        assert_eq!(game.world().get_component::<Transform>(e).unwrap().position, to);
        assert_eq!(game.renderer().mesh(e).unwrap().position, to);
        assert!(game.physics().body_state(e).unwrap().position.distance(to) < 1e-4);
        assert!(!game.set_entity_position("nobody", to));
    }

    #[test]
    fn component_edits_keep_entity_in_every_store() {
        let mut game = running_game();
        let e = game.create_entity("x", &boxed_at(0.0, 0.0, 0.0), &[]).unwrap();

        let mesh = game.remove_component::<Mesh>(e).unwrap();
        assert!(mesh.is_some());
        assert_eq!(game.renderer().mesh_count(), 0);
        game.insert_component(e, Velocity::default()).unwrap();
        game.run_steps(1).unwrap();
        assert!(game.world().is_alive(e));
        assert_eq!(game.entity("x"), Some(e));

        assert!(game.remove_entity_id(e));
        assert!(!game.world().is_alive(e));
        assert_eq!(game.entity("x"), None);
        assert!(matches!(
            game.insert_component(e, Velocity::default()),
            Err(EngineError::Ecs(_))
        ));
    }
}
