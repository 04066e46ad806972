//! Vela Engine -- 3D scene runtime on top of [`vela_ecs`].
//!
//! A [`Game3D`](game::Game3D) owns three stores that share entity ids: the
//! component world, a rapier3d physics world and a scene renderer. Scenes are
//! populated from declarative descriptions, advanced with a fixed-step
//! accumulator and drawn once per frame. Rendering goes through the
//! [`SceneRenderer`](render::SceneRenderer) trait; the built-in
//! [`HeadlessRenderer`](render::HeadlessRenderer) keeps the scene graph in
//! memory, and the `renderer` feature adds a wgpu top-down debug window.
//!
//! # Quick Start
//!
//! ```
//! use vela_engine::prelude::*;
//!
//! let mut game = Game3D::new(GameConfig::headless());
//! game.load_spec_json(r#"{
//!     "entities": [
//!         { "name": "ground",
//!           "components": {
//!             "collider3d": { "shape": "plane" },
//!             "rigidbody3d": { "type": "static" } } },
//!         { "name": "ball",
//!           "components": {
//!             "transform3d": { "y": 2 },
//!             "mesh": { "geometry": "sphere", "radius": 0.5 },
//!             "collider3d": {},
//!             "rigidbody3d": {} } }
//!     ]
//! }"#).unwrap();
//!
//! game.start().unwrap();
//! for _ in 0..30 {
//!     game.advance(1.0 / 60.0);
//! }
//! assert_eq!(game.tick_count(), 30);
//!
//! let ball = game.entity("ball").unwrap();
//! let y = game.world().get_component::<Transform>(ball).unwrap().position.y;
//! assert!(y < 2.0);
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod math;
pub mod physics;
pub mod render;
pub mod scene;
pub mod state_machine;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use vela_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use vela_ecs::prelude::*;

    pub use crate::components::{
        Camera, Collider, Geometry, InputControl, Light, LightKind, Material, Mesh, Model,
        ModelStatus, RigidBody, ShadowFlags, Tags, Transform, Velocity,
    };
    pub use crate::config::GameConfig;
    pub use crate::error::{EngineError, RenderError, SceneError};
    pub use crate::game::{FrameReport, Game3D, GameState};
    pub use crate::input::{InputCapture, KeyEvent};
    pub use crate::math::{Quat, Vec3};
    pub use crate::physics::{
        BodyKind, BodyOptions, BodyShape, CollisionEvent, ContactPhase, PhysicsMaterial,
        PhysicsWorld,
    };
    pub use crate::render::{
        CameraView, FsModelSource, HeadlessRenderer, MemoryModelSource, SceneRenderer,
    };
    pub use crate::scene::{EntityComponents, EntityDescription, SceneDescription};
}
