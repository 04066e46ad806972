//! Interactive playground -- walk a capsule around a field of crates.
//!
//! Run with:
//!   cargo run --example playground_visual --features renderer -p vela-engine [-- <project-dir>]
//!
//! With a project directory, its `game.json` is loaded instead of the
//! built-in scene.
//!
//! Controls:
//!   W/A/S/D or arrows -- move
//!   Space -- jump

use vela_engine::prelude::*;
use vela_engine::render::run_windowed;
use vela_engine::scene::{
    Color, ColliderDesc, Dimensions, MaterialDesc, MeshDesc, RigidBodyDesc, TransformDesc,
};

const SCENE: &str = r##"{
  "name": "playground",
  "settings": { "background": "#87ceeb", "shadows": true },
  "entities": [
    { "name": "ground",
      "components": {
        "mesh": { "geometry": "plane", "width": 40, "height": 40 },
        "material": { "color": "#3d5c3a" },
        "collider3d": { "shape": "plane" },
        "rigidbody3d": { "type": "static", "material": "ground" } } },
    { "name": "player",
      "components": {
        "transform3d": { "y": 2 },
        "mesh": { "geometry": "capsule", "radius": 0.5, "length": 1 },
        "material": { "color": "#e0b040" },
        "velocity3d": {},
        "input3d": { "moveSpeed": 6 },
        "collider3d": {},
        "rigidbody3d": { "fixedRotation": true, "material": "player" } },
      "tags": ["player"] },
    { "name": "sun",
      "components": {
        "transform3d": { "x": 10, "y": 20, "z": 10 },
        "light": { "type": "directional", "castShadow": true } } },
    { "name": "camera",
      "components": {
        "camera3d": { "follow": "player", "smoothing": 0.15 } } }
  ]
}"##;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A stalled window should not replay seconds of physics on return.
    let config = GameConfig::default().with_frame_limits(0.25, 8);
    let game = match std::env::args().nth(1) {
        Some(dir) => {
            // Model urls in the project resolve against its directory.
            let renderer = HeadlessRenderer::new(FsModelSource::new(&dir));
            let mut game = Game3D::with_renderer(config, renderer);
            game.load_project(dir)?;
            game
        }
        None => {
            let mut game = Game3D::new(config);
            game.load_spec_json(SCENE)?;
            scatter_crates(&mut game)?;
            game
        }
    };

    run_windowed(game, "Vela Playground", 1024, 768)
}

/// A ring of dynamic crates for the player to push around.
fn scatter_crates(game: &mut Game3D) -> Result<(), anyhow::Error> {
    for i in 0..12u32 {
        let angle = f64::from(i) * std::f64::consts::TAU / 12.0;
        let size = 0.6 + f64::from(i % 3) * 0.3;
        let dimensions = Dimensions {
            width: Some(size),
            height: Some(size),
            depth: Some(size),
            ..Dimensions::default()
        };
        let components = EntityComponents {
            transform3d: Some(TransformDesc {
                x: angle.cos() * 8.0,
                y: size,
                z: angle.sin() * 8.0,
                rotation_y: angle,
                ..TransformDesc::default()
            }),
            mesh: Some(MeshDesc {
                dimensions,
                ..MeshDesc::default()
            }),
            material: Some(MaterialDesc {
                color: Color(0x8b5a2b + (i * 0x000a0a)),
                ..MaterialDesc::default()
            }),
            collider3d: Some(ColliderDesc::default()),
            rigidbody3d: Some(RigidBodyDesc::default()),
            ..EntityComponents::default()
        };
        game.create_entity(&format!("crate-{i}"), &components, &["crate".to_owned()])?;
    }
    Ok(())
}
