//! End-to-end behaviour of `Game3D`: entities spanning all three stores,
//! the fixed-step loop, ground contacts and asynchronous model loads.

use vela_engine::prelude::*;
use vela_engine::scene::{
    ColliderDesc, InputDesc, MeshDesc, ModelDesc, RigidBodyDesc, TransformDesc, VelocityDesc,
};

const DT: f64 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PLAYGROUND: &str = r##"{
  "name": "playground",
  "entities": [
    { "name": "ground",
      "components": {
        "transform3d": {},
        "mesh": { "geometry": "plane", "width": 40, "height": 40 },
        "collider3d": { "shape": "plane" },
        "rigidbody3d": { "type": "static", "material": "ground" } } },
    { "name": "player",
      "components": {
        "transform3d": { "y": 3 },
        "mesh": { "geometry": "capsule", "radius": 0.5, "length": 1 },
        "material": { "color": "#3366ff" },
        "velocity3d": {},
        "input3d": { "moveSpeed": 5, "jumpForce": 8 },
        "collider3d": { "restitution": 0 },
        "rigidbody3d": { "fixedRotation": true, "material": "player" } },
      "tags": ["player"] },
    { "name": "sun",
      "components": {
        "transform3d": { "x": 5, "y": 10, "z": 5 },
        "light": { "type": "directional", "intensity": 1.2, "castShadow": true } } }
  ]
}"##;

fn playground() -> Game3D {
    let mut game = Game3D::new(GameConfig::headless());
    game.load_spec_json(PLAYGROUND).unwrap();
    game.start().unwrap();
    game
}

fn settle(game: &mut Game3D) {
    for _ in 0..180 {
        game.advance(DT);
    }
}

fn position(game: &Game3D, e: EntityId) -> Vec3 {
    game.world().get_component::<Transform>(e).unwrap().position
}

fn with_model(src: &MemoryModelSource, url: &str) -> (Game3D, EntityComponents) {
    let mut game =
        Game3D::with_renderer(GameConfig::headless(), HeadlessRenderer::new(src.clone()));
    game.start().unwrap();
    let components = EntityComponents {
        transform3d: Some(TransformDesc::default()),
        model3d: Some(ModelDesc {
            url: url.to_owned(),
            scale: 2.0,
            ..ModelDesc::default()
        }),
        ..EntityComponents::default()
    };
    (game, components)
}

fn glb() -> Vec<u8> {
    let mut bytes = b"glTF".to_vec();
    bytes.extend_from_slice(&[2, 0, 0, 0, 12, 0, 0, 0]);
    bytes
}

// ---------------------------------------------------------------------------
// Physics and input
// ---------------------------------------------------------------------------

#[test]
fn falling_player_lands_and_is_grounded() {
    let mut game = playground();
    let player = game.entity("player").unwrap();
    assert!(!game.is_grounded(player));

    settle(&mut game);

    let p = position(&game, player);
    assert!((p.y - 1.0).abs() < 0.05, "player should rest on the plane, y = {}", p.y);
    assert!(game.is_grounded(player));
    assert!(game.world().get_component::<InputControl>(player).unwrap().is_grounded);
    assert_eq!(game.renderer().mesh(player).unwrap().position, p);
}

#[test]
fn held_key_moves_player_forward() {
    let mut game = playground();
    let player = game.entity("player").unwrap();
    settle(&mut game);
    let start = position(&game, player);

    game.input_mut().on_key_down("KeyW");
    for _ in 0..30 {
        game.advance(DT);
    }
    game.input_mut().on_key_up("KeyW");

    let moved = position(&game, player) - start;
    assert!(moved.z < -2.0, "forward is -Z, moved {moved:?}");
    assert!(moved.x.abs() < 1e-3);
}

#[test]
fn jump_only_when_grounded() {
    let mut game = playground();
    let player = game.entity("player").unwrap();

    // Airborne: the press is consumed without effect.
    game.input_mut().on_key_down("Space");
    game.advance(DT);
    game.input_mut().on_key_up("Space");
    assert!(game.world().get_component::<Velocity>(player).unwrap().linear.y <= 0.0);

    settle(&mut game);
    game.input_mut().on_key_down("Space");
    game.advance(DT);
    let vy = game.world().get_component::<Velocity>(player).unwrap().linear.y;
    assert!(vy > 5.0, "jump should launch the player, vy = {vy}");

    // Holding the key does not jump again.
    game.advance(DT);
    let vy2 = game.world().get_component::<Velocity>(player).unwrap().linear.y;
    assert!(vy2 < vy);
}

#[test]
fn free_mover_advances_by_velocity_times_dt() {
    let mut game = Game3D::new(GameConfig::headless());
    game.start().unwrap();
    let e = game
        .create_entity(
            "drifter",
            &EntityComponents {
                transform3d: Some(TransformDesc::default()),
                velocity3d: Some(VelocityDesc {
                    x: 5.0,
                    ..VelocityDesc::default()
                }),
                ..EntityComponents::default()
            },
            &[],
        )
        .unwrap();
    let report = game.advance(DT);
    assert_eq!(report.steps, 1);
    assert!((position(&game, e).x - 5.0 / 60.0).abs() < 1e-12);
}

#[test]
fn body_follows_component_presence() {
    let mut game = Game3D::new(GameConfig::headless());
    let e = game
        .create_entity(
            "crate",
            &EntityComponents {
                transform3d: Some(TransformDesc::default()),
                collider3d: Some(ColliderDesc::default()),
                rigidbody3d: Some(RigidBodyDesc::default()),
                ..EntityComponents::default()
            },
            &[],
        )
        .unwrap();
    assert!(game.physics().has_body(e));

    let collider = game.remove_component::<Collider>(e).unwrap().unwrap();
    game.run_steps(1).unwrap();
    assert!(!game.physics().has_body(e));

    game.insert_component(e, collider).unwrap();
    game.run_steps(1).unwrap();
    assert!(game.physics().has_body(e));
}

#[test]
fn removing_ground_ungrounds_player_immediately() {
    let mut game = playground();
    let player = game.entity("player").unwrap();
    settle(&mut game);
    assert!(game.is_grounded(player));

    assert!(game.remove_entity("ground"));
    assert!(!game.is_grounded(player));
    game.advance(DT);
    assert!(!game.is_grounded(player));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn create_and_remove_round_trip() {
    let mut game = Game3D::new(GameConfig::headless());
    let components = EntityComponents {
        transform3d: Some(TransformDesc {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            ..TransformDesc::default()
        }),
        mesh: Some(MeshDesc::default()),
        ..EntityComponents::default()
    };
    game.create_entity("x", &components, &[]).unwrap();
    assert_eq!(game.renderer().mesh_count(), 1);

    assert!(game.remove_entity("x"));
    assert_eq!(game.renderer().mesh_count(), 0);
    assert_eq!(game.entity("x"), None);
    assert_eq!(game.entity_count(), 0);
}

#[test]
fn clear_tears_down_every_store() {
    let mut game = playground();
    settle(&mut game);
    game.clear();
    assert_eq!(game.entity_count(), 0);
    assert_eq!(game.physics().body_count(), 0);
    assert_eq!(game.renderer().mesh_count(), 0);
    assert_eq!(game.renderer().light_count(), 0);
    assert_eq!(game.entity("player"), None);

    // The world keeps working after a clear.
    game.load_spec_json(PLAYGROUND).unwrap();
    settle(&mut game);
    assert!(game.is_grounded(game.entity("player").unwrap()));
}

#[test]
fn dispose_twice_is_harmless() {
    let mut game = playground();
    game.advance(DT);
    game.dispose();
    game.dispose();
    assert_eq!(game.state(), GameState::Disposed);
    assert_eq!(game.advance(DT).steps, 0);
    assert!(matches!(game.run_steps(1), Err(EngineError::Disposed)));
    assert!(matches!(game.load_spec_json(PLAYGROUND), Err(EngineError::Disposed)));
}

#[test]
fn load_project_reports_missing_scene() {
    let mut game = Game3D::new(GameConfig::headless());
    let dir = std::env::temp_dir().join(format!("vela-missing-{}", std::process::id()));
    let err = game.load_project(&dir).unwrap_err();
    assert!(matches!(err, EngineError::Scene(SceneError::NotFound { .. })));
}

#[test]
fn load_project_reads_game_json() {
    let dir = std::env::temp_dir().join(format!("vela-project-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("game.json"), PLAYGROUND).unwrap();

    let mut game = Game3D::new(GameConfig::headless());
    game.load_project(&dir).unwrap();
    assert_eq!(game.entity_count(), 3);
    assert_eq!(game.renderer().light_count(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Model loads
// ---------------------------------------------------------------------------

#[test]
fn model_load_racing_a_move_ends_at_latest_transform() {
    let src = MemoryModelSource::new();
    src.insert("models/tree.glb", glb());
    src.hold("models/tree.glb");
    let (mut game, components) = with_model(&src, "models/tree.glb");
    let tree = game.create_entity("tree", &components, &[]).unwrap();

    game.advance(DT);
    assert!(game.renderer().mesh(tree).is_none());
    assert!(game.renderer().has_pending_load(tree));

    let target = Vec3::new(3.0, 0.0, -2.0);
    assert!(game.set_entity_position("tree", target));

    src.release("models/tree.glb");
    game.advance(DT);

    let node = game.renderer().mesh(tree).unwrap();
    assert_eq!(node.position, target);
    assert_eq!(node.scale, Vec3::new(2.0, 2.0, 2.0));
    assert_eq!(
        game.world().get_component::<Model>(tree).unwrap().status,
        ModelStatus::Loaded
    );
}

#[test]
fn removing_entity_cancels_its_load() {
    let src = MemoryModelSource::new();
    src.insert("models/rock.glb", glb());
    src.hold("models/rock.glb");
    let (mut game, components) = with_model(&src, "models/rock.glb");
    let rock = game.create_entity("rock", &components, &[]).unwrap();
    assert!(game.renderer().has_pending_load(rock));

    assert!(game.remove_entity("rock"));
    assert!(!game.renderer().has_pending_load(rock));

    src.release("models/rock.glb");
    game.advance(DT);
    game.advance(DT);
    assert_eq!(game.renderer().mesh_count(), 0);
}

#[test]
fn failed_load_is_not_fatal() {
    let src = MemoryModelSource::new();
    let (mut game, components) = with_model(&src, "models/missing.glb");
    let e = game.create_entity("ghost", &components, &[]).unwrap();

    game.advance(DT);
    assert_eq!(
        game.world().get_component::<Model>(e).unwrap().status,
        ModelStatus::Failed
    );
    assert!(game.world().has_component::<Transform>(e));
    assert!(game.renderer().mesh(e).is_none());
    assert_eq!(game.state(), GameState::Running);
    assert_eq!(game.advance(DT).steps, 1);
}

// ---------------------------------------------------------------------------
// Input capture plumbing
// ---------------------------------------------------------------------------

#[test]
fn key_events_reach_the_capture() {
    let mut game = Game3D::new(GameConfig::headless());
    game.input_mut().handle_event(&KeyEvent::down("KeyD"));
    assert!(game.input().is_down("KeyD"));
    game.input_mut().handle_event(&KeyEvent::up("KeyD"));
    assert!(!game.input().is_down("KeyD"));
}

#[test]
fn controlled_input_defaults_apply() {
    let mut game = Game3D::new(GameConfig::headless());
    let e = game
        .create_entity(
            "p",
            &EntityComponents {
                input3d: Some(InputDesc::default()),
                velocity3d: Some(VelocityDesc::default()),
                ..EntityComponents::default()
            },
            &["player".to_owned()],
        )
        .unwrap();
    let ctrl = game.world().get_component::<InputControl>(e).unwrap();
    assert_eq!(ctrl.move_speed, 5.0);
    assert!(game.world().get_component::<Tags>(e).unwrap().contains("player"));
}
