//! Headless demo -- a player capsule drops onto the ground, lands and hops.
//!
//! Run with:
//!   cargo run --example falling_player -p vela-engine
//!
//! Set `RUST_LOG=vela_engine=debug` to watch entity lifecycle events.

use vela_engine::prelude::*;
use vela_engine::state_machine::{Condition, StateMachine, Transition};

const SCENE: &str = r##"{
  "name": "falling-player",
  "entities": [
    { "name": "ground",
      "components": {
        "mesh": { "geometry": "plane", "width": 20, "height": 20 },
        "material": { "color": "#4a7c3f" },
        "collider3d": { "shape": "plane" },
        "rigidbody3d": { "type": "static", "material": "ground" } } },
    { "name": "player",
      "components": {
        "transform3d": { "y": 6 },
        "mesh": { "geometry": "capsule", "radius": 0.5, "length": 1 },
        "velocity3d": {},
        "input3d": { "jumpForce": 6 },
        "collider3d": {},
        "rigidbody3d": { "fixedRotation": true, "material": "player" } } },
    { "name": "camera",
      "components": {
        "camera3d": { "follow": "player", "offset": { "x": 0, "y": 4, "z": 8 } } } }
  ]
}"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pose {
    Falling,
    Standing,
    Jumping,
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut game = Game3D::new(GameConfig::headless());
    game.load_spec_json(SCENE)?;
    game.start()?;
    let player = game
        .entity("player")
        .ok_or_else(|| anyhow::anyhow!("scene has no player"))?;

    let mut pose = StateMachine::new(Pose::Falling);
    let grounded = pose.add_bool(false);
    let rising = pose.add_bool(false);
    pose.add_transition(Transition::new(Pose::Falling, Pose::Standing).when(Condition::Bool(grounded, true)));
    pose.add_transition(Transition::new(Pose::Standing, Pose::Jumping).when(Condition::Bool(rising, true)));
    pose.add_transition(Transition::new(Pose::Jumping, Pose::Falling).when(Condition::Bool(rising, false)));

    let dt = game.config().fixed_dt;
    let mut jumped = false;
    for frame in 0..240u32 {
        if pose.current() == Pose::Standing && !jumped {
            game.input_mut().on_key_down("Space");
            jumped = true;
        }
        game.advance(dt);
        game.input_mut().on_key_up("Space");

        let vy = game
            .world()
            .get_component::<Velocity>(player)
            .map_or(0.0, |v| v.linear.y);
        pose.set_bool(grounded, game.is_grounded(player));
        pose.set_bool(rising, vy > 0.5);
        if let Some((from, to)) = pose.update() {
            println!("frame {frame:>3}: {from:?} -> {to:?}");
        }

        if frame % 30 == 0 {
            let p = game
                .world()
                .get_component::<Transform>(player)
                .map(|t| t.position)
                .unwrap_or_default();
            println!(
                "t = {:>5.2}s  y = {:>6.3}  vy = {:>6.3}  camera at {:?}",
                game.sim_time(),
                p.y,
                vy,
                game.renderer().camera().position.to_array()
            );
        }
    }

    println!(
        "{} ticks, {} entities, grounded = {}",
        game.tick_count(),
        game.entity_count(),
        game.is_grounded(player)
    );
    game.dispose();
    Ok(())
}
