//! Property tests for the fixed-step accumulator.
//!
//! However a span of time is split into frames, the number of physics steps
//! it produces depends only on its total length.

use proptest::prelude::*;
use vela_engine::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn ball_game() -> Game3D {
    let mut game = Game3D::new(GameConfig::headless());
    game.load_spec_json(
        r#"{"entities":[
            {"name":"ground","components":{"collider3d":{"shape":"plane"},"rigidbody3d":{"type":"static"}}},
            {"name":"ball","components":{"transform3d":{"y":4},"mesh":{"geometry":"sphere"},"collider3d":{},"rigidbody3d":{}}}
        ]}"#,
    )
    .unwrap();
    game.start().unwrap();
    game
}

/// Split `steps * DT` into fragments proportional to `weights`.
fn fragments(steps: u32, weights: &[u32]) -> Vec<f64> {
    let total = f64::from(steps) * DT;
    let sum: u32 = weights.iter().sum();
    weights
        .iter()
        .map(|&w| total * f64::from(w) / f64::from(sum))
        .collect()
}

proptest! {
    #[test]
    fn fragmented_deltas_yield_exact_step_count(
        steps in 1u32..40,
        weights in prop::collection::vec(1u32..100, 1..24),
    ) {
        let mut game = ball_game();
        let mut reported = 0u32;
        for delta in fragments(steps, &weights) {
            reported += game.advance(delta).steps;
        }
        prop_assert_eq!(game.tick_count(), u64::from(steps));
        prop_assert_eq!(reported, steps);
    }

    #[test]
    fn same_total_same_state(
        steps in 1u32..30,
        weights in prop::collection::vec(1u32..100, 1..16),
    ) {
        let mut whole = ball_game();
        whole.advance(f64::from(steps) * DT);

        let mut split = ball_game();
        for delta in fragments(steps, &weights) {
            split.advance(delta);
        }

        let ball_a = whole.entity("ball").unwrap();
        let ball_b = split.entity("ball").unwrap();
        let a = whole.world().get_component::<Transform>(ball_a).unwrap().position;
        let b = split.world().get_component::<Transform>(ball_b).unwrap().position;
        prop_assert_eq!(a, b);
    }

    #[test]
    fn frames_never_exceed_step_cap(
        deltas in prop::collection::vec(0.0f64..1.0, 1..20),
        cap in 1u32..10,
    ) {
        let mut game = Game3D::new(GameConfig {
            max_steps_per_frame: Some(cap),
            ..GameConfig::headless()
        });
        game.start().unwrap();
        for delta in deltas {
            let report = game.advance(delta);
            prop_assert!(report.steps <= cap);
            prop_assert!(report.dropped_time >= 0.0);
        }
    }

    #[test]
    fn large_frames_lose_no_time_by_default(
        steps in 1u32..200,
        weights in prop::collection::vec(1u32..100, 1..4),
    ) {
        let mut game = ball_game();
        let mut dropped = 0.0;
        for delta in fragments(steps, &weights) {
            dropped += game.advance(delta).dropped_time;
        }
        prop_assert_eq!(game.tick_count(), u64::from(steps));
        prop_assert_eq!(dropped, 0.0);
    }
}
