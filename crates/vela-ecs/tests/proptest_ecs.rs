//! Property tests for the entity store.
//!
//! Random sequences of attach/detach/despawn/poll operations are replayed
//! against the world and against a trivial model; edge-detected queries must
//! report every membership transition exactly once.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use vela_ecs::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Transform(i32);

#[derive(Debug, Clone, PartialEq)]
struct Collider(i32);

#[derive(Debug, Clone, PartialEq)]
struct Body;

#[derive(Debug, Clone)]
enum Op {
    Spawn,
    Despawn(usize),
    AttachTransform(usize),
    AttachCollider(usize),
    AttachBody(usize),
    DetachCollider(usize),
    DetachBody(usize),
    Poll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Spawn),
        1 => (0..32usize).prop_map(Op::Despawn),
        2 => (0..32usize).prop_map(Op::AttachTransform),
        2 => (0..32usize).prop_map(Op::AttachCollider),
        2 => (0..32usize).prop_map(Op::AttachBody),
        1 => (0..32usize).prop_map(Op::DetachCollider),
        1 => (0..32usize).prop_map(Op::DetachBody),
        2 => Just(Op::Poll),
    ]
}

fn setup_world() -> World {
    let mut world = World::new();
    world.register_component::<Transform>("transform");
    world.register_component::<Collider>("collider");
    world.register_component::<Body>("body");
    world
}

/// Pick the `i`-th spawned entity (modulo), dead or alive.
fn pick(spawned: &[EntityId], i: usize) -> Option<EntityId> {
    (!spawned.is_empty()).then(|| spawned[i % spawned.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn edge_detection_is_exactly_once(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut world = setup_world();
        let sig = world.signature::<(Transform, Collider, Body)>();
        world.track(&sig);

        let mut spawned: Vec<EntityId> = Vec::new();
        // What a consumer believes is inside the signature, built purely from
        // the polled edges.
        let mut observed: BTreeSet<EntityId> = BTreeSet::new();
        // Last edge seen per entity; enters and exits must alternate.
        let mut last_edge: HashMap<EntityId, bool> = HashMap::new();

        let poll = |world: &mut World, observed: &mut BTreeSet<EntityId>, last_edge: &mut HashMap<EntityId, bool>| -> Result<(), TestCaseError> {
            for e in world.query_exited(&sig) {
                prop_assert!(observed.remove(&e), "exit for {e:?} that was never entered");
                prop_assert_ne!(last_edge.insert(e, false), Some(false));
            }
            for e in world.query_entered(&sig) {
                prop_assert!(observed.insert(e), "duplicate enter for {e:?}");
                prop_assert_ne!(last_edge.insert(e, true), Some(true));
            }
            Ok(())
        };

        for op in ops {
            match op {
                Op::Spawn => spawned.push(world.spawn()),
                Op::Despawn(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.despawn(e);
                    }
                }
                Op::AttachTransform(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.insert_component(e, Transform(i as i32));
                    }
                }
                Op::AttachCollider(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.insert_component(e, Collider(i as i32));
                    }
                }
                Op::AttachBody(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.insert_component(e, Body);
                    }
                }
                Op::DetachCollider(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.remove_component::<Collider>(e);
                    }
                }
                Op::DetachBody(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.remove_component::<Body>(e);
                    }
                }
                Op::Poll => poll(&mut world, &mut observed, &mut last_edge)?,
            }
        }

        poll(&mut world, &mut observed, &mut last_edge)?;

        // After a final poll the consumer's view equals the true membership.
        let actual: BTreeSet<EntityId> = world.query(&sig).collect();
        prop_assert_eq!(observed, actual);
    }

    #[test]
    fn component_presence_matches_masks(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut world = setup_world();
        let mut spawned: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                Op::Spawn => spawned.push(world.spawn()),
                Op::Despawn(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.despawn(e);
                    }
                }
                Op::AttachTransform(i) | Op::AttachCollider(i) | Op::AttachBody(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.insert_component(e, Collider(i as i32));
                    }
                }
                Op::DetachCollider(i) | Op::DetachBody(i) => {
                    if let Some(e) = pick(&spawned, i) {
                        let _ = world.remove_component::<Collider>(e);
                    }
                }
                Op::Poll => {}
            }
        }

        let colliders = world.signature::<(Collider,)>();
        for e in &spawned {
            let has = world.has_component::<Collider>(*e);
            prop_assert_eq!(has, world.get_component::<Collider>(*e).is_some());
            prop_assert_eq!(has, world.query(&colliders).any(|q| q == *e));
            if !world.is_alive(*e) {
                prop_assert!(!has);
            }
        }
        prop_assert_eq!(world.entity_count(), world.entities().count());
    }
}
