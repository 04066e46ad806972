//! Signatures and edge-detected queries.
//!
//! A [`Signature`] is a conjunction of required component kinds plus an
//! optional set of excluded kinds. [`World::query`](crate::world::World::query)
//! matches it against per-entity masks.
//!
//! Tracked queries add edge detection on top: the world keeps the member set
//! of every signature that has been polled with
//! [`query_entered`](crate::world::World::query_entered) or
//! [`query_exited`](crate::world::World::query_exited) and buffers membership
//! transitions as they happen. Each buffer is drained by its poll.
//!
//! Transition rules, per signature and entity:
//!
//! - entering adds the id to the entered buffer;
//! - exiting while the id still sits unpolled in the entered buffer cancels
//!   that entry and records nothing else (nobody saw it enter);
//! - otherwise exiting adds the id to the exited buffer.
//!
//! An exit followed by a re-entry between two polls therefore shows up in both
//! views; consumers that pair resources with membership must process exits
//! before entries.

use std::collections::HashSet;

use crate::component::{ComponentMask, ComponentRegistry};
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// A tuple of component types, e.g. `(Transform, Velocity)`.
pub trait ComponentSet {
    /// Mask of the tuple's kinds, or `None` if any is unregistered.
    fn mask(registry: &ComponentRegistry) -> Option<ComponentMask>;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: 'static),+> ComponentSet for ($($ty,)+) {
            fn mask(registry: &ComponentRegistry) -> Option<ComponentMask> {
                let mut mask = ComponentMask::EMPTY;
                $(mask = mask.with(registry.lookup::<$ty>()?);)+
                Some(mask)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Which entities a query selects: all of `required`, none of `excluded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    required: ComponentMask,
    excluded: ComponentMask,
    /// False when a required kind was never registered; matches nothing.
    satisfiable: bool,
}

impl Signature {
    /// Signature requiring every kind in `required`.
    pub fn new(required: ComponentMask) -> Self {
        Self {
            required,
            excluded: ComponentMask::EMPTY,
            satisfiable: true,
        }
    }

    /// A signature no entity can match.
    pub fn unsatisfiable() -> Self {
        Self {
            required: ComponentMask::EMPTY,
            excluded: ComponentMask::EMPTY,
            satisfiable: false,
        }
    }

    /// Additionally reject entities carrying any kind in `excluded`.
    pub fn without(mut self, excluded: ComponentMask) -> Self {
        self.excluded = self.excluded.union(excluded);
        self
    }

    pub fn required(&self) -> ComponentMask {
        self.required
    }

    pub fn excluded(&self) -> ComponentMask {
        self.excluded
    }

    /// Whether an entity with `mask` satisfies this signature.
    #[inline]
    pub fn matches(&self, mask: ComponentMask) -> bool {
        self.satisfiable && mask.contains_all(self.required) && !mask.intersects(self.excluded)
    }
}

// ---------------------------------------------------------------------------
// TrackedQuery
// ---------------------------------------------------------------------------

/// Membership and pending transitions of one polled signature.
#[derive(Debug)]
pub(crate) struct TrackedQuery {
    pub(crate) signature: Signature,
    members: HashSet<EntityId>,
    entered: Vec<EntityId>,
    exited: Vec<EntityId>,
}

impl TrackedQuery {
    /// Start tracking; every current match counts as freshly entered.
    pub(crate) fn new(signature: Signature, current: impl Iterator<Item = EntityId>) -> Self {
        let mut query = Self {
            signature,
            members: HashSet::new(),
            entered: Vec::new(),
            exited: Vec::new(),
        };
        for entity in current {
            query.members.insert(entity);
            query.entered.push(entity);
        }
        query
    }

    /// Record `entity`'s mask change. `None` means "not alive".
    pub(crate) fn observe(
        &mut self,
        entity: EntityId,
        new_mask: Option<ComponentMask>,
    ) {
        let was_member = self.members.contains(&entity);
        let is_member = new_mask.is_some_and(|mask| self.signature.matches(mask));

        match (was_member, is_member) {
            (false, true) => {
                self.members.insert(entity);
                self.entered.push(entity);
            }
            (true, false) => {
                self.members.remove(&entity);
                if let Some(pos) = self.entered.iter().position(|&e| e == entity) {
                    self.entered.remove(pos);
                } else {
                    self.exited.push(entity);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn take_entered(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.entered)
    }

    pub(crate) fn take_exited(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.exited)
    }

    /// Forget every member and pending transition.
    pub(crate) fn reset(&mut self) {
        self.members.clear();
        self.entered.clear();
        self.exited.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
