//! Component kind registration and signature masks.
//!
//! Every component type must be registered in a [`ComponentRegistry`] before
//! it can be attached. Registration hands out a dense [`ComponentTypeId`],
//! which is also the bit position of that kind inside a [`ComponentMask`].
//! Per-entity masks are what queries match against.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Upper bound on registered component kinds (one bit each in a mask).
pub const MAX_COMPONENT_KINDS: usize = 64;

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque identifier for a registered component kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Position of this kind in registration order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentMask
// ---------------------------------------------------------------------------

/// A set of component kinds packed into a bitset.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Mask containing exactly the given kinds.
    pub fn from_ids(ids: &[ComponentTypeId]) -> Self {
        ids.iter().fold(Self::EMPTY, |mask, &id| mask.with(id))
    }

    /// Copy of `self` with `id` added.
    #[inline]
    pub fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | 1 << id.0)
    }

    /// Copy of `self` with `id` removed.
    #[inline]
    pub fn without(self, id: ComponentTypeId) -> Self {
        Self(self.0 & !(1 << id.0))
    }

    #[inline]
    pub fn contains(self, id: ComponentTypeId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    /// Whether every kind in `other` is also in `self`.
    #[inline]
    pub fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share at least one kind.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of both sets.
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set.
    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// The kinds in ascending id order.
    pub fn ids(self) -> impl Iterator<Item = ComponentTypeId> {
        (0..MAX_COMPONENT_KINDS as u32)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(ComponentTypeId)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component kind.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentTypeId,
    /// Human-readable name supplied at registration.
    pub name: String,
    /// Rust `TypeId`, used to route typed access to the right storage.
    pub type_id: TypeId,
    /// `std::any::type_name::<T>()`, for diagnostics.
    pub type_name: &'static str,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Maps Rust types and names to [`ComponentTypeId`]s.
///
/// A type is registered once; later registrations of the same type return the
/// existing id and ignore the new name.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`, returning its id.
    ///
    /// # Panics
    ///
    /// - If more than [`MAX_COMPONENT_KINDS`] kinds are registered.
    /// - If `name` is already taken by a different type.
    pub fn register<T: 'static>(&mut self, name: &str) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }

        assert!(
            self.infos.len() < MAX_COMPONENT_KINDS,
            "cannot register component '{name}': limit of {MAX_COMPONENT_KINDS} kinds reached"
        );
        assert!(
            !self.by_name.contains_key(name),
            "component name '{name}' is already registered for a different type"
        );

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: name.to_owned(),
            type_id: rust_type_id,
            type_name: std::any::type_name::<T>(),
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(name.to_owned(), id);
        id
    }

    /// Look up a kind by its Rust type.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a kind by its registered name.
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered kinds, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
