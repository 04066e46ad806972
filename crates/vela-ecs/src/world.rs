//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator, the component registry, one sparse set per component kind, the
//! per-entity kind masks and the edge-detection state of tracked queries.
//!
//! The world holds data only; all behavior lives in systems.

use crate::component::{ComponentMask, ComponentRegistry, ComponentTypeId};
use crate::entity::{EntityAllocator, EntityId};
use crate::query::{ComponentSet, Signature, TrackedQuery};
use crate::storage::{ErasedStorage, SparseSet};
use crate::EcsError;

/// Component database keyed by [`EntityId`].
pub struct World {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    /// Indexed by `ComponentTypeId::index()`.
    storages: Vec<Box<dyn ErasedStorage>>,
    /// Indexed by entity slot; only meaningful for live slots.
    masks: Vec<ComponentMask>,
    tracked: Vec<TrackedQuery>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.allocator.alive_count())
            .field("components", &self.registry.registered_names())
            .field("tracked_queries", &self.tracked.len())
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with no registered components.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            storages: Vec::new(),
            masks: Vec::new(),
            tracked: Vec::new(),
        }
    }

    // -- registration -------------------------------------------------------

    /// Register component type `T` under `name`.
    ///
    /// Idempotent per Rust type. See [`ComponentRegistry::register`] for the
    /// panics.
    pub fn register_component<T: 'static>(&mut self, name: &str) -> ComponentTypeId {
        let id = self.registry.register::<T>(name);
        if id.index() == self.storages.len() {
            self.storages.push(Box::new(SparseSet::<T>::new()));
        }
        id
    }

    /// The registry of known component kinds.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The id `T` was registered under, if any.
    pub fn component_type_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.registry.lookup::<T>()
    }

    fn storage<T: 'static>(&self) -> Option<&SparseSet<T>> {
        let id = self.registry.lookup::<T>()?;
        self.storages[id.index()].as_any().downcast_ref()
    }

    fn storage_mut<T: 'static>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.registry.lookup::<T>()?;
        self.storages[id.index()].as_any_mut().downcast_mut()
    }

    fn unknown_component<T>(&self) -> EcsError {
        EcsError::UnknownComponent {
            name: std::any::type_name::<T>().to_owned(),
            registered: self.registry.registered_names().join(", "),
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        let idx = entity.index() as usize;
        if idx >= self.masks.len() {
            self.masks.resize(idx + 1, ComponentMask::EMPTY);
        }
        self.masks[idx] = ComponentMask::EMPTY;
        self.notify(entity, Some(ComponentMask::EMPTY));
        entity
    }

    /// Create an entity carrying a single component.
    pub fn spawn_with<T: 'static>(&mut self, component: T) -> Result<EntityId, EcsError> {
        if self.registry.lookup::<T>().is_none() {
            return Err(self.unknown_component::<T>());
        }
        let entity = self.spawn();
        self.insert_component(entity, component)?;
        Ok(entity)
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Counts as an exit for every tracked signature the entity matched.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.allocator.deallocate(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        let mask = std::mem::take(&mut self.masks[entity.index() as usize]);
        for kind in mask.ids() {
            self.storages[kind.index()].remove_entity(entity);
        }
        self.notify(entity, None);
        tracing::trace!(entity = %entity, "despawned");
        Ok(())
    }

    /// Whether `entity` is alive in this world.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Live entities in ascending slot order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.iter_alive()
    }

    /// Destroy every entity at once.
    ///
    /// Tracked signatures are reset rather than fed exit transitions: a bulk
    /// reset is expected to tear down any paired resources in bulk too.
    pub fn clear(&mut self) {
        self.allocator.clear();
        for storage in &mut self.storages {
            storage.clear();
        }
        self.masks.iter_mut().for_each(|m| *m = ComponentMask::EMPTY);
        for query in &mut self.tracked {
            query.reset();
        }
    }

    // -- components ---------------------------------------------------------

    /// Attach `value` to `entity`, overwriting any previous value of the kind.
    pub fn insert_component<T: 'static>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        let kind = self
            .registry
            .lookup::<T>()
            .ok_or_else(|| self.unknown_component::<T>())?;
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        if let Some(storage) = self.storage_mut::<T>() {
            storage.insert(entity, value);
        }
        let idx = entity.index() as usize;
        let old = self.masks[idx];
        if !old.contains(kind) {
            let new = old.with(kind);
            self.masks[idx] = new;
            self.notify(entity, Some(new));
        }
        Ok(())
    }

    /// Detach and return `entity`'s `T`, if it had one.
    pub fn remove_component<T: 'static>(&mut self, entity: EntityId) -> Result<Option<T>, EcsError> {
        let kind = self
            .registry
            .lookup::<T>()
            .ok_or_else(|| self.unknown_component::<T>())?;
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        let removed = self.storage_mut::<T>().and_then(|s| s.remove(entity));
        let idx = entity.index() as usize;
        let old = self.masks[idx];
        if old.contains(kind) {
            let new = old.without(kind);
            self.masks[idx] = new;
            self.notify(entity, Some(new));
        }
        Ok(removed)
    }

    /// Borrow `entity`'s `T`. `None` if the entity is dead, lacks the
    /// component or `T` was never registered.
    pub fn get_component<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Mutably borrow `entity`'s `T`. Does not change the entity's mask, so
    /// tracked queries see no transition.
    pub fn get_component_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Whether `entity` currently carries a `T`.
    pub fn has_component<T: 'static>(&self, entity: EntityId) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    /// The kind mask of a live entity.
    pub fn mask_of_entity(&self, entity: EntityId) -> Option<ComponentMask> {
        self.allocator
            .is_alive(entity)
            .then(|| self.masks[entity.index() as usize])
    }

    /// Names of the kinds attached to `entity`, in registration order.
    pub fn component_names(&self, entity: EntityId) -> Vec<&str> {
        self.mask_of_entity(entity)
            .map(|mask| {
                mask.ids()
                    .filter_map(|id| self.registry.get_info(id))
                    .map(|info| info.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    // -- queries ------------------------------------------------------------

    /// Mask of the kinds in tuple `S`; unregistered kinds are skipped.
    pub fn mask_of<S: ComponentSet>(&self) -> ComponentMask {
        S::mask(&self.registry).unwrap_or(ComponentMask::EMPTY)
    }

    /// Signature requiring every kind in tuple `S`.
    ///
    /// If any kind is unregistered no entity can carry it, so the signature
    /// matches nothing.
    pub fn signature<S: ComponentSet>(&self) -> Signature {
        S::mask(&self.registry)
            .map(Signature::new)
            .unwrap_or_else(Signature::unsatisfiable)
    }

    /// Live entities matching `signature`, in ascending slot order.
    pub fn query<'w>(&'w self, signature: &Signature) -> impl Iterator<Item = EntityId> + 'w {
        let signature = *signature;
        self.allocator
            .iter_alive()
            .filter(move |e| signature.matches(self.masks[e.index() as usize]))
    }

    /// Start tracking `signature` without draining anything.
    pub fn track(&mut self, signature: &Signature) {
        self.tracked_index(signature);
    }

    /// Entities that started matching `signature` since the previous poll.
    ///
    /// The first poll reports every entity currently matching.
    pub fn query_entered(&mut self, signature: &Signature) -> Vec<EntityId> {
        let idx = self.tracked_index(signature);
        self.tracked[idx].take_entered()
    }

    /// Entities that stopped matching `signature` since the previous poll.
    pub fn query_exited(&mut self, signature: &Signature) -> Vec<EntityId> {
        let idx = self.tracked_index(signature);
        self.tracked[idx].take_exited()
    }

    fn tracked_index(&mut self, signature: &Signature) -> usize {
        if let Some(idx) = self.tracked.iter().position(|q| q.signature == *signature) {
            return idx;
        }
        let current: Vec<EntityId> = self.query(signature).collect();
        self.tracked
            .push(TrackedQuery::new(*signature, current.into_iter()));
        self.tracked.len() - 1
    }

    fn notify(&mut self, entity: EntityId, mask: Option<ComponentMask>) {
        for query in &mut self.tracked {
            query.observe(entity, mask);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
