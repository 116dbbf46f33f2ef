//! The [`World`] is the top-level container for the ECS. It owns the entity
//! registry, the component registry, every entity's components, and the
//! query index.

use std::any::Any;

use crate::component::{ComponentRegistry, ComponentSet, ComponentTypeId};
use crate::entity::{EntityId, EntityRegistry};
use crate::query::QueryIndex;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentBundle
// ---------------------------------------------------------------------------

type Resolver = fn(&mut ComponentRegistry) -> ComponentTypeId;

/// A set of components to attach when spawning an entity.
///
/// ```ignore
/// let bundle = ComponentBundle::new()
///     .with(Position { x: 0.0, y: 0.0, z: 0.0 })
///     .with(Moving { going_left: true });
/// world.spawn_bundle(bundle);
/// ```
///
/// Adding a second component of a type already in the bundle replaces the
/// first, matching [`World::set`].
#[derive(Default)]
pub struct ComponentBundle {
    entries: Vec<(Resolver, Box<dyn Any>)>,
}

impl ComponentBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component to the bundle.
    pub fn with<T: 'static>(mut self, value: T) -> Self {
        self.add(value);
        self
    }

    /// Add a component to the bundle in place.
    pub fn add<T: 'static>(&mut self, value: T) {
        let resolve: Resolver = ComponentRegistry::register_or_get::<T>;
        let value: Box<dyn Any> = Box::new(value);
        self.entries.push((resolve, value));
    }

    /// Number of components in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no components.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_set(self, registry: &mut ComponentRegistry) -> ComponentSet {
        let mut set = ComponentSet::new();
        for (resolve, value) in self.entries {
            set.insert_boxed(resolve(registry), value);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The top-level ECS container.
///
/// Provides the primary API for entity lifecycle and component access.
/// Removing an entity drops its components, so any resource a component
/// owns is released at that point.
#[derive(Debug, Default)]
pub struct World {
    /// Component type registry.
    pub(crate) registry: ComponentRegistry,
    /// Entity ids and their components.
    pub(crate) entities: EntityRegistry<ComponentSet>,
    /// Incrementally maintained query results.
    pub(crate) query_index: QueryIndex,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a component type under an explicit name.
    ///
    /// Optional: types are registered under their Rust type name on first
    /// use otherwise.
    pub fn register_component<T: 'static>(&mut self, name: &str) -> ComponentTypeId {
        self.registry.register::<T>(name)
    }

    /// Look up the `ComponentTypeId` for a Rust type.
    pub fn component_type_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.registry.lookup::<T>()
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_bundle(ComponentBundle::new())
    }

    /// Spawn an entity with a single component.
    pub fn spawn_with<T: 'static>(&mut self, component: T) -> EntityId {
        self.spawn_bundle(ComponentBundle::new().with(component))
    }

    /// Spawn a new entity from a [`ComponentBundle`].
    pub fn spawn_bundle(&mut self, bundle: ComponentBundle) -> EntityId {
        let components = bundle.into_set(&mut self.registry);
        let entity = self.entities.add(components);
        if let (Some(seq), Some(components)) =
            (self.entities.sequence_of(entity), self.entities.get(entity))
        {
            self.query_index.entity_added(entity, seq, components);
        }
        entity
    }

    /// Remove an entity and drop its components.
    ///
    /// Returns `true` if the entity was alive. Removing an id that is not
    /// alive is a no-op.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(seq) = self.entities.sequence_of(entity) else {
            return false;
        };
        self.query_index.entity_removed(seq);
        self.entities.remove(entity).is_some()
    }

    /// Check whether an entity is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// Total number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Snapshot of live entity ids in insertion order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.ids()
    }

    // -- component access ---------------------------------------------------

    /// Set a component on an entity, overwriting any existing component of
    /// the same type. Returns the previous value, if any.
    pub fn set<T: 'static>(&mut self, entity: EntityId, value: T) -> Result<Option<T>, EcsError> {
        let type_id = self.registry.register_or_get::<T>();
        let seq = self
            .entities
            .sequence_of(entity)
            .ok_or(EcsError::StaleEntity { entity })?;
        let components = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::StaleEntity { entity })?;

        let previous = components.insert(type_id, value);
        if previous.is_none() {
            self.query_index
                .component_added(entity, seq, components, type_id);
        }
        Ok(previous)
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        let type_id = self.registry.lookup::<T>()?;
        self.entities.get(entity)?.get::<T>(type_id)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        let type_id = self.registry.lookup::<T>()?;
        self.entities.get_mut(entity)?.get_mut::<T>(type_id)
    }

    /// Remove a component from an entity and return it. A no-op returning
    /// `None` if the entity is dead or lacks the component.
    pub fn remove_component<T: 'static>(&mut self, entity: EntityId) -> Option<T> {
        let type_id = self.registry.lookup::<T>()?;
        let seq = self.entities.sequence_of(entity)?;
        let removed = self.entities.get_mut(entity)?.remove::<T>(type_id)?;
        self.query_index.component_removed(seq, type_id);
        Some(removed)
    }

    /// Check whether an entity has a given component type.
    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.registry
            .lookup::<T>()
            .is_some_and(|type_id| self.has_all(entity, &[type_id]))
    }

    /// True iff `entity` is alive and holds every type in `types`.
    pub fn has_all(&self, entity: EntityId, types: &[ComponentTypeId]) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|components| components.has_all(types))
    }

    /// The component types currently held by `entity`.
    pub fn component_types(&self, entity: EntityId) -> Option<Vec<ComponentTypeId>> {
        self.entities.get(entity).map(ComponentSet::type_ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
