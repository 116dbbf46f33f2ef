//! Queries: which entities currently hold every component in a required set.
//!
//! A [`Query`] is nothing more than a sorted set of [`ComponentTypeId`]s.
//! Queries built through [`QueryBuilder`] are registered with the world's
//! [`QueryIndex`], which keeps the matching entities up to date as entities
//! come and go and as components are set or removed. Unregistered queries
//! fall back to a linear scan. Both paths yield the same ids in registry
//! insertion order.
//!
//! ```
//! use frameloop_ecs::prelude::*;
//!
//! struct Mesh;
//! struct Moving { going_left: bool }
//!
//! let mut world = World::new();
//! let query = QueryBuilder::new()
//!     .contains::<Mesh>()
//!     .contains::<Moving>()
//!     .build(&mut world);
//!
//! let e = world.spawn_bundle(
//!     ComponentBundle::new().with(Mesh).with(Moving { going_left: true }),
//! );
//! world.spawn_with(Mesh);
//!
//! assert_eq!(world.evaluate(&query), vec![e]);
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::component::{ComponentRegistry, ComponentSet, ComponentTypeId};
use crate::entity::{EntityId, EntityRegistry};
use crate::world::World;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A "contains all of" predicate over component types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    /// Sorted, deduplicated.
    required: Vec<ComponentTypeId>,
}

impl Query {
    /// Build a query directly from component type ids.
    pub fn from_types(types: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        let mut required: Vec<_> = types.into_iter().collect();
        required.sort();
        required.dedup();
        Self { required }
    }

    /// The required component types, sorted.
    pub fn required(&self) -> &[ComponentTypeId] {
        &self.required
    }

    /// True iff `components` holds every required type.
    pub fn matches_set(&self, components: &ComponentSet) -> bool {
        components.has_all(&self.required)
    }
}

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

type Resolver = fn(&mut ComponentRegistry) -> ComponentTypeId;

/// Fluent builder for [`Query`].
///
/// Component types are resolved (and registered if new) when the query is
/// built, so a query can name a type no entity has used yet. Such a query is
/// valid and simply matches nothing.
#[derive(Default)]
pub struct QueryBuilder {
    resolvers: Vec<Resolver>,
}

impl QueryBuilder {
    /// Create an empty builder. An empty query matches every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component type `T`.
    pub fn contains<T: 'static>(mut self) -> Self {
        self.resolvers.push(ComponentRegistry::register_or_get::<T>);
        self
    }

    /// Resolve the component types against `world` and register the query
    /// with its index.
    pub fn build(self, world: &mut World) -> Query {
        let query = Query::from_types(
            self.resolvers
                .iter()
                .map(|resolve| resolve(&mut world.registry))
                .collect::<Vec<_>>(),
        );
        world.index_query(&query);
        query
    }
}

// ---------------------------------------------------------------------------
// QueryIndex
// ---------------------------------------------------------------------------

/// Incrementally maintained results for every registered query signature.
///
/// Each signature maps to its matching entities keyed by registry insertion
/// sequence, so reading a result back is already in insertion order.
#[derive(Debug, Default)]
pub struct QueryIndex {
    cached: HashMap<Vec<ComponentTypeId>, BTreeMap<u64, EntityId>>,
}

impl QueryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `query`, seeding it from the current entities.
    pub(crate) fn track(&mut self, query: &Query, entities: &EntityRegistry<ComponentSet>) {
        if self.cached.contains_key(query.required()) {
            return;
        }
        let mut matching = BTreeMap::new();
        for (id, components) in entities.iter() {
            if query.matches_set(components) {
                if let Some(seq) = entities.sequence_of(id) {
                    matching.insert(seq, id);
                }
            }
        }
        tracing::debug!(signature = ?query.required(), matched = matching.len(), "query indexed");
        self.cached.insert(query.required().to_vec(), matching);
    }

    /// Cached result for `query`, if it is tracked.
    pub fn get(&self, query: &Query) -> Option<Vec<EntityId>> {
        self.cached
            .get(query.required())
            .map(|matching| matching.values().copied().collect())
    }

    /// Number of matching entities for a tracked query.
    pub fn count(&self, query: &Query) -> Option<usize> {
        self.cached.get(query.required()).map(BTreeMap::len)
    }

    /// The tracked signatures, sorted for stable output.
    pub fn cached_signatures(&self) -> Vec<Vec<ComponentTypeId>> {
        let mut sigs: Vec<_> = self.cached.keys().cloned().collect();
        sigs.sort();
        sigs
    }

    pub(crate) fn entity_added(&mut self, id: EntityId, seq: u64, components: &ComponentSet) {
        for (required, matching) in &mut self.cached {
            if components.has_all(required) {
                matching.insert(seq, id);
            }
        }
    }

    pub(crate) fn component_added(
        &mut self,
        id: EntityId,
        seq: u64,
        components: &ComponentSet,
        added: ComponentTypeId,
    ) {
        for (required, matching) in &mut self.cached {
            if required.binary_search(&added).is_ok() && components.has_all(required) {
                matching.insert(seq, id);
            }
        }
    }

    pub(crate) fn component_removed(&mut self, seq: u64, removed: ComponentTypeId) {
        for (required, matching) in &mut self.cached {
            if required.binary_search(&removed).is_ok() {
                matching.remove(&seq);
            }
        }
    }

    pub(crate) fn entity_removed(&mut self, seq: u64) {
        for matching in self.cached.values_mut() {
            matching.remove(&seq);
        }
    }
}

// ---------------------------------------------------------------------------
// World query methods
// ---------------------------------------------------------------------------

impl World {
    /// Register `query` with the index so later evaluations avoid a scan.
    pub fn index_query(&mut self, query: &Query) {
        self.query_index.track(query, &self.entities);
    }

    /// True iff `entity` is alive and currently holds every required type.
    pub fn matches(&self, query: &Query, entity: EntityId) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|components| query.matches_set(components))
    }

    /// Entities matching `query`, in insertion order.
    ///
    /// The result is a snapshot: entities may be added or removed while it is
    /// walked without affecting it.
    pub fn evaluate(&self, query: &Query) -> Vec<EntityId> {
        self.query_index
            .get(query)
            .unwrap_or_else(|| self.evaluate_scan(query))
    }

    /// Reference evaluation: filter every live entity against `query`.
    pub fn evaluate_scan(&self, query: &Query) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, components)| query.matches_set(components))
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of entities matching `query`.
    pub fn query_count(&self, query: &Query) -> usize {
        self.query_index
            .count(query)
            .unwrap_or_else(|| self.evaluate_scan(query).len())
    }

    /// Read-only access to the query index.
    pub fn query_index(&self) -> &QueryIndex {
        &self.query_index
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::world::{ComponentBundle, World};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Vel {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);

    fn pos_vel() -> ComponentBundle {
        ComponentBundle::new()
            .with(Pos { x: 1.0, y: 2.0 })
            .with(Vel { dx: 3.0, dy: 4.0 })
    }

    #[test]
    fn query_matching_only() {
        let mut world = World::new();
        let query = QueryBuilder::new()
            .contains::<Pos>()
            .contains::<Vel>()
            .build(&mut world);

        let e1 = world.spawn_bundle(pos_vel());
        let _e2 = world.spawn_with(Pos { x: 10.0, y: 20.0 });

        assert_eq!(world.evaluate(&query), vec![e1]);
        assert!(world.matches(&query, e1));
        assert!(!world.matches(&query, _e2));
    }

    #[test]
    fn unused_type_yields_empty() {
        let mut world = World::new();
        world.spawn_with(Pos { x: 0.0, y: 0.0 });
        let query = QueryBuilder::new().contains::<Health>().build(&mut world);
        assert!(world.evaluate(&query).is_empty());
        assert_eq!(world.query_count(&query), 0);
    }

    #[test]
    fn index_follows_component_changes() {
        let mut world = World::new();
        let query = QueryBuilder::new()
            .contains::<Pos>()
            .contains::<Vel>()
            .build(&mut world);

        let e = world.spawn_with(Pos { x: 0.0, y: 0.0 });
        assert!(world.evaluate(&query).is_empty());

        world.set(e, Vel { dx: 1.0, dy: 1.0 }).unwrap();
        assert_eq!(world.evaluate(&query), vec![e]);

        // Overwrite must not duplicate the entry.
        world.set(e, Vel { dx: 2.0, dy: 2.0 }).unwrap();
        assert_eq!(world.evaluate(&query), vec![e]);

        world.remove_component::<Vel>(e);
        assert!(world.evaluate(&query).is_empty());

        world.set(e, Vel { dx: 0.0, dy: 0.0 }).unwrap();
        world.despawn(e);
        assert!(world.evaluate(&query).is_empty());
    }

    #[test]
    fn results_follow_insertion_order() {
        let mut world = World::new();
        let query = QueryBuilder::new().contains::<Pos>().build(&mut world);
        let a = world.spawn_with(Pos { x: 0.0, y: 0.0 });
        let b = world.spawn_with(Health(3));
        let c = world.spawn_with(Pos { x: 1.0, y: 0.0 });
        // b gains Pos later but was inserted before c.
        world.set(b, Pos { x: 2.0, y: 0.0 }).unwrap();
        assert_eq!(world.evaluate(&query), vec![a, b, c]);
        assert_eq!(world.evaluate_scan(&query), vec![a, b, c]);
    }

    #[test]
    fn late_indexed_query_is_seeded() {
        let mut world = World::new();
        let a = world.spawn_bundle(pos_vel());
        let b = world.spawn_bundle(pos_vel());
        let query = QueryBuilder::new().contains::<Vel>().build(&mut world);
        assert_eq!(world.evaluate(&query), vec![a, b]);
        assert_eq!(world.query_index().cached_signatures().len(), 1);
    }

    #[test]
    fn unindexed_query_falls_back_to_scan() {
        let mut world = World::new();
        let a = world.spawn_bundle(pos_vel());
        let pos = world.component_type_id::<Pos>().unwrap();
        let query = Query::from_types([pos, pos]);
        assert_eq!(query.required().len(), 1);
        assert!(world.query_index().get(&query).is_none());
        assert_eq!(world.evaluate(&query), vec![a]);
    }
}
