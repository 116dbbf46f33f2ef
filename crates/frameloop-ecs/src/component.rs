//! Component type registration and per-entity component storage.
//!
//! Any `'static` Rust type can be a component. The first time a type is used
//! it is assigned a [`ComponentTypeId`] in the [`ComponentRegistry`]; that id
//! is the key for component lookup and query matching.
//!
//! A [`ComponentSet`] holds the components of a single entity. It carries no
//! behaviour and no back-reference to its owner.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Unique ID assigned at registration time.
    pub id: ComponentTypeId,
    /// Human-readable name.
    pub name: String,
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types to [`ComponentTypeId`]s and their metadata.
///
/// A type can only be registered once; subsequent registrations of the same
/// Rust `TypeId` return the existing [`ComponentTypeId`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    /// Indexed by ComponentTypeId.0.
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type under the given `name`.
    ///
    /// If the type has already been registered, the existing
    /// [`ComponentTypeId`] is returned and `name` is ignored.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken by a different type.
    pub fn register<T: 'static>(&mut self, name: &str) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        assert!(
            !self.by_name.contains_key(name),
            "component name '{name}' is already registered for a different type"
        );

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: name.to_owned(),
            type_id: rust_type_id,
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(name.to_owned(), id);
        id
    }

    /// Return the id for `T`, registering it under its Rust type name if it
    /// has not been seen yet.
    pub fn register_or_get<T: 'static>(&mut self) -> ComponentTypeId {
        match self.lookup::<T>() {
            Some(id) => id,
            None => self.register::<T>(std::any::type_name::<T>()),
        }
    }

    /// Look up a component type by its Rust `TypeId`.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a component type by its registered name.
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Get the [`ComponentInfo`] for a registered component type ID.
    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Returns the names of all registered component types, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// The components owned by one entity, at most one per type.
#[derive(Default)]
pub struct ComponentSet {
    components: HashMap<ComponentTypeId, Box<dyn Any>>,
}

impl ComponentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `id`, returning the previous value of that type
    /// if there was one. Last write wins.
    pub fn insert<T: 'static>(&mut self, id: ComponentTypeId, value: T) -> Option<T> {
        self.components
            .insert(id, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub(crate) fn insert_boxed(&mut self, id: ComponentTypeId, value: Box<dyn Any>) {
        self.components.insert(id, value);
    }

    /// Borrow the value stored under `id`, if it has type `T`.
    pub fn get<T: 'static>(&self, id: ComponentTypeId) -> Option<&T> {
        self.components.get(&id)?.downcast_ref::<T>()
    }

    /// Mutably borrow the value stored under `id`, if it has type `T`.
    pub fn get_mut<T: 'static>(&mut self, id: ComponentTypeId) -> Option<&mut T> {
        self.components.get_mut(&id)?.downcast_mut::<T>()
    }

    /// Remove and return the component stored under `id`.
    pub fn remove<T: 'static>(&mut self, id: ComponentTypeId) -> Option<T> {
        let boxed = self.components.remove(&id)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Whether a value is stored under `id`.
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        self.components.contains_key(&id)
    }

    /// True iff every type in `required` is present.
    pub fn has_all(&self, required: &[ComponentTypeId]) -> bool {
        required.iter().all(|id| self.components.contains_key(id))
    }

    /// The component types present, sorted.
    pub fn type_ids(&self) -> Vec<ComponentTypeId> {
        let mut ids: Vec<_> = self.components.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of stored components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no component is stored.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSet")
            .field("types", &self.type_ids())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
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

    #[test]
    fn register_and_lookup() {
        let mut reg = ComponentRegistry::new();
        let id = reg.register::<Pos>("position");
        assert_eq!(reg.lookup::<Pos>(), Some(id));
        assert_eq!(reg.lookup_by_name("position"), Some(id));
    }

    #[test]
    fn same_type_same_id() {
        let mut reg = ComponentRegistry::new();
        let id1 = reg.register::<Pos>("position");
        let id2 = reg.register::<Pos>("position_again");
        assert_eq!(id1, id2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn register_or_get_uses_type_name() {
        let mut reg = ComponentRegistry::new();
        let id = reg.register_or_get::<Vel>();
        let info = reg.get_info(id).unwrap();
        assert!(info.name.ends_with("Vel"));
        assert_eq!(info.type_id, TypeId::of::<Vel>());
        assert_eq!(reg.register_or_get::<Vel>(), id);
    }

    #[test]
    #[should_panic(expected = "already registered for a different type")]
    fn name_collision_panics() {
        let mut reg = ComponentRegistry::new();
        reg.register::<Pos>("thing");
        reg.register::<Vel>("thing");
    }

    #[test]
    fn set_overwrites_and_returns_previous() {
        let mut reg = ComponentRegistry::new();
        let pos = reg.register::<Pos>("position");
        let mut set = ComponentSet::new();
        assert_eq!(set.insert(pos, Pos { x: 1.0, y: 1.0 }), None);
        let prev = set.insert(pos, Pos { x: 2.0, y: 3.0 });
        assert_eq!(prev, Some(Pos { x: 1.0, y: 1.0 }));
        assert_eq!(set.get::<Pos>(pos), Some(&Pos { x: 2.0, y: 3.0 }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn has_all_requires_every_type() {
        let mut reg = ComponentRegistry::new();
        let pos = reg.register::<Pos>("position");
        let vel = reg.register::<Vel>("velocity");
        let mut set = ComponentSet::new();
        set.insert(pos, Pos { x: 0.0, y: 0.0 });
        assert!(set.has_all(&[pos]));
        assert!(!set.has_all(&[pos, vel]));
        assert!(set.has_all(&[]));
        set.insert(vel, Vel { dx: 1.0, dy: 0.0 });
        assert!(set.has_all(&[vel, pos]));
        assert_eq!(set.remove::<Vel>(vel), Some(Vel { dx: 1.0, dy: 0.0 }));
        assert!(!set.contains(vel));
    }
}
