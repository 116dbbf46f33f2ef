//! Built-in systems.

use frameloop_ecs::entity::EntityId;
use frameloop_ecs::query::{Query, QueryBuilder};
use frameloop_ecs::world::World;

use crate::components::{MeshHandle, Moving, Position};
use crate::scheduler::System;

/// Distance from the origin past which oscillating objects turn around.
pub const TRAVEL_BOUND: f64 = 2.0;

// ---------------------------------------------------------------------------
// MovementSystem
// ---------------------------------------------------------------------------

/// Moves every drawn, moving entity along x at one unit per second and turns
/// it around at [`TRAVEL_BOUND`].
///
/// The bound is checked against `x` as it was *before* this frame's step, so
/// the turn takes effect one frame after crossing. Starting at the origin and
/// heading left with `dt = 0.5`, an entity visits -0.5, -1.0, -1.5, -2.0,
/// -2.5 and -3.0, turning on the sixth update and heading back from there.
pub struct MovementSystem {
    query: Query,
}

impl MovementSystem {
    pub const NAME: &'static str = "movement";

    /// Create the system and register its query's component types on `world`.
    pub fn new(world: &mut World) -> Self {
        let query = QueryBuilder::new()
            .contains::<MeshHandle>()
            .contains::<Moving>()
            .contains::<Position>()
            .build(world);
        Self { query }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn update(&mut self, world: &mut World, entity: EntityId, dt: f64) {
        let Some(going_left) = world.get::<Moving>(entity).map(|m| m.going_left) else {
            return;
        };
        let Some(position) = world.get_mut::<Position>(entity) else {
            return;
        };

        let sampled = position.x;
        position.x += if going_left { -dt } else { dt };

        let turn = if sampled > TRAVEL_BOUND {
            Some(true)
        } else if sampled < -TRAVEL_BOUND {
            Some(false)
        } else {
            None
        };
        if let (Some(going_left), Some(moving)) = (turn, world.get_mut::<Moving>(entity)) {
            moving.going_left = going_left;
        }
    }
}

// ---------------------------------------------------------------------------
// TransformSyncSystem
// ---------------------------------------------------------------------------

/// Pushes each drawn entity's [`Position`] to its visual.
pub struct TransformSyncSystem {
    query: Query,
}

impl TransformSyncSystem {
    pub const NAME: &'static str = "transform_sync";

    /// Create the system and register its query's component types on `world`.
    pub fn new(world: &mut World) -> Self {
        let query = QueryBuilder::new()
            .contains::<MeshHandle>()
            .contains::<Position>()
            .build(world);
        Self { query }
    }
}

impl System for TransformSyncSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn update(&mut self, world: &mut World, entity: EntityId, _dt: f64) {
        if let (Some(position), Some(mesh)) = (
            world.get::<Position>(entity).copied(),
            world.get::<MeshHandle>(entity),
        ) {
            mesh.0.set_position(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use frameloop_ecs::world::ComponentBundle;

    use super::*;
    use crate::render::{HeadlessRenderer, Renderer, VisualHandle};
    use crate::scheduler::Scheduler;

    fn spawn_mover(world: &mut World, renderer: &Rc<dyn Renderer>, going_left: bool) -> EntityId {
        world.spawn_bundle(
            ComponentBundle::new()
                .with(MeshHandle(VisualHandle::create(renderer, "player")))
                .with(Moving { going_left })
                .with(Position::default()),
        )
    }

    #[test]
    fn six_half_second_steps_turn_on_the_sixth() {
        let renderer: Rc<dyn Renderer> = Rc::new(HeadlessRenderer::new(0));
        let mut world = World::new();
        let movement = MovementSystem::new(&mut world);
        let player = spawn_mover(&mut world, &renderer, true);

        let mut scheduler = Scheduler::new(world);
        scheduler.add_system(Box::new(movement));

        let mut xs = Vec::new();
        for _ in 0..6 {
            scheduler.run_frame(0.5);
            xs.push(scheduler.world().get::<Position>(player).map(|p| p.x));
        }
        let expected = [-0.5, -1.0, -1.5, -2.0, -2.5, -3.0];
        assert_eq!(xs, expected.map(Some).to_vec());
        assert_eq!(
            scheduler.world().get::<Moving>(player),
            Some(&Moving { going_left: false })
        );

        scheduler.run_frame(0.5);
        assert_eq!(scheduler.world().get::<Position>(player).map(|p| p.x), Some(-2.5));
    }

    #[test]
    fn turns_left_past_positive_bound() {
        let renderer: Rc<dyn Renderer> = Rc::new(HeadlessRenderer::new(0));
        let mut world = World::new();
        let mut movement = MovementSystem::new(&mut world);
        let e = spawn_mover(&mut world, &renderer, false);
        world.set(e, Position::new(2.5, 0.0, 0.0)).unwrap();

        movement.update(&mut world, e, 0.5);
        assert_eq!(world.get::<Position>(e).map(|p| p.x), Some(3.0));
        assert_eq!(world.get::<Moving>(e), Some(&Moving { going_left: true }));
    }

    #[test]
    fn entities_without_a_mesh_stay_put() {
        let mut world = World::new();
        let movement = MovementSystem::new(&mut world);
        let bare = world.spawn_bundle(
            ComponentBundle::new()
                .with(Moving { going_left: true })
                .with(Position::default()),
        );
        let mut scheduler = Scheduler::new(world);
        scheduler.add_system(Box::new(movement));
        scheduler.run_frame(1.0);
        assert_eq!(scheduler.world().get::<Position>(bare).map(|p| p.x), Some(0.0));
    }

    #[test]
    fn sync_pushes_positions_to_renderer() {
        let headless = Rc::new(HeadlessRenderer::new(0));
        let renderer: Rc<dyn Renderer> = headless.clone();
        let mut world = World::new();
        let movement = MovementSystem::new(&mut world);
        let sync = TransformSyncSystem::new(&mut world);
        let player = spawn_mover(&mut world, &renderer, true);
        let visual = world.get::<MeshHandle>(player).map(|m| m.0.id());

        let mut scheduler = Scheduler::new(world);
        scheduler.add_system(Box::new(movement));
        scheduler.add_system(Box::new(sync));
        scheduler.run_frame(0.5);

        let visual = visual.unwrap();
        assert_eq!(headless.position(visual), Some(Position::new(-0.5, 0.0, 0.0)));

        scheduler.world_mut().despawn(player);
        assert_eq!(headless.dispose_calls(), 1);
        assert_eq!(headless.stale_disposes(), 0);
        assert_eq!(headless.live_count(), 0);
    }
}
