// Headless world: flat ground, scripted actors and a log of everything the simulation did to them.

use glam::{DMat3, DVec3};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::domain::damage::Damage;
use crate::domain::geometry::BoundingBox;
use crate::domain::inventory::Inventory;
use crate::domain::ports::{ActorId, ActorView, BlockHit, WorldPort};

/// Half-width of actor bounds on X and Z.
const ACTOR_HALF_WIDTH: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub position: DVec3,
    pub strength: f64,
    pub incendiary: bool,
}

/// Side effects the simulation pushed into the world.
#[derive(Debug, Default)]
pub struct WorldLog {
    pub attacks: Vec<(ActorId, Damage)>,
    pub explosions: Vec<Explosion>,
    pub destroyed_blocks: Vec<DVec3>,
    pub fires: Vec<DVec3>,
}

#[derive(Debug, Clone)]
pub struct HeadlessActor {
    pub view: ActorView,
    pub inventory: Inventory,
    /// Hostile actors are what NPC launchers look for.
    pub hostile: bool,
    pub health: f64,
}

impl HeadlessActor {
    pub fn new(id: ActorId, position: DVec3, is_player: bool) -> Self {
        Self {
            view: ActorView {
                id,
                position,
                velocity: DVec3::ZERO,
                height: 1.8,
                eye_height: 1.62,
                look: DMat3::IDENTITY,
                is_player,
                valid: true,
            },
            inventory: Inventory::default(),
            hostile: false,
            health: 20.0,
        }
    }

    fn bounds(&self) -> BoundingBox {
        let half_height = self.view.height / 2.0;
        BoundingBox::new(
            self.view.position + DVec3::new(0.0, half_height, 0.0),
            ACTOR_HALF_WIDTH,
            half_height,
            ACTOR_HALF_WIDTH,
        )
    }
}

/// World with an optional flat ground plane, a few solid blocks and no terrain otherwise.
#[derive(Debug, Clone)]
pub struct FlatWorld {
    /// Top surface of the ground; `None` means open sky all the way down.
    pub ground_level: Option<f64>,
    /// Extra solid unit blocks, keyed by their minimum corner.
    pub blocks: BTreeSet<(i64, i64, i64)>,
    pub hardness: f32,
    /// Horizontal distance from the origin within which chunks are loaded; `None` loads all.
    pub loaded_radius: Option<f64>,
    actors: BTreeMap<ActorId, HeadlessActor>,
    log: Arc<Mutex<WorldLog>>,
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatWorld {
    pub fn new() -> Self {
        Self {
            ground_level: Some(0.0),
            blocks: BTreeSet::new(),
            hardness: 1.5,
            loaded_radius: None,
            actors: BTreeMap::new(),
            log: Arc::new(Mutex::new(WorldLog::default())),
        }
    }

    pub fn without_ground(mut self) -> Self {
        self.ground_level = None;
        self
    }

    /// Shared handle to the side-effect log, readable while the world is owned elsewhere.
    pub fn log(&self) -> Arc<Mutex<WorldLog>> {
        self.log.clone()
    }

    pub fn add_actor(&mut self, actor: HeadlessActor) -> ActorId {
        let id = actor.view.id;
        self.actors.insert(id, actor);
        id
    }

    /// Spawns a player at `position` looking along +Z.
    pub fn add_player(&mut self, position: DVec3) -> ActorId {
        self.add_actor(HeadlessActor::new(Uuid::new_v4(), position, true))
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut HeadlessActor> {
        self.actors.get_mut(&id)
    }

    pub fn remove_actor(&mut self, id: ActorId) -> Option<HeadlessActor> {
        self.actors.remove(&id)
    }

    pub fn set_look(&mut self, id: ActorId, look: DMat3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.view.look = look;
        }
    }

    fn ground_hit(&self, start: DVec3, end: DVec3) -> Option<BlockHit> {
        let ground = self.ground_level?;
        if start.y < ground || end.y >= ground {
            return None;
        }
        let t = (start.y - ground) / (start.y - end.y);
        let point = start.lerp(end, t);
        Some(BlockHit {
            block: DVec3::new(point.x.floor(), ground - 1.0, point.z.floor()),
            point,
        })
    }

    fn solid_block_hit(&self, start: DVec3, end: DVec3) -> Option<BlockHit> {
        self.blocks
            .iter()
            .filter_map(|&(x, y, z)| {
                let corner = DVec3::new(x as f64, y as f64, z as f64);
                let cube = BoundingBox::new(corner + DVec3::splat(0.5), 0.5, 0.5, 0.5);
                cube.intersection_point(start, end)
                    .map(|point| BlockHit { block: corner, point })
            })
            .min_by(|a, b| {
                start
                    .distance_squared(a.point)
                    .total_cmp(&start.distance_squared(b.point))
            })
    }

    fn with_log(&self, record: impl FnOnce(&mut WorldLog)) {
        if let Ok(mut log) = self.log.lock() {
            record(&mut log);
        }
    }
}

impl WorldPort for FlatWorld {
    fn is_chunk_loaded(&self, position: DVec3) -> bool {
        self.loaded_radius
            .is_none_or(|radius| DVec3::new(position.x, 0.0, position.z).length() <= radius)
    }

    fn block_hit(&self, start: DVec3, motion: DVec3) -> Option<BlockHit> {
        let end = start + motion;
        let hits = [self.ground_hit(start, end), self.solid_block_hit(start, end)];
        hits.into_iter().flatten().min_by(|a, b| {
            start
                .distance_squared(a.point)
                .total_cmp(&start.distance_squared(b.point))
        })
    }

    fn block_hardness(&self, _block: DVec3) -> f32 {
        self.hardness
    }

    fn destroy_block(&mut self, block: DVec3) {
        self.blocks
            .remove(&(block.x as i64, block.y as i64, block.z as i64));
        self.with_log(|log| log.destroyed_blocks.push(block));
    }

    fn set_on_fire(&mut self, hit: &BlockHit) {
        let point = hit.point;
        self.with_log(|log| log.fires.push(point));
    }

    fn actor(&self, id: ActorId) -> Option<ActorView> {
        self.actors.get(&id).map(|actor| actor.view.clone())
    }

    fn actors_along(&self, start: DVec3, motion: DVec3) -> Vec<ActorId> {
        let end = start + motion;
        let mut hits: Vec<(f64, ActorId)> = self
            .actors
            .values()
            .filter(|actor| actor.view.valid)
            .filter_map(|actor| {
                actor
                    .bounds()
                    .intersection_point(start, end)
                    .map(|point| (start.distance_squared(point), actor.view.id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    fn attack_actor(&mut self, id: ActorId, damage: &Damage) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.health -= damage.amount;
            if actor.health <= 0.0 {
                actor.view.valid = false;
            }
            debug!(actor_id = %id, amount = damage.amount, health = actor.health, "actor attacked");
        }
        let damage = damage.clone();
        self.with_log(|log| log.attacks.push((id, damage)));
    }

    fn hostiles_near(&self, controller: ActorId, radius: f64) -> Vec<ActorId> {
        let Some(origin) = self.actors.get(&controller).map(|actor| actor.view.position) else {
            return Vec::new();
        };
        self.actors
            .values()
            .filter(|actor| actor.hostile && actor.view.valid && actor.view.id != controller)
            .filter(|actor| actor.view.position.distance(origin) <= radius)
            .map(|actor| actor.view.id)
            .collect()
    }

    fn actor_looking_at(&self, viewer: ActorId, distance: f64) -> Option<ActorId> {
        let view = &self.actors.get(&viewer)?.view;
        let ray = view.look * DVec3::Z * distance;
        self.actors_along(view.eye_position(), ray)
            .into_iter()
            .find(|id| *id != viewer)
    }

    fn actor_inventory_mut(&mut self, id: ActorId) -> Option<&mut Inventory> {
        self.actors.get_mut(&id).map(|actor| &mut actor.inventory)
    }

    fn spawn_explosion(&mut self, position: DVec3, strength: f64, incendiary: bool) {
        self.with_log(|log| {
            log.explosions.push(Explosion {
                position,
                strength,
                incendiary,
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_segment_dips_below_ground_then_block_under_the_crossing_is_hit() {
        let world = FlatWorld::new();
        let hit = world
            .block_hit(DVec3::new(0.5, 2.0, 0.5), DVec3::new(0.0, -4.0, 4.0))
            .expect("ground should be hit");
        assert!((hit.point.y).abs() < 1e-9);
        assert!((hit.point.z - 2.5).abs() < 1e-9);
        assert_eq!(hit.block, DVec3::new(0.0, -1.0, 2.0));
    }

    #[test]
    fn when_block_is_closer_than_ground_then_block_wins() {
        let mut world = FlatWorld::new();
        world.blocks.insert((0, 0, 1));
        let hit = world
            .block_hit(DVec3::new(0.5, 1.5, 0.0), DVec3::new(0.0, -2.0, 4.0))
            .expect("something should be hit");
        assert_eq!(hit.block, DVec3::new(0.0, 0.0, 1.0));
        assert!((hit.point.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn when_actors_line_up_then_nearest_is_first() {
        let mut world = FlatWorld::new().without_ground();
        let far = world.add_player(DVec3::new(0.0, 0.0, 10.0));
        let near = world.add_player(DVec3::new(0.0, 0.0, 5.0));
        let along = world.actors_along(DVec3::new(0.0, 1.0, 0.0), DVec3::new(0.0, 0.0, 20.0));
        assert_eq!(along, vec![near, far]);
    }

    #[test]
    fn when_viewer_looks_at_actor_then_it_is_found() {
        let mut world = FlatWorld::new();
        let viewer = world.add_player(DVec3::ZERO);
        let target = world.add_player(DVec3::new(0.0, 0.0, 30.0));
        assert_eq!(world.actor_looking_at(viewer, 100.0), Some(target));
        assert_eq!(world.actor_looking_at(viewer, 10.0), None);
    }

    #[test]
    fn when_outside_loaded_radius_then_chunk_is_unloaded() {
        let world = FlatWorld {
            loaded_radius: Some(64.0),
            ..FlatWorld::new()
        };
        assert!(world.is_chunk_loaded(DVec3::new(10.0, 100.0, 10.0)));
        assert!(!world.is_chunk_loaded(DVec3::new(100.0, 0.0, 0.0)));
    }
}
