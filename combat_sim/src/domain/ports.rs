use glam::{DMat3, DVec3};
use uuid::Uuid;

use crate::domain::damage::Damage;
use crate::domain::inventory::Inventory;

/// Identifier of an actor owned by the platform (players, mobs).
pub type ActorId = Uuid;

/// Read-only view of a platform actor at the time of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorView {
    pub id: ActorId,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Full height of the actor's bounds.
    pub height: f64,
    pub eye_height: f64,
    /// Look orientation; forward is +Z.
    pub look: DMat3,
    pub is_player: bool,
    pub valid: bool,
}

impl ActorView {
    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }
}

/// Result of a segment-vs-blocks query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockHit {
    /// Position of the struck block.
    pub block: DVec3,
    /// Point on the block face where the segment hit.
    pub point: DVec3,
}

// Port for the world the simulation runs in. Block, chunk and actor mechanics live behind it.
pub trait WorldPort: Send {
    fn is_chunk_loaded(&self, position: DVec3) -> bool;
    /// First block struck by the segment `start..start + motion`.
    fn block_hit(&self, start: DVec3, motion: DVec3) -> Option<BlockHit>;
    fn block_hardness(&self, block: DVec3) -> f32;
    fn destroy_block(&mut self, block: DVec3);
    fn set_on_fire(&mut self, hit: &BlockHit);
    fn actor(&self, id: ActorId) -> Option<ActorView>;
    /// Actors whose bounds the segment passes through, nearest first.
    fn actors_along(&self, start: DVec3, motion: DVec3) -> Vec<ActorId>;
    fn attack_actor(&mut self, id: ActorId, damage: &Damage);
    /// Actors hostile to `controller` within `radius`.
    fn hostiles_near(&self, controller: ActorId, radius: f64) -> Vec<ActorId>;
    /// Actor the viewer is looking at within `distance`.
    fn actor_looking_at(&self, viewer: ActorId, distance: f64) -> Option<ActorId>;
    fn actor_inventory_mut(&mut self, id: ActorId) -> Option<&mut Inventory>;
    fn spawn_explosion(&mut self, position: DVec3, strength: f64, incendiary: bool);
}
