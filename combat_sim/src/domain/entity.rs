// Domain entities: shared per-entity state and the capability trait the registry drives.

use glam::{DMat3, DVec3};
use rand_chacha::ChaCha8Rng;
use std::any::Any;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::definitions::PackRegistry;
use crate::domain::geometry::BoundingBox;
use crate::domain::multipart::MultipartBody;
use crate::domain::ports::WorldPort;
use crate::domain::registry::{EntityRegistry, GunRecord};
use crate::domain::tuning::SimTuning;

/// Stable identity of a synced entity, shared between server and clients.
pub type EntityId = Uuid;

/// Per-registry slot number. Unlike the UUID it is never reused and never leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(pub(crate) u64);

/// Which registry pass updates the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    Main,
    /// After every main-pass entity, for things that read their mount's fresh pose.
    Last,
    None,
}

/// Capabilities an entity may expose; used for "extends type" style queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Renderable,
    /// Backed by a pack definition; gets a post-update pass.
    Definable,
    /// Can be attacked and collided with.
    Interactable,
    Multipart,
    Towable,
    Launcher,
    Projectile,
}

/// Whether this copy of the simulation is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

/// State every entity carries.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCore {
    pub uuid: EntityId,
    pub position: DVec3,
    pub prev_position: DVec3,
    /// Blocks per tick.
    pub motion: DVec3,
    pub prev_motion: DVec3,
    pub orientation: DMat3,
    pub prev_orientation: DMat3,
    pub ticks_existed: u64,
    /// Cleared to have the registry remove the entity after its update.
    pub valid: bool,
    pub bounding_box: BoundingBox,
    /// Named animation/state variables; absent means 0.
    pub variables: BTreeMap<String, f64>,
}

impl EntityCore {
    pub fn new(uuid: EntityId, position: DVec3, orientation: DMat3, motion: DVec3) -> Self {
        Self {
            uuid,
            position,
            prev_position: position,
            motion,
            prev_motion: motion,
            orientation,
            prev_orientation: orientation,
            ticks_existed: 0,
            valid: true,
            bounding_box: BoundingBox::new(position, 0.0, 0.0, 0.0),
            variables: BTreeMap::new(),
        }
    }

    pub fn velocity(&self) -> f64 {
        self.motion.length()
    }

    /// Copies the current pose into the interpolation slots.
    pub fn snapshot_previous(&mut self) {
        self.prev_position = self.position;
        self.prev_motion = self.motion;
        self.prev_orientation = self.orientation;
    }

    pub fn variable(&self, name: &str) -> f64 {
        self.variables.get(name).copied().unwrap_or(0.0)
    }

    /// Sets a variable, removing it when the value is 0.
    pub fn set_variable(&mut self, name: &str, value: f64) {
        if value == 0.0 {
            self.variables.remove(name);
        } else {
            self.variables.insert(name.to_string(), value);
        }
    }
}

/// Everything an entity may touch while it updates.
///
/// The updating entity is detached from the registry for the duration of the call, so lookups
/// never alias it.
pub struct TickContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub world: &'a mut dyn WorldPort,
    pub pack: &'a PackRegistry,
    pub tuning: &'a SimTuning,
    pub rng: &'a mut ChaCha8Rng,
}

impl TickContext<'_> {
    pub fn is_client(&self) -> bool {
        self.registry.side() == Side::Client
    }
}

/// A simulated actor owned by the registry.
pub trait Entity: Any + Send {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Short type name for logs.
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn has_capability(&self, capability: Capability) -> bool;

    fn update(&mut self, ctx: &mut TickContext<'_>);

    /// Derives state that depends on this tick's physics. Only called for definable entities.
    fn post_update(&mut self, _ctx: &mut TickContext<'_>) {}

    fn update_type(&self) -> UpdateType {
        UpdateType::Main
    }

    /// Synced entities are tracked by UUID and mirrored on clients.
    fn should_sync(&self) -> bool {
        true
    }

    fn can_collide(&self) -> bool {
        false
    }

    /// Saved with the world and broadcast to clients when added on the server.
    fn loads_from_world_data(&self) -> bool {
        false
    }

    /// Gate checked before every update, e.g. for unloaded chunks.
    fn can_update(&self, _world: &dyn WorldPort) -> bool {
        true
    }

    /// Tower of a tow-chain link. A link whose tower is still registered is updated by it.
    fn towed_by(&self) -> Option<EntityId> {
        None
    }

    /// Next link of a tow chain, updated right after this entity.
    fn towed_entity(&self) -> Option<EntityId> {
        None
    }

    /// Serialized state for persistence and full sync.
    fn save(&self, _registry: &EntityRegistry) -> Option<serde_json::Value> {
        None
    }

    fn as_multipart(&self) -> Option<&MultipartBody> {
        None
    }

    fn as_multipart_mut(&mut self) -> Option<&mut MultipartBody> {
        None
    }

    /// Present for launchers; recorded so projectiles can resolve their origin later.
    fn gun_record(&self) -> Option<GunRecord> {
        None
    }

    /// (launcher UUID, bullet number) for projectiles.
    fn bullet_key(&self) -> Option<(EntityId, u32)> {
        None
    }

    fn uuid(&self) -> EntityId {
        self.core().uuid
    }

    fn is_valid(&self) -> bool {
        self.core().valid
    }
}
