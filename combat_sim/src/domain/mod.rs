// Domain layer: entities, the registry that ticks them, and the combat rules.

pub mod damage;
pub mod definitions;
pub mod entity;
pub mod geometry;
pub mod inventory;
pub mod launcher;
pub mod multipart;
pub mod ports;
pub mod projectile;
pub mod registry;
pub mod sync;
pub mod tuning;

pub use definitions::{ItemKey, PackRegistry};
pub use entity::{Capability, Entity, EntityCore, EntityHandle, EntityId, Side, UpdateType};
pub use launcher::{Launcher, LauncherState};
pub use multipart::{PlacedPart, Vehicle};
pub use ports::{ActorId, ActorView, BlockHit, WorldPort};
pub use projectile::Projectile;
pub use registry::EntityRegistry;
pub use sync::{Envelope, Recipient, SyncMessage};
