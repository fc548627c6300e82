// Use-case level inputs/outputs for the world loop.

use glam::{DMat3, DVec3};
use std::collections::BTreeMap;
use tokio::sync::oneshot;

use crate::domain::definitions::ItemKey;
use crate::domain::entity::{Entity, EntityId};
use crate::domain::multipart::{PlacedPartData, VehicleData};
use crate::domain::ports::ActorId;
use crate::domain::sync::{Envelope, SyncMessage};

#[derive(Debug)]
pub enum WorldEvent {
    /// Message from the other side of the simulation.
    Sync(SyncMessage),
    SpawnVehicle(VehicleData),
    PlacePart(PlacedPartData),
    SeatRider {
        vehicle: EntityId,
        seat: usize,
        rider: Option<ActorId>,
    },
    SelectLauncher {
        vehicle: EntityId,
        seat: usize,
        item: Option<ItemKey>,
        index: usize,
    },
    SeatTrigger {
        vehicle: EntityId,
        seat: usize,
        pressed: bool,
    },
    LoadAmmo {
        launcher: EntityId,
        item: ItemKey,
    },
    Save {
        reply: oneshot::Sender<serde_json::Value>,
    },
}

/// High-level lifecycle of a hosted world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    Loading,
    Running,
    Closed,
}

/// Render-facing view of one entity after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: &'static str,
    pub position: DVec3,
    pub motion: DVec3,
    pub orientation: DMat3,
    pub variables: BTreeMap<String, f64>,
}

impl From<&dyn Entity> for EntitySnapshot {
    fn from(entity: &dyn Entity) -> Self {
        let core = entity.core();
        Self {
            id: core.uuid,
            kind: entity.name(),
            position: core.position,
            motion: core.motion,
            orientation: core.orientation,
            variables: core.variables.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    /// Sync messages produced during the tick.
    pub messages: Vec<Envelope>,
    pub entities: Vec<EntitySnapshot>,
}
