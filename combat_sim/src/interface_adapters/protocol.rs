// Wire protocol DTOs and conversions for messages between simulation sides.

use crate::domain::definitions::ItemKey;
use crate::domain::entity::EntityId;
use crate::domain::ports::ActorId;
use crate::domain::sync::{Envelope, Recipient, SyncMessage};
use crate::use_cases::{EntitySnapshot, WorldEvent, WorldUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the host sends to connected observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
}

/// Messages a client sends to the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Asks for the state of every world entity.
    Join { player_id: ActorId },
    Mount {
        vehicle: EntityId,
        seat: usize,
        player_id: Option<ActorId>,
    },
    SelectLauncher {
        vehicle: EntityId,
        seat: usize,
        #[serde(default)]
        item: Option<ItemKey>,
        #[serde(default)]
        index: usize,
    },
    Trigger {
        vehicle: EntityId,
        seat: usize,
        pressed: bool,
    },
    Sync(SyncMessageDto),
}

impl From<ClientMessage> for WorldEvent {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Join { player_id } => {
                WorldEvent::Sync(SyncMessage::PlayerJoin { player: player_id })
            }
            ClientMessage::Mount {
                vehicle,
                seat,
                player_id,
            } => WorldEvent::SeatRider {
                vehicle,
                seat,
                rider: player_id,
            },
            ClientMessage::SelectLauncher {
                vehicle,
                seat,
                item,
                index,
            } => WorldEvent::SelectLauncher {
                vehicle,
                seat,
                item,
                index,
            },
            ClientMessage::Trigger {
                vehicle,
                seat,
                pressed,
            } => WorldEvent::SeatTrigger {
                vehicle,
                seat,
                pressed,
            },
            ClientMessage::Sync(message) => WorldEvent::Sync(SyncMessage::from(message)),
        }
    }
}

/// Sync message as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SyncMessageDto {
    EntityData {
        data: serde_json::Value,
    },
    VariableSet {
        entity: EntityId,
        variable: String,
        value: f64,
    },
    LauncherReload {
        launcher: EntityId,
        #[serde(flatten)]
        item: ItemKey,
    },
    BulletHitBlock {
        position: [f64; 3],
    },
    Chat {
        player: ActorId,
        message: String,
    },
    PlayerJoin {
        player: ActorId,
    },
}

impl From<SyncMessage> for SyncMessageDto {
    fn from(message: SyncMessage) -> Self {
        match message {
            SyncMessage::EntityData { data } => Self::EntityData { data },
            SyncMessage::VariableSet {
                entity,
                variable,
                value,
            } => Self::VariableSet {
                entity,
                variable,
                value,
            },
            SyncMessage::LauncherReload { launcher, item } => Self::LauncherReload { launcher, item },
            SyncMessage::BulletHitBlock { position } => Self::BulletHitBlock {
                position: position.to_array(),
            },
            SyncMessage::Chat { player, message } => Self::Chat { player, message },
            SyncMessage::PlayerJoin { player } => Self::PlayerJoin { player },
        }
    }
}

impl From<SyncMessageDto> for SyncMessage {
    fn from(message: SyncMessageDto) -> Self {
        match message {
            SyncMessageDto::EntityData { data } => Self::EntityData { data },
            SyncMessageDto::VariableSet {
                entity,
                variable,
                value,
            } => Self::VariableSet {
                entity,
                variable,
                value,
            },
            SyncMessageDto::LauncherReload { launcher, item } => {
                Self::LauncherReload { launcher, item }
            }
            SyncMessageDto::BulletHitBlock { position } => Self::BulletHitBlock {
                position: position.into(),
            },
            SyncMessageDto::Chat { player, message } => Self::Chat { player, message },
            SyncMessageDto::PlayerJoin { player } => Self::PlayerJoin { player },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "player", rename_all = "snake_case")]
pub enum RecipientDto {
    AllClients,
    Server,
    Player(ActorId),
}

impl From<Recipient> for RecipientDto {
    fn from(recipient: Recipient) -> Self {
        match recipient {
            Recipient::AllClients => Self::AllClients,
            Recipient::Server => Self::Server,
            Recipient::Player(player) => Self::Player(player),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeDto {
    pub to: RecipientDto,
    pub message: SyncMessageDto,
}

impl From<Envelope> for EnvelopeDto {
    fn from(envelope: Envelope) -> Self {
        Self {
            to: envelope.recipient.into(),
            message: envelope.message.into(),
        }
    }
}

/// Entity state sent with each world update.
#[derive(Debug, Clone, Serialize)]
pub struct EntityStateDto {
    pub id: String,
    pub kind: &'static str,
    pub position: [f64; 3],
    pub motion: [f64; 3],
    /// Column-major rotation matrix.
    pub orientation: [f64; 9],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, f64>,
}

impl From<&EntitySnapshot> for EntityStateDto {
    fn from(snapshot: &EntitySnapshot) -> Self {
        Self {
            id: snapshot.id.to_string(),
            kind: snapshot.kind,
            position: snapshot.position.to_array(),
            motion: snapshot.motion.to_array(),
            orientation: snapshot.orientation.to_cols_array(),
            variables: snapshot.variables.clone(),
        }
    }
}

/// Snapshot of the world sent on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub entities: Vec<EntityStateDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<EnvelopeDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            entities: update.entities.iter().map(EntityStateDto::from).collect(),
            messages: update.messages.into_iter().map(EnvelopeDto::from).collect(),
        }
    }
}
