// Domain sync messages: what one side of the simulation tells the other.

use glam::DVec3;

use crate::domain::definitions::ItemKey;
use crate::domain::entity::EntityId;
use crate::domain::ports::ActorId;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    /// Full saved state of an entity, replayed through the spawn factory on receipt.
    EntityData { data: serde_json::Value },
    VariableSet {
        entity: EntityId,
        variable: String,
        value: f64,
    },
    /// Server started reloading a launcher with `item`.
    LauncherReload { launcher: EntityId, item: ItemKey },
    /// A projectile struck a block without breaking or igniting it.
    BulletHitBlock { position: DVec3 },
    Chat { player: ActorId, message: String },
    /// Client asks the server for the state of every world entity.
    PlayerJoin { player: ActorId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    AllClients,
    Server,
    Player(ActorId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub recipient: Recipient,
    pub message: SyncMessage,
}

/// Messages queued during a tick, drained by the world driver.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Vec<Envelope>,
}

impl Outbox {
    pub fn send_to_all_clients(&mut self, message: SyncMessage) {
        self.queue.push(Envelope {
            recipient: Recipient::AllClients,
            message,
        });
    }

    pub fn send_to_server(&mut self, message: SyncMessage) {
        self.queue.push(Envelope {
            recipient: Recipient::Server,
            message,
        });
    }

    pub fn send_to_player(&mut self, player: ActorId, message: SyncMessage) {
        self.queue.push(Envelope {
            recipient: Recipient::Player(player),
            message,
        });
    }

    pub fn pending(&self) -> &[Envelope] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.queue)
    }
}
