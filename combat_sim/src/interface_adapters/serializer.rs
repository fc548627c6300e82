// World update serialization, shared by every observer of a world.

use crate::interface_adapters::protocol::{ServerMessage, WorldUpdateDto};
use crate::use_cases::{WorldHandle, WorldUpdate};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, warn};

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_json_tx: broadcast::Sender<Arc<str>>,
    world_latest_tx: watch::Sender<Arc<str>>,
) {
    // Serialize each world update once and broadcast the shared text.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let shared: Arc<str> = Arc::from(txt);
                // Latest frame for observers that fall behind.
                let _ = world_latest_tx.send(shared.clone());
                let _ = world_json_tx.send(shared);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_world_serializer(world: &WorldHandle) {
    tokio::spawn(world_update_serializer(
        world.world_tx.subscribe(),
        world.world_json_tx.clone(),
        world.world_latest_tx.clone(),
    ));
}
