use super::types::{WorldEvent, WorldState, WorldUpdate};
use super::world::SimWorld;
use crate::domain::ports::WorldPort;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{error, info};

pub async fn world_task<W: WorldPort>(
    mut world: SimWorld<W>,
    mut input_rx: mpsc::Receiver<WorldEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    state_tx: watch::Sender<WorldState>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let _ = state_tx.send(WorldState::Running);
    info!(entities = world.registry().len(), "world running");

    // Drive the fixed-step simulation at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the world is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        // Inputs queued since the last tick apply before it runs.
        while let Ok(ev) = input_rx.try_recv() {
            world.handle_event(ev);
        }

        let messages = world.tick();
        let _ = world_tx.send(WorldUpdate {
            tick: world.tick_count(),
            messages,
            entities: world.snapshots(),
        });
    }

    // Events queued before shutdown still apply; pending saves get the closing state.
    let mut pending_saves = Vec::new();
    while let Ok(ev) = input_rx.try_recv() {
        match ev {
            WorldEvent::Save { reply } => pending_saves.push(reply),
            other => world.handle_event(other),
        }
    }
    let saved = world.close();
    match saved.get("entityCount").and_then(serde_json::Value::as_u64) {
        Some(entities) => info!(ticks = world.tick_count(), entities, "world closed"),
        None => error!(ticks = world.tick_count(), "closing save has no entity count"),
    }
    for reply in pending_saves {
        let _ = reply.send(saved.clone());
    }
    let _ = state_tx.send(WorldState::Closed);
}
