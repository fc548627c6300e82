// World hosting: spawns and tracks the task of every named world.

use crate::domain::ports::WorldPort;
use crate::use_cases::game::world_task;
use crate::use_cases::world::SimWorld;
use crate::use_cases::{WorldEvent, WorldState, WorldUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, oneshot, watch};
use tracing::info;

/// Shared configuration for spawning worlds.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    /// Capacity for inbound world events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Fixed tick interval for the simulation loop.
    pub tick_interval: Duration,
}

/// Errors returned by world host operations.
#[derive(Debug)]
pub enum WorldHostError {
    /// World already exists and cannot be re-created.
    AlreadyExists,
    NotFound,
    /// The world task is gone.
    Closed,
}

/// Per-world channels.
#[derive(Clone)]
pub struct WorldHandle {
    /// Identifier callers use to target this world.
    pub world_id: Arc<str>,
    /// Sender for events into the world task.
    pub input_tx: mpsc::Sender<WorldEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_json_tx: broadcast::Sender<Arc<str>>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Arc<str>>,
    /// Watch sender for lifecycle changes.
    pub state_tx: watch::Sender<WorldState>,
    shutdown: Arc<Notify>,
}

impl WorldHandle {
    /// Asks the world task for its saved state.
    pub async fn save(&self) -> Result<serde_json::Value, WorldHostError> {
        let (reply, response) = oneshot::channel();
        self.input_tx
            .send(WorldEvent::Save { reply })
            .await
            .map_err(|_| WorldHostError::Closed)?;
        response.await.map_err(|_| WorldHostError::Closed)
    }

    pub async fn send(&self, event: WorldEvent) -> Result<(), WorldHostError> {
        self.input_tx
            .send(event)
            .await
            .map_err(|_| WorldHostError::Closed)
    }
}

/// Thread-safe registry for running worlds.
#[derive(Debug)]
pub struct WorldHost {
    /// Settings applied to newly created worlds.
    settings: WorldSettings,
    /// Map of world id to active handle.
    worlds: RwLock<HashMap<String, WorldHandle>>,
}

impl std::fmt::Debug for WorldHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldHandle")
            .field("world_id", &self.world_id)
            .finish_non_exhaustive()
    }
}

impl WorldHost {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            worlds: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a world and spawns its task.
    pub async fn create_world<W: WorldPort + 'static>(
        &self,
        world_id: String,
        world: SimWorld<W>,
    ) -> Result<WorldHandle, WorldHostError> {
        let mut worlds = self.worlds.write().await;
        if worlds.contains_key(&world_id) {
            return Err(WorldHostError::AlreadyExists);
        }

        // Channel wiring for the world loop.
        let (input_tx, input_rx) = mpsc::channel::<WorldEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_json_tx, _world_json_rx) =
            broadcast::channel::<Arc<str>>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Arc<str>>(Arc::from(""));
        let (state_tx, _state_rx) = watch::channel::<WorldState>(WorldState::Loading);
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(world_task(
            world,
            input_rx,
            world_tx.clone(),
            state_tx.clone(),
            self.settings.tick_interval,
            shutdown.clone(),
        ));

        let handle = WorldHandle {
            world_id: Arc::from(world_id.as_str()),
            input_tx,
            world_tx,
            world_json_tx,
            world_latest_tx,
            state_tx,
            shutdown,
        };
        info!(world_id = %world_id, "world created");
        worlds.insert(world_id, handle.clone());
        Ok(handle)
    }

    pub async fn get_world(&self, world_id: &str) -> Option<WorldHandle> {
        let worlds = self.worlds.read().await;
        worlds.get(world_id).cloned()
    }

    /// Stops a world's task and forgets it.
    pub async fn remove_world(&self, world_id: &str) -> Result<(), WorldHostError> {
        let handle = self
            .worlds
            .write()
            .await
            .remove(world_id)
            .ok_or(WorldHostError::NotFound)?;
        // notify_one stores a permit, so a task between ticks still sees it.
        handle.shutdown.notify_one();
        info!(world_id = %world_id, "world removed");
        Ok(())
    }

    pub async fn world_ids(&self) -> Vec<String> {
        let worlds = self.worlds.read().await;
        let mut ids: Vec<String> = worlds.keys().cloned().collect();
        ids.sort();
        ids
    }
}
