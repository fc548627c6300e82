// Use case: one simulated world, the registry plus everything a tick needs.

use glam::{DMat3, DVec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::definitions::{ItemKey, PackRegistry};
use crate::domain::entity::{Entity, EntityId, Side};
use crate::domain::launcher::{AmmoItem, Launcher};
use crate::domain::multipart::{PlacedPartData, Vehicle, VehicleData};
use crate::domain::ports::{ActorId, WorldPort};
use crate::domain::registry::EntityRegistry;
use crate::domain::sync::{Envelope, SyncMessage};
use crate::domain::tuning::SimTuning;
use crate::use_cases::types::{EntitySnapshot, WorldEvent};

/// Drives one registry against a platform world.
pub struct SimWorld<W: WorldPort> {
    registry: EntityRegistry,
    platform: W,
    pack: Arc<PackRegistry>,
    tuning: SimTuning,
    rng: ChaCha8Rng,
    tick: u64,
}

impl<W: WorldPort> SimWorld<W> {
    pub fn new(side: Side, platform: W, pack: Arc<PackRegistry>, tuning: SimTuning, seed: u64) -> Self {
        Self {
            registry: EntityRegistry::new(side),
            platform,
            pack,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn platform(&self) -> &W {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut W {
        &mut self.platform
    }

    pub fn pack(&self) -> &Arc<PackRegistry> {
        &self.pack
    }

    pub fn tuning(&self) -> &SimTuning {
        &self.tuning
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Runs the main pass then the last pass, and returns the messages they produced.
    pub fn tick(&mut self) -> Vec<Envelope> {
        for main_update in [true, false] {
            self.registry.run_tick(
                &mut self.platform,
                &self.pack,
                &self.tuning,
                &mut self.rng,
                main_update,
            );
        }
        self.tick += 1;
        self.registry.drain_outbox()
    }

    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.registry
            .renderable()
            .iter()
            .filter_map(|handle| self.registry.get(*handle))
            .map(EntitySnapshot::from)
            .collect()
    }

    /// Spawns a vehicle with its default parts.
    pub fn spawn_vehicle(
        &mut self,
        item: ItemKey,
        position: DVec3,
        orientation: DMat3,
    ) -> Option<EntityId> {
        self.spawn_vehicle_data(VehicleData::fresh(item, Uuid::new_v4(), position, orientation))
    }

    pub fn spawn_vehicle_data(&mut self, data: VehicleData) -> Option<EntityId> {
        let uuid = data.uuid;
        let value = serde_json::to_value(data)
            .inspect_err(|e| error!(error = %e, entity_id = %uuid, "failed to encode vehicle"))
            .ok()?;
        self.registry.add_entity_by_data(&self.pack, &value)?;
        Some(uuid)
    }

    /// Places a single part, e.g. an emplaced launcher, directly in the world.
    pub fn place_part(
        &mut self,
        item: ItemKey,
        position: DVec3,
        orientation: DMat3,
    ) -> Option<EntityId> {
        self.place_part_data(PlacedPartData::fresh(item, Uuid::new_v4(), position, orientation))
    }

    pub fn place_part_data(&mut self, data: PlacedPartData) -> Option<EntityId> {
        let uuid = data.uuid;
        let value = serde_json::to_value(data)
            .inspect_err(|e| error!(error = %e, entity_id = %uuid, "failed to encode placed part"))
            .ok()?;
        self.registry.add_entity_by_data(&self.pack, &value)?;
        Some(uuid)
    }

    /// Puts a launcher part in an actor's hands.
    pub fn equip_hand_held(&mut self, holder: ActorId, item: ItemKey) -> Option<EntityId> {
        let Some(definition) = self
            .pack
            .part(&item)
            .and_then(|part| part.launcher.clone())
        else {
            warn!(item = %item, "item is not a launcher part");
            return None;
        };
        let launcher = Launcher::hand_held(holder, item, Arc::new(definition), &self.pack);
        let uuid = launcher.core().uuid;
        self.registry.add_entity(Box::new(launcher));
        Some(uuid)
    }

    pub fn set_seat_rider(&mut self, vehicle: EntityId, seat: usize, rider: Option<ActorId>) -> bool {
        let Some(state) = self
            .registry
            .multipart_mut(vehicle)
            .and_then(|body| body.seat_mut(seat))
        else {
            return false;
        };
        state.rider = rider;
        true
    }

    /// Selects the launcher type a seat fires, and which one of the group for fire-solo types.
    pub fn select_launcher(
        &mut self,
        vehicle: EntityId,
        seat: usize,
        item: Option<ItemKey>,
        index: usize,
    ) -> bool {
        let Some(state) = self
            .registry
            .multipart_mut(vehicle)
            .and_then(|body| body.seat_mut(seat))
        else {
            return false;
        };
        state.active_launcher = item;
        state.launcher_index = index;
        state.launcher_group_index = 0;
        true
    }

    /// Presses or releases the trigger of every launcher the seat has selected.
    ///
    /// Returns how many launchers the trigger reached.
    pub fn set_seat_trigger(&mut self, vehicle: EntityId, seat: usize, pressed: bool) -> usize {
        let group = match self.registry.multipart(vehicle) {
            Some(body) => match body.seat(seat).and_then(|state| state.active_launcher.clone()) {
                Some(item) => body.launcher_group(seat, &item),
                None => Vec::new(),
            },
            None => Vec::new(),
        };
        group
            .into_iter()
            .filter(|launcher| self.set_trigger(*launcher, pressed))
            .count()
    }

    pub fn set_trigger(&mut self, launcher: EntityId, pressed: bool) -> bool {
        match self.registry.entity_as_mut::<Launcher>(launcher) {
            Some(launcher) => {
                launcher.set_trigger(pressed);
                true
            }
            None => false,
        }
    }

    pub fn set_launcher_active(&mut self, launcher: EntityId, active: bool) -> bool {
        match self.registry.entity_as_mut::<Launcher>(launcher) {
            Some(launcher) => {
                launcher.set_active(active);
                true
            }
            None => false,
        }
    }

    /// Hands a round to a launcher directly and announces the reload to clients.
    pub fn load_ammo(&mut self, launcher: EntityId, item: ItemKey) -> bool {
        let Some(ammo) = AmmoItem::resolve(&self.pack, &item) else {
            warn!(launcher_id = %launcher, item = %item, "ammunition is not a projectile item");
            return false;
        };
        let Some(target) = self.registry.entity_as_mut::<Launcher>(launcher) else {
            return false;
        };
        if !target.try_to_reload(&ammo) {
            return false;
        }
        if self.registry.side() == Side::Server {
            self.registry
                .outbox_mut()
                .send_to_all_clients(SyncMessage::LauncherReload { launcher, item });
        }
        true
    }

    /// Links `towed` behind `tower`. Both must be vehicles.
    pub fn connect_tow(&mut self, tower: EntityId, towed: EntityId) -> bool {
        if tower == towed || self.registry.entity_as::<Vehicle>(towed).is_none() {
            return false;
        }
        let Some(front) = self.registry.entity_as_mut::<Vehicle>(tower) else {
            return false;
        };
        front.set_towing(Some(towed));
        if let Some(back) = self.registry.entity_as_mut::<Vehicle>(towed) {
            back.set_towed_by(Some(tower));
        }
        true
    }

    pub fn save(&self) -> Value {
        self.registry.save_entities()
    }

    pub fn load(&mut self, data: Option<&Value>) -> usize {
        let loaded = self.registry.load_entities(&self.pack, data);
        info!(loaded, "world entities loaded");
        loaded
    }

    pub fn close(&mut self) -> Value {
        self.registry.close()
    }

    /// Applies a message sent by the other side of the simulation.
    pub fn apply_message(&mut self, message: SyncMessage) {
        match (self.registry.side(), message) {
            (Side::Client, SyncMessage::EntityData { data }) => {
                self.registry.add_entity_by_data(&self.pack, &data);
            }
            (
                Side::Client,
                SyncMessage::VariableSet {
                    entity,
                    variable,
                    value,
                },
            ) => match self
                .registry
                .handle_of(entity)
                .and_then(|handle| self.registry.get_mut(handle))
            {
                Some(target) => target.core_mut().set_variable(&variable, value),
                None => debug!(entity_id = %entity, variable = %variable, "variable set for unknown entity"),
            },
            (Side::Client, SyncMessage::LauncherReload { launcher, item }) => {
                let ammo = AmmoItem::resolve(&self.pack, &item);
                match (ammo, self.registry.entity_as_mut::<Launcher>(launcher)) {
                    (Some(ammo), Some(target)) => target.set_client_next(ammo),
                    _ => debug!(launcher_id = %launcher, item = %item, "reload for unknown launcher"),
                }
            }
            (Side::Server, SyncMessage::PlayerJoin { player }) => {
                info!(player_id = %player, "player joined");
                self.registry.on_player_join(player);
            }
            (side, message) => {
                debug!(?side, ?message, "ignoring message");
            }
        }
    }

    /// Applies one queued input event.
    pub fn handle_event(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::Sync(message) => self.apply_message(message),
            WorldEvent::SpawnVehicle(data) => {
                self.spawn_vehicle_data(data);
            }
            WorldEvent::PlacePart(data) => {
                self.place_part_data(data);
            }
            WorldEvent::SeatRider {
                vehicle,
                seat,
                rider,
            } => {
                if !self.set_seat_rider(vehicle, seat, rider) {
                    warn!(vehicle_id = %vehicle, seat, "no such seat");
                }
            }
            WorldEvent::SelectLauncher {
                vehicle,
                seat,
                item,
                index,
            } => {
                if !self.select_launcher(vehicle, seat, item, index) {
                    warn!(vehicle_id = %vehicle, seat, "no such seat");
                }
            }
            WorldEvent::SeatTrigger {
                vehicle,
                seat,
                pressed,
            } => {
                self.set_seat_trigger(vehicle, seat, pressed);
            }
            WorldEvent::LoadAmmo { launcher, item } => {
                self.load_ammo(launcher, item);
            }
            WorldEvent::Save { reply } => {
                let _ = reply.send(self.save());
            }
        }
    }
}
