// Domain registry: owns every entity of one world, its lookup indices and its tick passes.

use glam::DVec3;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::definitions::{ItemKey, LauncherDefinition, PackItem, PackRegistry};
use crate::domain::entity::{
    Capability, Entity, EntityHandle, EntityId, Side, TickContext, UpdateType,
};
use crate::domain::geometry::{BoundingBox, is_first_closer_than_second};
use crate::domain::multipart::{HitBoxRef, MultipartBody, PlacedPart, Spawned, Vehicle};
use crate::domain::ports::{ActorId, WorldPort};
use crate::domain::sync::{Envelope, Outbox, SyncMessage};
use crate::domain::tuning::SimTuning;

/// What a projectile needs to know about the launcher that fired it, kept after the launcher goes.
#[derive(Debug, Clone, PartialEq)]
pub struct GunRecord {
    pub launcher: EntityId,
    pub item: ItemKey,
    pub definition: Arc<LauncherDefinition>,
}

/// Closest multipart box struck by a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityInteractResult {
    pub entity: EntityId,
    pub handle: EntityHandle,
    /// Slot of the part owning the box, if any.
    pub part_slot: Option<usize>,
    pub hit_box: HitBoxRef,
    pub point: DVec3,
}

/// Index bookkeeping captured at add time, so removal never needs the entity itself.
#[derive(Debug, Clone, Copy)]
struct EntityMeta {
    uuid: EntityId,
    synced: bool,
    type_id: TypeId,
    bullet: Option<(EntityId, u32)>,
}

/// Per-world entity store.
///
/// Entities are detached from `storage` while they update, so anything reached through the
/// registry during an update is some other entity. Tick passes iterate a snapshot of their tier
/// list; entities added mid-pass are first updated on the next pass.
pub struct EntityRegistry {
    side: Side,
    next_handle: u64,
    storage: HashMap<EntityHandle, Box<dyn Entity>>,
    meta: HashMap<EntityHandle, EntityMeta>,
    all: Vec<EntityHandle>,
    main_tickable: Vec<EntityHandle>,
    last_tickable: Vec<EntityHandle>,
    renderable: Vec<EntityHandle>,
    collidable: Vec<EntityHandle>,
    by_exact_type: HashMap<TypeId, Vec<EntityHandle>>,
    tracked: HashMap<EntityId, EntityHandle>,
    guns: HashMap<EntityId, GunRecord>,
    bullets: HashMap<EntityId, BTreeMap<u32, EntityHandle>>,
    outbox: Outbox,
}

impl EntityRegistry {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            next_handle: 1,
            storage: HashMap::new(),
            meta: HashMap::new(),
            all: Vec::new(),
            main_tickable: Vec::new(),
            last_tickable: Vec::new(),
            renderable: Vec::new(),
            collidable: Vec::new(),
            by_exact_type: HashMap::new(),
            tracked: HashMap::new(),
            guns: HashMap::new(),
            bullets: HashMap::new(),
            outbox: Outbox::default(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Registers a fully constructed entity.
    ///
    /// A synced entity whose UUID is already tracked evicts the old holder.
    pub fn add_entity(&mut self, entity: Box<dyn Entity>) -> EntityHandle {
        let uuid = entity.uuid();
        let synced = entity.should_sync();
        if synced {
            if let Some(existing) = self.tracked.get(&uuid).copied() {
                error!(
                    entity_id = %uuid,
                    entity = entity.name(),
                    "entity added with a UUID that is already tracked; removing the old one"
                );
                self.remove_entity(existing);
            }
        }

        let handle = EntityHandle(self.next_handle);
        self.next_handle += 1;

        self.all.push(handle);
        match entity.update_type() {
            UpdateType::Main => self.main_tickable.push(handle),
            UpdateType::Last => self.last_tickable.push(handle),
            UpdateType::None => {}
        }
        if entity.has_capability(Capability::Renderable) {
            self.renderable.push(handle);
        }
        if entity.has_capability(Capability::Definable)
            && self.side == Side::Server
            && entity.loads_from_world_data()
        {
            if let Some(data) = entity.save(self) {
                self.outbox
                    .send_to_all_clients(SyncMessage::EntityData { data });
            }
        }
        if entity.has_capability(Capability::Interactable) && entity.can_collide() {
            self.collidable.push(handle);
        }
        if synced {
            self.tracked.insert(uuid, handle);
        }
        if let Some(record) = entity.gun_record() {
            self.bullets.entry(record.launcher).or_default();
            self.guns.insert(record.launcher, record);
        }
        let bullet = entity.bullet_key();
        if let Some((gun, number)) = bullet {
            self.bullets.entry(gun).or_default().insert(number, handle);
        }
        let type_id = entity.as_any().type_id();
        self.by_exact_type.entry(type_id).or_default().push(handle);

        self.meta.insert(
            handle,
            EntityMeta {
                uuid,
                synced,
                type_id,
                bullet,
            },
        );
        self.storage.insert(handle, entity);
        handle
    }

    /// Adds a spawned entity after the entities it installed (its launchers).
    pub fn add_spawned(&mut self, spawned: Spawned) -> EntityHandle {
        for part in spawned.parts {
            self.add_entity(part);
        }
        self.add_entity(spawned.entity)
    }

    /// Removes the entity from every collection it is in. Unknown handles are ignored.
    ///
    /// Gun records outlive their launcher.
    pub fn remove_entity(&mut self, handle: EntityHandle) -> Option<Box<dyn Entity>> {
        let meta = self.meta.remove(&handle)?;
        self.all.retain(|other| *other != handle);
        self.main_tickable.retain(|other| *other != handle);
        self.last_tickable.retain(|other| *other != handle);
        self.renderable.retain(|other| *other != handle);
        self.collidable.retain(|other| *other != handle);
        if meta.synced && self.tracked.get(&meta.uuid) == Some(&handle) {
            self.tracked.remove(&meta.uuid);
        }
        if let Some((gun, number)) = meta.bullet {
            if let Some(table) = self.bullets.get_mut(&gun) {
                if table.get(&number) == Some(&handle) {
                    table.remove(&number);
                }
            }
        }
        if let Some(bucket) = self.by_exact_type.get_mut(&meta.type_id) {
            bucket.retain(|other| *other != handle);
        }
        self.storage.remove(&handle)
    }

    pub fn remove_by_uuid(&mut self, uuid: EntityId) -> Option<Box<dyn Entity>> {
        let handle = self.handle_of(uuid)?;
        self.remove_entity(handle)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.meta.contains_key(&handle)
    }

    pub fn all_entities(&self) -> &[EntityHandle] {
        &self.all
    }

    pub fn main_tickable(&self) -> &[EntityHandle] {
        &self.main_tickable
    }

    pub fn last_tickable(&self) -> &[EntityHandle] {
        &self.last_tickable
    }

    pub fn renderable(&self) -> &[EntityHandle] {
        &self.renderable
    }

    pub fn collidable(&self) -> &[EntityHandle] {
        &self.collidable
    }

    pub fn is_tracked(&self, uuid: EntityId) -> bool {
        self.tracked.contains_key(&uuid)
    }

    pub fn handle_of(&self, uuid: EntityId) -> Option<EntityHandle> {
        self.tracked.get(&uuid).copied()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&dyn Entity> {
        self.storage.get(&handle).map(|entity| entity.as_ref())
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut dyn Entity> {
        self.storage.get_mut(&handle).map(|entity| entity.as_mut())
    }

    pub fn entity(&self, uuid: EntityId) -> Option<&dyn Entity> {
        self.get(self.handle_of(uuid)?)
    }

    pub fn get_as<T: Entity>(&self, handle: EntityHandle) -> Option<&T> {
        self.get(handle)?.as_any().downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Entity>(&mut self, handle: EntityHandle) -> Option<&mut T> {
        self.get_mut(handle)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn entity_as<T: Entity>(&self, uuid: EntityId) -> Option<&T> {
        self.get_as(self.handle_of(uuid)?)
    }

    pub fn entity_as_mut<T: Entity>(&mut self, uuid: EntityId) -> Option<&mut T> {
        let handle = self.handle_of(uuid)?;
        self.get_as_mut(handle)
    }

    pub fn multipart(&self, uuid: EntityId) -> Option<&MultipartBody> {
        self.entity(uuid)?.as_multipart()
    }

    pub fn multipart_mut(&mut self, uuid: EntityId) -> Option<&mut MultipartBody> {
        let handle = self.handle_of(uuid)?;
        self.get_mut(handle)?.as_multipart_mut()
    }

    /// Entities of exactly type `T`, in insertion order. This is the live index.
    pub fn entities_of_type<T: Entity>(&self) -> &[EntityHandle] {
        self.by_exact_type
            .get(&TypeId::of::<T>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter_of_type<T: Entity>(&self) -> impl Iterator<Item = &T> {
        self.entities_of_type::<T>()
            .iter()
            .filter_map(|handle| self.get_as::<T>(*handle))
    }

    /// Every entity exposing `capability`. Scans all entities; prefer `entities_of_type`.
    pub fn entities_extending(&self, capability: Capability) -> Vec<EntityHandle> {
        self.all
            .iter()
            .copied()
            .filter(|handle| {
                self.get(*handle)
                    .is_some_and(|entity| entity.has_capability(capability))
            })
            .collect()
    }

    /// Launcher a bullet was fired from, even if the launcher has since been removed.
    pub fn bullet_gun(&self, gun: EntityId) -> Option<&GunRecord> {
        self.guns.get(&gun)
    }

    pub fn bullet(&self, gun: EntityId, number: u32) -> Option<EntityHandle> {
        self.bullets.get(&gun)?.get(&number).copied()
    }

    pub fn bullets_of(&self, gun: EntityId) -> Option<&BTreeMap<u32, EntityHandle>> {
        self.bullets.get(&gun)
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.outbox.drain()
    }

    /// Vehicles then placed parts.
    pub fn multipart_candidates(&self) -> Vec<EntityHandle> {
        self.entities_of_type::<Vehicle>()
            .iter()
            .chain(self.entities_of_type::<PlacedPart>())
            .copied()
            .collect()
    }

    /// Closest multipart box struck by the segment `start..end`.
    pub fn multipart_intersect(&self, start: DVec3, end: DVec3) -> Option<EntityInteractResult> {
        let segment = BoundingBox::around_segment(start, end);
        let mut closest: Option<EntityInteractResult> = None;
        for handle in self.multipart_candidates() {
            let Some(entity) = self.get(handle) else {
                continue;
            };
            let Some(body) = entity.as_multipart() else {
                continue;
            };
            if !body.encompassing_box.intersects(&segment) {
                continue;
            }
            for (hit_box, bounding_box) in body.interaction_boxes() {
                if !bounding_box.intersects(&segment) {
                    continue;
                }
                let Some(point) = bounding_box.intersection_point(start, end) else {
                    continue;
                };
                let closer = closest
                    .as_ref()
                    .is_none_or(|best| is_first_closer_than_second(start, point, best.point));
                if closer {
                    closest = Some(EntityInteractResult {
                        entity: entity.uuid(),
                        handle,
                        part_slot: hit_box.part_slot(),
                        hit_box,
                        point,
                    });
                }
            }
        }
        closest
    }

    /// Runs one registry pass: the main tier when `main_update` is set, else the last tier.
    pub fn run_tick(
        &mut self,
        world: &mut dyn WorldPort,
        pack: &PackRegistry,
        tuning: &SimTuning,
        rng: &mut ChaCha8Rng,
        main_update: bool,
    ) {
        let snapshot = if main_update {
            self.main_tickable.clone()
        } else {
            self.last_tickable.clone()
        };
        for handle in snapshot {
            if self
                .get(handle)
                .is_none_or(|entity| entity.towed_by().is_some_and(|tower| self.is_tracked(tower)))
            {
                continue;
            }
            let mut next = Some(handle);
            let mut links = 0;
            while let Some(current) = next.take() {
                next = self.update_entity(current, world, pack, tuning, rng);
                links += 1;
                if links > self.all.len() {
                    warn!(entity_handle = ?handle, "tow chain loops back on itself");
                    break;
                }
            }
        }
    }

    /// Updates one entity and returns the tow-chain link to update next.
    fn update_entity(
        &mut self,
        handle: EntityHandle,
        world: &mut dyn WorldPort,
        pack: &PackRegistry,
        tuning: &SimTuning,
        rng: &mut ChaCha8Rng,
    ) -> Option<EntityHandle> {
        let mut entity = self.storage.remove(&handle)?;
        if !entity.can_update(&*world) {
            self.storage.insert(handle, entity);
            return None;
        }

        entity.core_mut().ticks_existed += 1;
        {
            let mut ctx = TickContext {
                registry: self,
                world: &mut *world,
                pack,
                tuning,
                rng: &mut *rng,
            };
            entity.update(&mut ctx);
            if entity.is_valid() && entity.has_capability(Capability::Definable) {
                entity.post_update(&mut ctx);
            }
        }

        let towed = entity.towed_entity();
        let valid = entity.is_valid();
        if !self.meta.contains_key(&handle) {
            // Removed by someone else while it was updating.
            return None;
        }
        self.storage.insert(handle, entity);
        if !valid {
            debug!(entity_handle = ?handle, "removing invalidated entity");
            self.remove_entity(handle);
            return None;
        }
        towed.and_then(|uuid| self.handle_of(uuid))
    }

    /// Serializes every synced, world-persisting entity into numbered slots.
    pub fn save_entities(&self) -> Value {
        let mut data = Map::new();
        let mut count = 0usize;
        for handle in &self.all {
            let Some(meta) = self.meta.get(handle) else {
                continue;
            };
            if !meta.synced {
                continue;
            }
            let Some(entity) = self.get(*handle) else {
                continue;
            };
            if !entity.loads_from_world_data() {
                continue;
            }
            if let Some(saved) = entity.save(self) {
                data.insert(format!("entity{count}"), saved);
                count += 1;
            }
        }
        data.insert("entityCount".to_string(), Value::from(count));
        Value::Object(data)
    }

    /// Loads entities saved by `save_entities`. Missing data loads nothing.
    pub fn load_entities(&mut self, pack: &PackRegistry, data: Option<&Value>) -> usize {
        let Some(data) = data else {
            return 0;
        };
        let count = data
            .get("entityCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut loaded = 0;
        for index in 0..count {
            match data.get(format!("entity{index}")) {
                Some(entity_data) => {
                    if self.add_entity_by_data(pack, entity_data).is_some() {
                        loaded += 1;
                    }
                }
                None => warn!(slot = index, "saved entity slot is missing"),
            }
        }
        loaded
    }

    /// Builds an entity from saved data through the same factory live spawning uses.
    pub fn add_entity_by_data(&mut self, pack: &PackRegistry, data: &Value) -> Option<EntityHandle> {
        let is_placed_part = data
            .get("isPlacedPart")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let spawned = if is_placed_part {
            PlacedPart::from_data(pack, data)
        } else {
            let key: ItemKey = match serde_json::from_value(data.clone()) {
                Ok(key) => key,
                Err(e) => {
                    error!(error = %e, "saved entity has no pack item key");
                    return None;
                }
            };
            match pack.get(&key) {
                Some(PackItem::Vehicle(definition)) => {
                    Vehicle::from_data(key, definition.clone(), pack, data)
                }
                Some(_) => {
                    error!(item = %key, "pack item cannot be spawned as a world entity");
                    return None;
                }
                None => {
                    error!(
                        item = %key,
                        "couldn't find a pack item for saved entity; did a pack change?"
                    );
                    return None;
                }
            }
        };
        match spawned {
            Ok(spawned) => Some(self.add_spawned(spawned)),
            Err(e) => {
                error!(error = ?e, "failed to spawn entity from data");
                None
            }
        }
    }

    /// Sends the joining player the state of every world entity.
    pub fn on_player_join(&mut self, player: ActorId) {
        if self.side != Side::Server {
            return;
        }
        let mut messages = Vec::new();
        for handle in &self.all {
            let Some(entity) = self.get(*handle) else {
                continue;
            };
            if entity.should_sync()
                && entity.has_capability(Capability::Definable)
                && entity.loads_from_world_data()
            {
                if let Some(data) = entity.save(self) {
                    messages.push(SyncMessage::EntityData { data });
                }
            }
        }
        for message in messages {
            self.outbox.send_to_player(player, message);
        }
    }

    /// Saves the world, then removes every entity.
    pub fn close(&mut self) -> Value {
        let saved = self.save_entities();
        for handle in self.all.clone() {
            self.remove_entity(handle);
        }
        saved
    }
}
