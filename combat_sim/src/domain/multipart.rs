// Domain multiparts: vehicles and placed parts built from boxes and slot-installed parts.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::definitions::{
    BoxDefinition, ItemKey, MultipartDefinition, PackRegistry, PartDefinition, PartKindDefinition,
    PartSlotDefinition,
};
use crate::domain::entity::{Capability, Entity, EntityCore, EntityId, TickContext};
use crate::domain::geometry::{BoundingBox, CollisionGroupRef, rotation_from_angles};
use crate::domain::inventory::Inventory;
use crate::domain::launcher::{Launcher, LauncherData};
use crate::domain::ports::{ActorId, WorldPort};
use crate::domain::registry::EntityRegistry;

/// Address of one box on a multipart, stable while the owning part is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitBoxRef {
    Body(usize),
    BulletCollision(usize),
    Part { slot: usize, index: usize },
    /// Placeholder shown for an empty slot.
    Slot(usize),
}

impl HitBoxRef {
    pub fn part_slot(self) -> Option<usize> {
        match self {
            HitBoxRef::Part { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeatState {
    pub rider: Option<ActorId>,
    /// Launcher type the rider has selected.
    pub active_launcher: Option<ItemKey>,
    /// Selected launcher within the group, for fire-solo launchers.
    pub launcher_index: usize,
    /// Launcher in the group whose turn it is to fire.
    pub launcher_group_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartKind {
    Generic,
    Engine,
    Seat(SeatState),
    Crate {
        inventory: Inventory,
        feeds_vehicles: bool,
    },
    Launcher {
        launcher: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePart {
    pub slot: usize,
    pub item: ItemKey,
    pub definition: Arc<PartDefinition>,
    pub position: DVec3,
    pub orientation: DMat3,
    pub boxes: Vec<BoundingBox>,
    pub damage_amount: f64,
    pub kind: PartKind,
}

impl VehiclePart {
    pub fn is_engine(&self) -> bool {
        matches!(self.kind, PartKind::Engine)
    }

    pub fn launcher(&self) -> Option<EntityId> {
        match self.kind {
            PartKind::Launcher { launcher } => Some(launcher),
            _ => None,
        }
    }
}

/// Outcome of damaging a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartDamage {
    Damaged,
    Destroyed,
    Missing,
}

/// Saved state of one installed part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartData {
    pub slot: usize,
    #[serde(flatten)]
    pub item: ItemKey,
    #[serde(default)]
    pub damage_amount: f64,
    #[serde(default)]
    pub inventory: Option<Inventory>,
    #[serde(default)]
    pub launcher: Option<LauncherData>,
}

impl PartData {
    pub fn fresh(slot: usize, item: ItemKey) -> Self {
        Self {
            slot,
            item,
            damage_amount: 0.0,
            inventory: None,
            launcher: None,
        }
    }
}

#[derive(Debug)]
pub enum SpawnError {
    Malformed(serde_json::Error),
    MissingPart(ItemKey),
}

/// A freshly built entity plus the launchers its parts created.
pub struct Spawned {
    pub entity: Box<dyn Entity>,
    pub parts: Vec<Box<dyn Entity>>,
}

fn box_from_definition(definition: &BoxDefinition, group: Option<CollisionGroupRef>) -> BoundingBox {
    let mut bounding_box = BoundingBox::new(
        definition.pos,
        definition.width / 2.0,
        definition.height / 2.0,
        definition.width / 2.0,
    );
    bounding_box.armor_thickness = definition.armor_thickness;
    bounding_box.heat_armor_thickness = definition.heat_armor_thickness;
    bounding_box.group = group;
    bounding_box
}

fn slot_box(slot: &PartSlotDefinition) -> BoundingBox {
    BoundingBox::new(
        slot.pos,
        slot.slot_width / 2.0,
        slot.slot_height / 2.0,
        slot.slot_width / 2.0,
    )
}

/// Boxes, parts and damage shared by every multipart.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub definition: Arc<MultipartDefinition>,
    /// Installed parts, ordered by slot.
    pub parts: Vec<VehiclePart>,
    pub body_boxes: Vec<BoundingBox>,
    pub bullet_boxes: Vec<BoundingBox>,
    /// Placeholders for empty slots, keyed by slot.
    pub slot_boxes: Vec<(usize, BoundingBox)>,
    pub encompassing_box: BoundingBox,
    pub damage_amount: f64,
    /// Damage per collision group.
    pub collision_damage: Vec<f64>,
}

impl MultipartBody {
    pub fn new(definition: Arc<MultipartDefinition>) -> Self {
        let mut body_boxes = Vec::new();
        for (index, group) in definition.collision_groups.iter().enumerate() {
            let group_ref = CollisionGroupRef {
                index,
                health: group.health,
            };
            body_boxes.extend(
                group
                    .boxes
                    .iter()
                    .map(|definition| box_from_definition(definition, Some(group_ref))),
            );
        }
        let bullet_boxes = definition
            .bullet_collision_boxes
            .iter()
            .map(|definition| box_from_definition(definition, None))
            .collect();
        let slot_boxes = definition
            .part_slots
            .iter()
            .enumerate()
            .map(|(slot, definition)| (slot, slot_box(definition)))
            .collect();
        Self {
            collision_damage: vec![0.0; definition.collision_groups.len()],
            definition,
            parts: Vec::new(),
            body_boxes,
            bullet_boxes,
            slot_boxes,
            encompassing_box: BoundingBox::new(DVec3::ZERO, 0.0, 0.0, 0.0),
            damage_amount: 0.0,
        }
    }

    pub fn slot_definition(&self, slot: usize) -> Option<&PartSlotDefinition> {
        self.definition.part_slots.get(slot)
    }

    pub fn part(&self, slot: usize) -> Option<&VehiclePart> {
        self.parts.iter().find(|part| part.slot == slot)
    }

    pub fn part_mut(&mut self, slot: usize) -> Option<&mut VehiclePart> {
        self.parts.iter_mut().find(|part| part.slot == slot)
    }

    pub fn seat(&self, slot: usize) -> Option<&SeatState> {
        match &self.part(slot)?.kind {
            PartKind::Seat(seat) => Some(seat),
            _ => None,
        }
    }

    pub fn seat_mut(&mut self, slot: usize) -> Option<&mut SeatState> {
        match &mut self.part_mut(slot)?.kind {
            PartKind::Seat(seat) => Some(seat),
            _ => None,
        }
    }

    pub fn install_part(&mut self, part: VehiclePart) {
        self.slot_boxes.retain(|(slot, _)| *slot != part.slot);
        self.parts.retain(|existing| existing.slot != part.slot);
        self.parts.push(part);
        self.parts.sort_by_key(|part| part.slot);
    }

    /// Removes a part and restores its slot placeholder.
    pub fn remove_part(&mut self, slot: usize) -> Option<VehiclePart> {
        let index = self.parts.iter().position(|part| part.slot == slot)?;
        let part = self.parts.remove(index);
        if let Some(definition) = self.definition.part_slots.get(slot) {
            self.slot_boxes.push((slot, slot_box(definition)));
            self.slot_boxes.sort_by_key(|(slot, _)| *slot);
        }
        Some(part)
    }

    /// Installs saved parts, or the definition's default parts when `saved` is `None`.
    ///
    /// Launcher parts become their own entities; they are returned for the caller to register.
    pub fn add_parts_post_construction(
        &mut self,
        owner: EntityId,
        pack: &PackRegistry,
        saved: Option<&[PartData]>,
    ) -> Vec<Box<dyn Entity>> {
        let plan: Vec<PartData> = match saved {
            Some(parts) => parts.to_vec(),
            None => self
                .definition
                .part_slots
                .iter()
                .enumerate()
                .filter_map(|(slot, definition)| {
                    definition
                        .default_part
                        .clone()
                        .map(|item| PartData::fresh(slot, item))
                })
                .collect(),
        };

        let mut spawned: Vec<Box<dyn Entity>> = Vec::new();
        for data in plan {
            let Some(slot) = self.definition.part_slots.get(data.slot).cloned() else {
                warn!(slot = data.slot, item = %data.item, "saved part references a missing slot");
                continue;
            };
            let Some(definition) = pack.part(&data.item) else {
                error!(
                    slot = data.slot,
                    item = %data.item,
                    "couldn't find a pack item for part; did a pack change?"
                );
                continue;
            };
            let kind = match definition.kind {
                PartKindDefinition::Generic => PartKind::Generic,
                PartKindDefinition::Engine => PartKind::Engine,
                PartKindDefinition::Seat => PartKind::Seat(SeatState::default()),
                PartKindDefinition::Crate { feeds_vehicles } => PartKind::Crate {
                    inventory: data.inventory.clone().unwrap_or_default(),
                    feeds_vehicles,
                },
                PartKindDefinition::Launcher => match &definition.launcher {
                    Some(launcher_definition) => {
                        let launcher = Launcher::mounted(
                            owner,
                            data.slot,
                            data.item.clone(),
                            Arc::new(launcher_definition.clone()),
                            &slot.limits,
                            data.launcher.as_ref(),
                            pack,
                        );
                        let launcher_id = launcher.uuid();
                        spawned.push(Box::new(launcher));
                        PartKind::Launcher {
                            launcher: launcher_id,
                        }
                    }
                    None => {
                        error!(item = %data.item, "launcher part has no launcher definition");
                        PartKind::Generic
                    }
                },
            };
            let boxes = definition
                .boxes
                .iter()
                .map(|definition| box_from_definition(definition, None))
                .collect();
            self.install_part(VehiclePart {
                slot: data.slot,
                item: data.item,
                definition,
                position: slot.pos,
                orientation: rotation_from_angles(slot.rot),
                boxes,
                damage_amount: data.damage_amount,
                kind,
            });
        }
        spawned
    }

    pub fn save_parts(&self, registry: &EntityRegistry) -> Vec<PartData> {
        self.parts
            .iter()
            .map(|part| PartData {
                slot: part.slot,
                item: part.item.clone(),
                damage_amount: part.damage_amount,
                inventory: match &part.kind {
                    PartKind::Crate { inventory, .. } => Some(inventory.clone()),
                    _ => None,
                },
                launcher: part
                    .launcher()
                    .and_then(|id| registry.entity_as::<Launcher>(id))
                    .map(Launcher::save_data),
            })
            .collect()
    }

    /// Moves every box with the owner's pose.
    pub fn refresh(&mut self, position: DVec3, orientation: DMat3) {
        for bounding_box in self.body_boxes.iter_mut().chain(self.bullet_boxes.iter_mut()) {
            bounding_box.update_to_entity(position, orientation);
        }
        for (_, bounding_box) in &mut self.slot_boxes {
            bounding_box.update_to_entity(position, orientation);
        }
        for part in &mut self.parts {
            let Some(slot) = self.definition.part_slots.get(part.slot) else {
                continue;
            };
            part.position = position + orientation * slot.pos;
            part.orientation = orientation * rotation_from_angles(slot.rot);
            for bounding_box in &mut part.boxes {
                bounding_box.update_to_entity(part.position, part.orientation);
            }
        }
        let all_boxes = self
            .body_boxes
            .iter()
            .chain(self.bullet_boxes.iter())
            .chain(self.slot_boxes.iter().map(|(_, bounding_box)| bounding_box))
            .chain(self.parts.iter().flat_map(|part| part.boxes.iter()));
        self.encompassing_box = BoundingBox::encompassing(all_boxes, position);
    }

    /// Boxes players interact with: body, parts and empty-slot placeholders.
    pub fn interaction_boxes(&self) -> impl Iterator<Item = (HitBoxRef, &BoundingBox)> {
        let body = self
            .body_boxes
            .iter()
            .enumerate()
            .map(|(index, bounding_box)| (HitBoxRef::Body(index), bounding_box));
        let parts = self.parts.iter().flat_map(|part| {
            part.boxes.iter().enumerate().map(move |(index, bounding_box)| {
                (
                    HitBoxRef::Part {
                        slot: part.slot,
                        index,
                    },
                    bounding_box,
                )
            })
        });
        let slots = self
            .slot_boxes
            .iter()
            .map(|(slot, bounding_box)| (HitBoxRef::Slot(*slot), bounding_box));
        body.chain(parts).chain(slots)
    }

    /// Boxes projectiles can strike: interaction boxes without slot placeholders, plus
    /// bullet-only boxes.
    pub fn projectile_boxes(&self) -> impl Iterator<Item = (HitBoxRef, &BoundingBox)> {
        let bullets = self
            .bullet_boxes
            .iter()
            .enumerate()
            .map(|(index, bounding_box)| (HitBoxRef::BulletCollision(index), bounding_box));
        self.interaction_boxes()
            .filter(|(hit_box, _)| !matches!(hit_box, HitBoxRef::Slot(_)))
            .chain(bullets)
    }

    pub fn hit_box(&self, hit_box: HitBoxRef) -> Option<&BoundingBox> {
        match hit_box {
            HitBoxRef::Body(index) => self.body_boxes.get(index),
            HitBoxRef::BulletCollision(index) => self.bullet_boxes.get(index),
            HitBoxRef::Part { slot, index } => self.part(slot)?.boxes.get(index),
            HitBoxRef::Slot(slot) => self
                .slot_boxes
                .iter()
                .find(|(other, _)| *other == slot)
                .map(|(_, bounding_box)| bounding_box),
        }
    }

    pub fn is_wrecked(&self) -> bool {
        self.definition.health > 0.0 && self.damage_amount >= self.definition.health
    }

    /// Damages the body; returns true when this hit wrecked it.
    pub fn attack(&mut self, amount: f64) -> bool {
        if self.is_wrecked() {
            return false;
        }
        self.damage_amount += amount;
        if self.definition.health > 0.0 && self.damage_amount >= self.definition.health {
            self.damage_amount = self.definition.health;
            return true;
        }
        false
    }

    /// Damages a collision group. Returns the group's new damage, or `None` for core groups.
    pub fn damage_collision_box(&mut self, group: CollisionGroupRef, amount: f64) -> Option<f64> {
        if group.health == 0.0 {
            return None;
        }
        let damage = self.collision_damage.get_mut(group.index)?;
        *damage = (*damage + amount).min(group.health);
        Some(*damage)
    }

    /// Damages the part in `slot`; parts whose damage reaches their health are removed.
    pub fn attack_part(&mut self, slot: usize, amount: f64) -> PartDamage {
        let Some(part) = self.part_mut(slot) else {
            return PartDamage::Missing;
        };
        part.damage_amount += amount;
        let health = part.definition.health;
        if health > 0.0 && part.damage_amount >= health {
            self.remove_part(slot);
            return PartDamage::Destroyed;
        }
        PartDamage::Damaged
    }

    pub fn contains_launcher(&self, launcher: EntityId) -> bool {
        self.parts
            .iter()
            .any(|part| part.launcher() == Some(launcher))
    }

    /// Launchers of type `item` linked to the seat in `seat_slot`, ordered by slot.
    pub fn launcher_group(&self, seat_slot: usize, item: &ItemKey) -> Vec<EntityId> {
        self.parts
            .iter()
            .filter(|part| &part.item == item)
            .filter(|part| {
                self.slot_definition(part.slot)
                    .is_some_and(|slot| slot.linked_seats.contains(&seat_slot))
            })
            .filter_map(VehiclePart::launcher)
            .collect()
    }

    /// First occupied seat linked to the launcher slot.
    pub fn seat_controller(&self, launcher_slot: usize) -> Option<(ActorId, usize)> {
        let slot = self.slot_definition(launcher_slot)?;
        slot.linked_seats.iter().find_map(|seat_slot| {
            self.seat(*seat_slot)
                .and_then(|seat| seat.rider)
                .map(|rider| (rider, *seat_slot))
        })
    }

    /// Crates on this body that launchers may draw ammunition from.
    pub fn feeding_crates_mut(&mut self) -> impl Iterator<Item = &mut Inventory> {
        self.parts.iter_mut().filter_map(|part| match &mut part.kind {
            PartKind::Crate {
                inventory,
                feeds_vehicles: true,
            } => Some(inventory),
            _ => None,
        })
    }

    pub fn footprint_loaded(&self, world: &dyn WorldPort) -> bool {
        let (min, max) = (self.encompassing_box.min(), self.encompassing_box.max());
        let y = self.encompassing_box.global_center.y;
        [
            DVec3::new(min.x, y, min.z),
            DVec3::new(min.x, y, max.z),
            DVec3::new(max.x, y, min.z),
            DVec3::new(max.x, y, max.z),
        ]
        .into_iter()
        .all(|corner| world.is_chunk_loaded(corner))
    }
}

/// Saved state of a vehicle. `parts: None` installs the definition's default parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleData {
    #[serde(flatten)]
    pub item: ItemKey,
    pub uuid: EntityId,
    pub position: DVec3,
    #[serde(default)]
    pub motion: DVec3,
    #[serde(default)]
    pub orientation: DMat3,
    #[serde(default)]
    pub damage_amount: f64,
    #[serde(default)]
    pub collision_damage: Vec<f64>,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
    #[serde(default)]
    pub towing: Option<EntityId>,
    #[serde(default)]
    pub towed_by: Option<EntityId>,
    #[serde(default)]
    pub parts: Option<Vec<PartData>>,
}

impl VehicleData {
    pub fn fresh(item: ItemKey, uuid: EntityId, position: DVec3, orientation: DMat3) -> Self {
        Self {
            item,
            uuid,
            position,
            motion: DVec3::ZERO,
            orientation,
            damage_amount: 0.0,
            collision_damage: Vec::new(),
            variables: BTreeMap::new(),
            towing: None,
            towed_by: None,
            parts: None,
        }
    }
}

/// Movable multipart with seats, crates and launchers.
pub struct Vehicle {
    core: EntityCore,
    item: ItemKey,
    body: MultipartBody,
    towing: Option<EntityId>,
    towed_by: Option<EntityId>,
}

impl Vehicle {
    pub fn from_data(
        item: ItemKey,
        definition: Arc<MultipartDefinition>,
        pack: &PackRegistry,
        data: &Value,
    ) -> Result<Spawned, SpawnError> {
        let saved: VehicleData =
            serde_json::from_value(data.clone()).map_err(SpawnError::Malformed)?;
        let mut core = EntityCore::new(saved.uuid, saved.position, saved.orientation, saved.motion);
        core.variables = saved.variables;

        let mut body = MultipartBody::new(definition);
        body.damage_amount = saved.damage_amount;
        for (slot, damage) in body
            .collision_damage
            .iter_mut()
            .zip(saved.collision_damage.iter())
        {
            *slot = *damage;
        }
        let parts = body.add_parts_post_construction(core.uuid, pack, saved.parts.as_deref());
        body.refresh(core.position, core.orientation);
        core.bounding_box = body.encompassing_box;

        info!(entity_id = %core.uuid, item = %item, parts = parts.len(), "vehicle constructed");
        Ok(Spawned {
            entity: Box::new(Vehicle {
                core,
                item,
                body,
                towing: saved.towing,
                towed_by: saved.towed_by,
            }),
            parts,
        })
    }

    pub fn item(&self) -> &ItemKey {
        &self.item
    }

    pub fn body(&self) -> &MultipartBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut MultipartBody {
        &mut self.body
    }

    pub fn towing(&self) -> Option<EntityId> {
        self.towing
    }

    pub fn set_towing(&mut self, towed: Option<EntityId>) {
        self.towing = towed;
    }

    pub fn set_towed_by(&mut self, tower: Option<EntityId>) {
        self.towed_by = tower;
    }
}

impl Entity for Vehicle {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "vehicle"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has_capability(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::Renderable
                | Capability::Definable
                | Capability::Interactable
                | Capability::Multipart
                | Capability::Towable
        )
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.core.snapshot_previous();
        if let Some(tower) = self.towed_by {
            match ctx.registry.entity(tower) {
                Some(tower) => self.core.motion = tower.core().motion,
                None => {
                    // Tower is gone; the chain is broken.
                    self.towed_by = None;
                }
            }
        }
        self.core.position += self.core.motion;
    }

    fn post_update(&mut self, _ctx: &mut TickContext<'_>) {
        self.body.refresh(self.core.position, self.core.orientation);
        self.core.bounding_box = self.body.encompassing_box;
    }

    fn can_collide(&self) -> bool {
        true
    }

    fn loads_from_world_data(&self) -> bool {
        true
    }

    fn can_update(&self, world: &dyn WorldPort) -> bool {
        self.body.footprint_loaded(world)
    }

    fn towed_by(&self) -> Option<EntityId> {
        self.towed_by
    }

    fn towed_entity(&self) -> Option<EntityId> {
        self.towing
    }

    fn save(&self, registry: &EntityRegistry) -> Option<Value> {
        let data = VehicleData {
            item: self.item.clone(),
            uuid: self.core.uuid,
            position: self.core.position,
            motion: self.core.motion,
            orientation: self.core.orientation,
            damage_amount: self.body.damage_amount,
            collision_damage: self.body.collision_damage.clone(),
            variables: self.core.variables.clone(),
            towing: self.towing,
            towed_by: self.towed_by,
            parts: Some(self.body.save_parts(registry)),
        };
        serde_json::to_value(data)
            .inspect_err(|e| error!(error = %e, entity_id = %self.core.uuid, "failed to save vehicle"))
            .ok()
    }

    fn as_multipart(&self) -> Option<&MultipartBody> {
        Some(&self.body)
    }

    fn as_multipart_mut(&mut self) -> Option<&mut MultipartBody> {
        Some(&mut self.body)
    }
}

/// Saved state of a part placed directly in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPartData {
    pub is_placed_part: bool,
    pub uuid: EntityId,
    pub position: DVec3,
    #[serde(default)]
    pub orientation: DMat3,
    pub part: PartData,
}

impl PlacedPartData {
    pub fn fresh(item: ItemKey, uuid: EntityId, position: DVec3, orientation: DMat3) -> Self {
        Self {
            is_placed_part: true,
            uuid,
            position,
            orientation,
            part: PartData::fresh(0, item),
        }
    }
}

/// Single part standing on its own, e.g. an emplaced launcher.
pub struct PlacedPart {
    core: EntityCore,
    body: MultipartBody,
}

impl PlacedPart {
    pub fn from_data(pack: &PackRegistry, data: &Value) -> Result<Spawned, SpawnError> {
        let saved: PlacedPartData =
            serde_json::from_value(data.clone()).map_err(SpawnError::Malformed)?;
        let definition = Arc::new(MultipartDefinition {
            part_slots: vec![PartSlotDefinition::default()],
            ..Default::default()
        });
        let mut core = EntityCore::new(saved.uuid, saved.position, saved.orientation, DVec3::ZERO);
        let mut body = MultipartBody::new(definition);
        let part = PartData {
            slot: 0,
            ..saved.part
        };
        let item = part.item.clone();
        let parts = body.add_parts_post_construction(core.uuid, pack, Some(std::slice::from_ref(&part)));
        if body.parts.is_empty() {
            return Err(SpawnError::MissingPart(item));
        }
        body.refresh(core.position, core.orientation);
        core.bounding_box = body.encompassing_box;
        Ok(Spawned {
            entity: Box::new(PlacedPart { core, body }),
            parts,
        })
    }

    pub fn body(&self) -> &MultipartBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut MultipartBody {
        &mut self.body
    }
}

impl Entity for PlacedPart {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "placed_part"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has_capability(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::Renderable
                | Capability::Definable
                | Capability::Interactable
                | Capability::Multipart
        )
    }

    fn update(&mut self, _ctx: &mut TickContext<'_>) {
        self.core.snapshot_previous();
        if self.body.parts.is_empty() {
            // The only part was destroyed.
            self.core.valid = false;
        }
    }

    fn post_update(&mut self, _ctx: &mut TickContext<'_>) {
        self.body.refresh(self.core.position, self.core.orientation);
        self.core.bounding_box = self.body.encompassing_box;
    }

    fn can_collide(&self) -> bool {
        true
    }

    fn loads_from_world_data(&self) -> bool {
        true
    }

    fn save(&self, registry: &EntityRegistry) -> Option<Value> {
        let part = self.body.save_parts(registry).into_iter().next()?;
        let data = PlacedPartData {
            is_placed_part: true,
            uuid: self.core.uuid,
            position: self.core.position,
            orientation: self.core.orientation,
            part,
        };
        serde_json::to_value(data)
            .inspect_err(|e| error!(error = %e, entity_id = %self.core.uuid, "failed to save placed part"))
            .ok()
    }

    fn as_multipart(&self) -> Option<&MultipartBody> {
        Some(&self.body)
    }

    fn as_multipart_mut(&mut self) -> Option<&mut MultipartBody> {
        Some(&mut self.body)
    }
}
