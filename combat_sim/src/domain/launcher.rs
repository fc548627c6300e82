// Domain launchers: aim limits, the firing state machine, reloading and projectile spawning.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::definitions::{
    GuidanceSystem, ItemKey, LauncherDefinition, MountLimits, Muzzle, PackRegistry,
    ProjectileDefinition,
};
use crate::domain::entity::{Capability, Entity, EntityCore, EntityId, TickContext, UpdateType};
use crate::domain::geometry::{re_origin, rotation_from_angles, vector_angles, wrap_degrees};
use crate::domain::inventory::Inventory;
use crate::domain::multipart::MultipartBody;
use crate::domain::ports::{ActorId, ActorView};
use crate::domain::projectile::{Projectile, ProjectileLaunch, ProjectileTarget};
use crate::domain::registry::GunRecord;
use crate::domain::sync::SyncMessage;

/// Ordered launcher states; later states imply the earlier ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LauncherState {
    #[default]
    Inactive,
    Active,
    Controlled,
    FiringRequested,
    FiringCurrently,
}

impl LauncherState {
    /// Raises the state to `to`, never lowering it.
    pub fn promote(self, to: LauncherState) -> LauncherState {
        self.max(to)
    }

    /// Lowers the state to `to`, never raising it.
    pub fn demote(self, to: LauncherState) -> LauncherState {
        self.min(to)
    }

    pub fn is_at_least(self, other: LauncherState) -> bool {
        self >= other
    }
}

/// Effective aim limits in the launcher's internal frame (positive pitch points down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimLimits {
    pub min_yaw: f64,
    pub max_yaw: f64,
    pub default_yaw: f64,
    pub yaw_speed: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
    pub default_pitch: f64,
    pub pitch_speed: f64,
    /// Mount allows a full turn; yaw wraps instead of clamping.
    pub free_yaw: bool,
}

fn narrow_lower(definition: f64, mount: f64) -> f64 {
    match (definition != 0.0, mount != 0.0) {
        (true, true) => definition.max(mount),
        (true, false) => definition,
        _ => mount,
    }
}

fn narrow_upper(definition: f64, mount: f64) -> f64 {
    match (definition != 0.0, mount != 0.0) {
        (true, true) => definition.min(mount),
        (true, false) => definition,
        _ => mount,
    }
}

fn slowest(definition: f64, mount: f64) -> f64 {
    match (definition != 0.0, mount != 0.0) {
        (true, true) => definition.min(mount),
        (true, false) => definition,
        _ => mount,
    }
}

/// Clamp that tolerates inverted bounds instead of panicking.
fn clamp_loose(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

impl AimLimits {
    /// Intersects the mount's limits with the launcher's own. Zero means "unset" on either side.
    ///
    /// Definitions express pitch with up positive; the result is flipped into the internal frame.
    pub fn resolve(mount: &MountLimits, definition: &LauncherDefinition) -> Self {
        let free_yaw = mount.min_yaw == -180.0 && mount.max_yaw == 180.0;
        let (min_yaw, max_yaw) = if free_yaw {
            (-180.0, 180.0)
        } else {
            (
                narrow_lower(definition.min_yaw, mount.min_yaw),
                narrow_upper(definition.max_yaw, mount.max_yaw),
            )
        };
        let default_yaw = if mount.default_yaw != 0.0
            && mount.default_yaw >= min_yaw
            && mount.default_yaw <= max_yaw
        {
            mount.default_yaw
        } else {
            definition.default_yaw
        };

        let min_pitch = -narrow_upper(definition.max_pitch, mount.max_pitch);
        let max_pitch = -narrow_lower(definition.min_pitch, mount.min_pitch);
        let default_pitch = if mount.default_pitch != 0.0
            && -mount.default_pitch >= min_pitch
            && -mount.default_pitch <= max_pitch
        {
            -mount.default_pitch
        } else {
            -definition.default_pitch
        };

        Self {
            min_yaw,
            max_yaw,
            default_yaw,
            yaw_speed: slowest(definition.yaw_speed, mount.yaw_speed),
            min_pitch,
            max_pitch,
            default_pitch,
            pitch_speed: slowest(definition.pitch_speed, mount.pitch_speed),
            free_yaw,
        }
    }

    pub fn yaw_in_range(&self, yaw: f64) -> bool {
        self.free_yaw || (yaw >= self.min_yaw && yaw <= self.max_yaw)
    }

    pub fn pitch_in_range(&self, pitch: f64) -> bool {
        pitch >= self.min_pitch && pitch <= self.max_pitch
    }
}

/// What a launcher is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherMount {
    /// Installed in `slot` of a vehicle or placed part.
    Mounted { vehicle: EntityId, slot: usize },
    HandHeld { holder: ActorId },
}

/// A projectile item resolved against the pack.
#[derive(Debug, Clone, PartialEq)]
pub struct AmmoItem {
    pub key: ItemKey,
    pub definition: Arc<ProjectileDefinition>,
}

impl AmmoItem {
    pub fn resolve(pack: &PackRegistry, key: &ItemKey) -> Option<Self> {
        pack.projectile(key).map(|definition| Self {
            key: key.clone(),
            definition,
        })
    }
}

fn active_by_default() -> bool {
    true
}

/// Saved launcher state, stored inside the owning multipart's part data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherData {
    pub uuid: EntityId,
    #[serde(default)]
    pub state: LauncherState,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub rounds_left: u32,
    #[serde(default)]
    pub current_muzzle_group: usize,
    /// (pitch, yaw, roll) relative to the mount.
    #[serde(default)]
    pub internal_angles: DVec3,
    #[serde(default)]
    pub loaded: Option<ItemKey>,
    #[serde(default)]
    pub reloading: Option<ItemKey>,
}

/// Who is driving the launcher this tick.
#[derive(Debug, Clone)]
struct ControlLink {
    actor: ActorView,
    /// Seat the controller sits in, for mounted launchers.
    seat: Option<usize>,
    /// Controlled through a coaxial partner: aim only, never fire.
    coaxial: bool,
}

/// Where the mount puts the launcher this tick.
#[derive(Debug, Clone, Copy)]
struct MountPose {
    position: DVec3,
    zero_reference: DMat3,
    motion: DVec3,
}

enum MountStatus {
    Attached {
        pose: MountPose,
        control: Option<ControlLink>,
    },
    /// The mount, or the part holding this launcher, no longer exists.
    Detached,
    /// The mount sits outside loaded chunks and is not ticking.
    Frozen,
}

/// Turret or hand-held launcher firing projectiles.
pub struct Launcher {
    core: EntityCore,
    item: ItemKey,
    definition: Arc<LauncherDefinition>,
    mount: LauncherMount,
    limits: AimLimits,
    zero_reference: DMat3,
    internal_angles: DVec3,
    prev_internal_angles: DVec3,

    state: LauncherState,
    active: bool,
    trigger: bool,
    controller: Option<ActorId>,
    controller_is_player: bool,
    entity_target: Option<ActorId>,
    target_point: Option<DVec3>,

    cooldown: u32,
    cam_offset: i32,
    windup: u32,
    fired_this_request: bool,
    fired_this_check: bool,
    current_muzzle_group: usize,

    rounds_left: u32,
    loaded: Option<AmmoItem>,
    reloading: Option<AmmoItem>,
    client_next: Option<AmmoItem>,
    reload_time_remaining: u32,
    next_bullet_number: u32,
}

impl Launcher {
    /// Builds a launcher installed in a multipart slot, restoring `saved` state if present.
    pub fn mounted(
        vehicle: EntityId,
        slot: usize,
        item: ItemKey,
        definition: Arc<LauncherDefinition>,
        mount_limits: &MountLimits,
        saved: Option<&LauncherData>,
        pack: &PackRegistry,
    ) -> Self {
        let limits = AimLimits::resolve(mount_limits, &definition);
        let uuid = saved.map(|data| data.uuid).unwrap_or_else(Uuid::new_v4);
        let mut launcher = Self::build(
            uuid,
            item,
            definition,
            LauncherMount::Mounted { vehicle, slot },
            limits,
        );
        if let Some(data) = saved {
            launcher.restore(data, pack);
        }
        launcher
    }

    /// Builds a launcher carried by an actor. It is removed as soon as nobody holds it.
    pub fn hand_held(
        holder: ActorId,
        item: ItemKey,
        definition: Arc<LauncherDefinition>,
        _pack: &PackRegistry,
    ) -> Self {
        let limits = AimLimits::resolve(&MountLimits::default(), &definition);
        Self::build(
            Uuid::new_v4(),
            item,
            definition,
            LauncherMount::HandHeld { holder },
            limits,
        )
    }

    fn build(
        uuid: EntityId,
        item: ItemKey,
        definition: Arc<LauncherDefinition>,
        mount: LauncherMount,
        limits: AimLimits,
    ) -> Self {
        let internal_angles = match mount {
            LauncherMount::Mounted { .. } => DVec3::new(limits.default_pitch, limits.default_yaw, 0.0),
            LauncherMount::HandHeld { .. } => DVec3::ZERO,
        };
        Self {
            core: EntityCore::new(uuid, DVec3::ZERO, DMat3::IDENTITY, DVec3::ZERO),
            item,
            definition,
            mount,
            limits,
            zero_reference: DMat3::IDENTITY,
            internal_angles,
            prev_internal_angles: internal_angles,
            state: LauncherState::Inactive,
            active: true,
            trigger: false,
            controller: None,
            controller_is_player: false,
            entity_target: None,
            target_point: None,
            cooldown: 0,
            cam_offset: 0,
            windup: 0,
            fired_this_request: false,
            fired_this_check: false,
            current_muzzle_group: 0,
            rounds_left: 0,
            loaded: None,
            reloading: None,
            client_next: None,
            reload_time_remaining: 0,
            next_bullet_number: 0,
        }
    }

    fn restore(&mut self, data: &LauncherData, pack: &PackRegistry) {
        self.state = data.state;
        self.active = data.active;
        self.rounds_left = data.rounds_left;
        self.current_muzzle_group = data.current_muzzle_group;
        self.internal_angles = data.internal_angles;
        self.prev_internal_angles = data.internal_angles;
        self.loaded = data
            .loaded
            .as_ref()
            .and_then(|key| AmmoItem::resolve(pack, key))
            .filter(|ammo| self.is_compatible(&ammo.definition));
        self.reloading = data
            .reloading
            .as_ref()
            .and_then(|key| AmmoItem::resolve(pack, key));
        if self.reloading.is_some() {
            self.reload_time_remaining = self.definition.reload_time;
        }
        if self.loaded.is_none() && self.rounds_left > 0 {
            warn!(
                launcher_id = %self.core.uuid,
                rounds = self.rounds_left,
                "loaded ammunition no longer resolves; dropping rounds"
            );
            self.rounds_left = 0;
        }
    }

    pub fn save_data(&self) -> LauncherData {
        LauncherData {
            uuid: self.core.uuid,
            state: self.state,
            active: self.active,
            rounds_left: self.rounds_left,
            current_muzzle_group: self.current_muzzle_group,
            internal_angles: self.internal_angles,
            loaded: self.loaded.as_ref().map(|ammo| ammo.key.clone()),
            reloading: self.reloading.as_ref().map(|ammo| ammo.key.clone()),
        }
    }

    pub fn item(&self) -> &ItemKey {
        &self.item
    }

    pub fn definition(&self) -> &Arc<LauncherDefinition> {
        &self.definition
    }

    pub fn mount(&self) -> LauncherMount {
        self.mount
    }

    pub fn limits(&self) -> &AimLimits {
        &self.limits
    }

    pub fn state(&self) -> LauncherState {
        self.state
    }

    pub fn rounds_left(&self) -> u32 {
        self.rounds_left
    }

    pub fn loaded(&self) -> Option<&ItemKey> {
        self.loaded.as_ref().map(|ammo| &ammo.key)
    }

    pub fn reloading(&self) -> Option<&ItemKey> {
        self.reloading.as_ref().map(|ammo| &ammo.key)
    }

    pub fn internal_angles(&self) -> DVec3 {
        self.internal_angles
    }

    pub fn controller(&self) -> Option<ActorId> {
        self.controller
    }

    pub fn entity_target(&self) -> Option<ActorId> {
        self.entity_target
    }

    pub fn target_point(&self) -> Option<DVec3> {
        self.target_point
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn set_trigger(&mut self, pressed: bool) {
        self.trigger = pressed;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Round the server told this client to load next.
    pub fn set_client_next(&mut self, ammo: AmmoItem) {
        self.client_next = Some(ammo);
    }

    fn is_compatible(&self, projectile: &ProjectileDefinition) -> bool {
        projectile.diameter == self.definition.diameter
            && projectile.length >= self.definition.min_length
            && projectile.length <= self.definition.max_length
    }

    /// Starts loading `ammo` if it fits. The caller announces the reload to clients.
    ///
    /// Only the round already loaded, or a compatible one when empty, is accepted, and only while
    /// nothing else is reloading and the rounds fit in the magazine.
    pub fn try_to_reload(&mut self, ammo: &AmmoItem) -> bool {
        if self.reloading.is_some() {
            return false;
        }
        let accepted = match &self.loaded {
            Some(loaded) => loaded.key == ammo.key,
            None => self.is_compatible(&ammo.definition),
        };
        let after_reload = ammo.definition.quantity.saturating_add(self.rounds_left);
        if !accepted || after_reload > self.definition.capacity {
            return false;
        }
        self.reloading = Some(ammo.clone());
        self.reload_time_remaining = self.definition.reload_time;
        true
    }

    /// Rotates by the given deltas, limited by turn speed and aim limits.
    pub fn handle_movement(&mut self, delta_yaw: f64, delta_pitch: f64) {
        let limits = self.limits;
        let delta_yaw = clamp_loose(wrap_degrees(delta_yaw), -limits.yaw_speed, limits.yaw_speed);
        self.internal_angles.y += delta_yaw;
        if limits.free_yaw {
            if self.internal_angles.y > 180.0 {
                self.internal_angles.y -= 360.0;
                self.prev_internal_angles.y -= 360.0;
            } else if self.internal_angles.y < -180.0 {
                self.internal_angles.y += 360.0;
                self.prev_internal_angles.y += 360.0;
            }
        } else {
            self.internal_angles.y = clamp_loose(self.internal_angles.y, limits.min_yaw, limits.max_yaw);
        }

        let delta_pitch = clamp_loose(delta_pitch, -limits.pitch_speed, limits.pitch_speed);
        self.internal_angles.x = clamp_loose(
            self.internal_angles.x + delta_pitch,
            limits.min_pitch,
            limits.max_pitch,
        );
    }

    fn resolve_mount(&self, ctx: &TickContext<'_>) -> MountStatus {
        match self.mount {
            LauncherMount::HandHeld { holder } => match ctx.world.actor(holder) {
                Some(actor) if actor.valid => MountStatus::Attached {
                    pose: MountPose {
                        position: actor.eye_position(),
                        zero_reference: actor.look,
                        motion: actor.velocity,
                    },
                    control: Some(ControlLink {
                        actor,
                        seat: None,
                        coaxial: false,
                    }),
                },
                _ => MountStatus::Detached,
            },
            LauncherMount::Mounted { vehicle, slot } => {
                let Some(mount) = ctx.registry.entity(vehicle) else {
                    return MountStatus::Detached;
                };
                let Some(body) = mount.as_multipart() else {
                    return MountStatus::Detached;
                };
                let Some(part) = body.part(slot).filter(|part| part.launcher() == Some(self.core.uuid))
                else {
                    return MountStatus::Detached;
                };
                if !body.footprint_loaded(&*ctx.world) {
                    return MountStatus::Frozen;
                }
                let pose = MountPose {
                    position: part.position,
                    zero_reference: part.orientation,
                    motion: mount.core().motion,
                };
                MountStatus::Attached {
                    pose,
                    control: self.seat_control(ctx, body),
                }
            }
        }
    }

    /// Rider of a linked seat that has this launcher selected, else a coaxial partner's rider.
    fn seat_control(&self, ctx: &TickContext<'_>, body: &MultipartBody) -> Option<ControlLink> {
        let LauncherMount::Mounted { slot, .. } = self.mount else {
            return None;
        };
        if body.is_wrecked() {
            return None;
        }
        if let Some(link) = selecting_rider(ctx, body, slot, &self.item, self.core.uuid, &self.definition)
        {
            return Some(link);
        }
        let coaxial_slots = body.slot_definition(slot)?.coaxial_slots.clone();
        coaxial_slots.into_iter().find_map(|partner_slot| {
            let partner = body.part(partner_slot)?;
            let partner_launcher = partner.launcher()?;
            let partner_definition = partner.definition.launcher.as_ref()?;
            selecting_rider(
                ctx,
                body,
                partner_slot,
                &partner.item,
                partner_launcher,
                partner_definition,
            )
            .map(|link| ControlLink {
                coaxial: true,
                seat: None,
                ..link
            })
        })
    }

    /// Aim from the launcher to a target, or `None` when it is out of limits or out of sight.
    fn validate_target(&self, ctx: &TickContext<'_>, target: &ActorView) -> Option<DVec3> {
        if !target.valid {
            return None;
        }
        let mut aim = target.position + DVec3::new(0.0, target.eye_height / 2.0, 0.0);
        let exit_speed = ctx.tuning.projectile.per_tick(self.definition.exit_velocity);
        if exit_speed > 0.0 {
            let ticks_to_target = target.position.distance(self.core.position) / exit_speed;
            aim += target.velocity * ticks_to_target;
        }
        let vector = aim - self.core.position;
        let angles = vector_angles(re_origin(vector, self.zero_reference));
        if !self.limits.yaw_in_range(angles.y) || !self.limits.pitch_in_range(angles.x) {
            return None;
        }
        ctx.world
            .block_hit(self.core.position, vector)
            .is_none()
            .then_some(angles)
    }

    fn handle_control(&mut self, ctx: &TickContext<'_>, control: &ControlLink) {
        if !control.actor.is_player {
            self.handle_npc_control(ctx, control);
            return;
        }

        if let Some(ammo) = self.loaded.as_ref().filter(|ammo| ammo.definition.turn_rate > 0.0) {
            let guidance = ammo.definition.guidance_system;
            self.entity_target = ctx
                .world
                .actor_looking_at(control.actor.id, ctx.tuning.launcher.raytrace_distance);
            self.target_point = None;
            if self.entity_target.is_none() && guidance == GuidanceSystem::Gps {
                let look = control.actor.look * DVec3::Z * ctx.tuning.launcher.raytrace_distance;
                self.target_point = ctx
                    .world
                    .block_hit(control.actor.eye_position(), look)
                    .map(|hit| hit.point);
            }
        }

        self.state = if self.trigger {
            self.state.promote(LauncherState::FiringRequested)
        } else {
            self.state.demote(LauncherState::Controlled)
        };

        if control.seat.is_some() || control.coaxial {
            let look = re_origin(control.actor.look * DVec3::Z, self.zero_reference);
            let wanted = vector_angles(look);
            self.handle_movement(
                wanted.y - self.internal_angles.y,
                wanted.x - self.internal_angles.x,
            );
        }
    }

    fn handle_npc_control(&mut self, ctx: &TickContext<'_>, control: &ControlLink) {
        let tuning = &ctx.tuning.launcher;
        let check_for_closer = self.entity_target.is_some()
            && self.core.ticks_existed % tuning.retarget_interval_ticks.max(1) == 0;
        if self.entity_target.is_none() || check_for_closer {
            for candidate in ctx
                .world
                .hostiles_near(control.actor.id, tuning.hostile_search_radius)
            {
                let Some(view) = ctx.world.actor(candidate) else {
                    continue;
                };
                if self.validate_target(ctx, &view).is_none() {
                    continue;
                }
                if let Some(current) = self.entity_target.and_then(|id| ctx.world.actor(id)) {
                    let mut distance_to_beat = self.core.position.distance(current.position);
                    if check_for_closer {
                        distance_to_beat += tuning.retarget_margin;
                    }
                    if self.core.position.distance(view.position) > distance_to_beat {
                        continue;
                    }
                }
                self.entity_target = Some(candidate);
            }
        }

        let aim = self
            .entity_target
            .and_then(|id| ctx.world.actor(id))
            .and_then(|view| self.validate_target(ctx, &view));
        match aim {
            Some(angles) => {
                let on_target = (angles.y - self.internal_angles.y).abs() < self.limits.yaw_speed
                    && (angles.x - self.internal_angles.x).abs() < self.limits.pitch_speed;
                self.state = if on_target {
                    self.state.promote(LauncherState::FiringRequested)
                } else {
                    self.state.demote(LauncherState::Controlled)
                };
                if control.seat.is_some() || control.coaxial {
                    self.handle_movement(
                        angles.y - self.internal_angles.y,
                        angles.x - self.internal_angles.x,
                    );
                }
            }
            None => {
                self.entity_target = None;
                self.state = self.state.demote(LauncherState::Controlled);
            }
        }
    }

    /// Spawn position, motion and orientation of a projectile leaving `muzzle`.
    fn projectile_spawn(
        &self,
        muzzle: &Muzzle,
        mount_motion: DVec3,
        exit_speed: f64,
    ) -> (DVec3, DVec3, DMat3) {
        let internal = rotation_from_angles(self.internal_angles);
        let mut velocity = DVec3::new(0.0, 0.0, exit_speed);
        if let Some(rot) = muzzle.rot {
            velocity = rotation_from_angles(rot) * velocity;
        }
        let velocity = self.zero_reference * (internal * velocity) + mount_motion;

        let local = match muzzle.center {
            Some(center) => {
                let pitched = DMat3::from_rotation_x(self.internal_angles.x.to_radians())
                    * (muzzle.pos - center)
                    + center;
                DMat3::from_rotation_y(self.internal_angles.y.to_radians()) * pitched
            }
            None => internal * muzzle.pos,
        };
        let position = self.core.position + self.zero_reference * local;

        let mut orientation = self.zero_reference * internal;
        if !self.definition.disable_muzzle_orientation {
            if let Some(rot) = muzzle.rot {
                orientation *= rotation_from_angles(rot);
            }
        }
        (position, velocity, orientation)
    }

    /// Fires one projectile per muzzle of the current group.
    fn fire(&mut self, ctx: &mut TickContext<'_>, mount_motion: DVec3) {
        let Some(ammo) = self.loaded.clone() else {
            return;
        };
        let muzzles = self
            .definition
            .muzzle_groups
            .get(self.current_muzzle_group)
            .map(|group| group.muzzles.clone())
            .filter(|muzzles| !muzzles.is_empty())
            .unwrap_or_else(|| vec![Muzzle::default()]);
        let exit_speed = ctx.tuning.projectile.per_tick(self.definition.exit_velocity);
        let target = if ammo.definition.turn_rate > 0.0 {
            self.entity_target
                .map(ProjectileTarget::Actor)
                .or(self.target_point.map(ProjectileTarget::Point))
        } else {
            None
        };

        for muzzle in &muzzles {
            let (position, motion, orientation) =
                self.projectile_spawn(muzzle, mount_motion, exit_speed);
            self.next_bullet_number += 1;
            let projectile = Projectile::new(ProjectileLaunch {
                launcher: self.core.uuid,
                bullet_number: self.next_bullet_number,
                item: ammo.key.clone(),
                definition: ammo.definition.clone(),
                position,
                motion,
                orientation,
                max_speed: ctx.tuning.projectile.per_tick(ammo.definition.max_velocity),
                controller: self.controller,
                fired_by_player: self.controller_is_player,
                target,
            });
            ctx.registry.add_entity(Box::new(projectile));
            debug!(
                launcher_id = %self.core.uuid,
                bullet = self.next_bullet_number,
                item = %ammo.key,
                "projectile fired"
            );

            self.rounds_left = self.rounds_left.saturating_sub(1);
            if self.rounds_left == 0 {
                // Clients keep the item so a reload notice that raced ahead still has a round.
                if !ctx.is_client() {
                    self.loaded = None;
                }
                break;
            }
        }

        self.cooldown = self.definition.fire_delay;
        self.fired_this_request = true;
        self.fired_this_check = true;
        let groups = self.definition.muzzle_groups.len();
        self.current_muzzle_group = if groups == 0 {
            0
        } else {
            (self.current_muzzle_group + 1) % groups
        };
    }

    /// Cam offset for this launcher within its seat's group; -1 while waiting for its turn.
    fn group_cam_offset(&self, ctx: &TickContext<'_>, seat_slot: usize) -> i32 {
        let LauncherMount::Mounted { vehicle, .. } = self.mount else {
            return 0;
        };
        let Some(body) = ctx.registry.multipart(vehicle) else {
            return 0;
        };
        let group = body.launcher_group(seat_slot, &self.item);
        let Some(index) = group.iter().position(|id| *id == self.core.uuid) else {
            return 0;
        };
        let turn = body.seat(seat_slot).map(|seat| seat.launcher_group_index).unwrap_or(0);
        if turn == index {
            (self.definition.fire_delay as usize / group.len()) as i32
        } else {
            -1
        }
    }

    /// Hands the seat's firing turn to the next launcher of the group.
    fn cycle_group(&self, ctx: &mut TickContext<'_>, seat_slot: usize) {
        let LauncherMount::Mounted { vehicle, .. } = self.mount else {
            return;
        };
        let Some(body) = ctx.registry.multipart_mut(vehicle) else {
            return;
        };
        let group = body.launcher_group(seat_slot, &self.item);
        let Some(index) = group.iter().position(|id| *id == self.core.uuid) else {
            return;
        };
        if let Some(seat) = body.seat_mut(seat_slot) {
            seat.launcher_group_index = (index + 1) % group.len();
        }
    }

    /// Pulls one round from the first matching stack of `inventory`.
    fn reload_from(
        &mut self,
        inventory: &mut Inventory,
        pack: &PackRegistry,
        consume: bool,
    ) -> Option<ItemKey> {
        for index in 0..inventory.stacks.len() {
            let Some(ammo) = AmmoItem::resolve(pack, &inventory.stacks[index].item) else {
                continue;
            };
            if self.try_to_reload(&ammo) {
                if consume {
                    inventory.remove_one(index);
                }
                return Some(ammo.key);
            }
        }
        None
    }

    fn search_for_ammunition(&mut self, ctx: &mut TickContext<'_>) {
        let consume = !ctx.tuning.world.dev_mode;
        let reloaded = match self.mount {
            LauncherMount::HandHeld { holder } => {
                if !(self.definition.auto_reload || self.rounds_left == 0) {
                    return;
                }
                match ctx.world.actor_inventory_mut(holder) {
                    Some(inventory) => self.reload_from(inventory, ctx.pack, consume),
                    None => None,
                }
            }
            LauncherMount::Mounted { vehicle, .. } => {
                if !self.definition.auto_reload {
                    return;
                }
                let Some(body) = ctx.registry.multipart_mut(vehicle) else {
                    return;
                };
                let mut found = None;
                for inventory in body.feeding_crates_mut() {
                    found = self.reload_from(inventory, ctx.pack, consume);
                    if found.is_some() {
                        break;
                    }
                }
                found
            }
        };
        if let Some(item) = reloaded {
            debug!(launcher_id = %self.core.uuid, item = %item, "reloading");
            ctx.registry
                .outbox_mut()
                .send_to_all_clients(SyncMessage::LauncherReload {
                    launcher: self.core.uuid,
                    item,
                });
        }
    }

    fn update_windup(&mut self) {
        if self.state.is_at_least(LauncherState::FiringRequested) {
            if self.windup < self.definition.windup_time {
                self.windup += 1;
            }
        } else if self.windup > 0 {
            self.windup -= 1;
        }
        if !self.state.is_at_least(LauncherState::FiringRequested) {
            self.fired_this_request = false;
        }
    }
}

/// Control link for the launcher `launcher` of type `item` in `slot`, if a linked seat's rider has
/// it selected.
fn selecting_rider(
    ctx: &TickContext<'_>,
    body: &MultipartBody,
    slot: usize,
    item: &ItemKey,
    launcher: EntityId,
    definition: &LauncherDefinition,
) -> Option<ControlLink> {
    let (rider, seat_slot) = body.seat_controller(slot)?;
    let seat = body.seat(seat_slot)?;
    if seat.active_launcher.as_ref() != Some(item) {
        return None;
    }
    if definition.fire_solo {
        let group = body.launcher_group(seat_slot, item);
        if group.get(seat.launcher_index) != Some(&launcher) {
            return None;
        }
    }
    let actor = ctx.world.actor(rider).filter(|actor| actor.valid)?;
    Some(ControlLink {
        actor,
        seat: Some(seat_slot),
        coaxial: false,
    })
}

impl Entity for Launcher {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "launcher"
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
            Capability::Renderable | Capability::Definable | Capability::Launcher
        )
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.core.snapshot_previous();
        self.fired_this_check = false;
        self.prev_internal_angles = self.internal_angles;

        let (pose, control) = match self.resolve_mount(ctx) {
            MountStatus::Attached { pose, control } => (pose, control),
            MountStatus::Detached => {
                debug!(launcher_id = %self.core.uuid, mount = ?self.mount, "launcher lost its mount");
                self.core.valid = false;
                return;
            }
            MountStatus::Frozen => return,
        };
        self.zero_reference = pose.zero_reference;
        self.core.position = pose.position;
        self.core.motion = pose.motion;

        if self.active {
            self.controller = control.as_ref().map(|link| link.actor.id);
            self.controller_is_player = control.as_ref().is_some_and(|link| link.actor.is_player);
            let mut seat = None;
            match &control {
                Some(link) => {
                    self.state = self.state.promote(LauncherState::Controlled);
                    self.handle_control(ctx, link);
                    if link.coaxial {
                        self.state = self.state.demote(LauncherState::Active);
                        self.controller = None;
                        self.entity_target = None;
                        self.target_point = None;
                    } else {
                        seat = link.seat;
                    }
                }
                None => {
                    self.state = self.state.demote(LauncherState::Active);
                    self.entity_target = None;
                    self.target_point = None;
                }
            }

            if self.cooldown > 0 {
                self.cooldown -= 1;
            }

            let able_to_fire = self.windup == self.definition.windup_time
                && (!self.definition.is_semi_auto || !self.fired_this_request);
            if able_to_fire && self.state.is_at_least(LauncherState::FiringRequested) {
                if self.cooldown == 0 {
                    if self.cam_offset <= 0 {
                        self.cam_offset = match seat {
                            Some(seat_slot) if !self.definition.fire_solo => {
                                self.group_cam_offset(ctx, seat_slot)
                            }
                            _ => 0,
                        };
                    } else {
                        self.cam_offset -= 1;
                    }

                    let mut cycled = false;
                    if self.rounds_left > 0 {
                        self.state = self.state.promote(LauncherState::FiringCurrently);
                        if self.cam_offset == 0 {
                            self.fire(ctx, pose.motion);
                            cycled = true;
                        }
                    } else if self.cam_offset == 0 {
                        cycled = true;
                    }
                    if cycled {
                        if let Some(seat_slot) = seat {
                            self.cycle_group(ctx, seat_slot);
                        }
                    }
                }
            } else if !able_to_fire {
                self.state = self.state.demote(LauncherState::FiringRequested);
            }

            if !ctx.is_client()
                && self.rounds_left < self.definition.capacity
                && self.reloading.is_none()
            {
                self.search_for_ammunition(ctx);
            }

            if let Some(next) = self.client_next.take() {
                self.reloading = Some(next);
                self.reload_time_remaining = self.definition.reload_time;
            }

            if self.reload_time_remaining > 0 {
                self.reload_time_remaining -= 1;
            } else if let Some(reloaded) = self.reloading.take() {
                self.rounds_left = self.rounds_left.saturating_add(reloaded.definition.quantity);
                self.loaded = Some(reloaded);
            }
        } else {
            self.state = LauncherState::Inactive;
            self.controller = None;
            self.entity_target = None;
            self.target_point = None;
            if self.definition.reset_position {
                self.handle_movement(
                    self.limits.default_yaw - self.internal_angles.y,
                    self.limits.default_pitch - self.internal_angles.x,
                );
            }
        }

        self.update_windup();
        self.core.orientation = self.zero_reference * rotation_from_angles(self.internal_angles);
    }

    fn post_update(&mut self, _ctx: &mut TickContext<'_>) {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        let values = [
            ("launcher_active", flag(self.state.is_at_least(LauncherState::Controlled))),
            ("launcher_firing", flag(self.state.is_at_least(LauncherState::FiringRequested))),
            ("launcher_fired", flag(self.fired_this_check)),
            (
                "launcher_lockedon",
                flag(self.entity_target.is_some() || self.target_point.is_some()),
            ),
            ("launcher_cooldown", flag(self.cooldown > 0)),
            ("launcher_reload", flag(self.reload_time_remaining > 0)),
            ("launcher_ammo_count", f64::from(self.rounds_left)),
            ("launcher_windup_time", f64::from(self.windup)),
            (
                "launcher_windup_complete",
                flag(self.windup == self.definition.windup_time),
            ),
            ("launcher_yaw", self.internal_angles.y),
            ("launcher_pitch", self.internal_angles.x),
            ("launcher_active_muzzlegroup", (self.current_muzzle_group + 1) as f64),
        ];
        for (name, value) in values {
            self.core.set_variable(name, value);
        }
        self.core.bounding_box.global_center = self.core.position;
    }

    fn update_type(&self) -> UpdateType {
        UpdateType::Last
    }

    fn gun_record(&self) -> Option<GunRecord> {
        Some(GunRecord {
            launcher: self.core.uuid,
            item: self.item.clone(),
            definition: self.definition.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> LauncherDefinition {
        LauncherDefinition {
            min_yaw: -90.0,
            max_yaw: 90.0,
            yaw_speed: 10.0,
            min_pitch: -10.0,
            max_pitch: 45.0,
            pitch_speed: 5.0,
            capacity: 4,
            diameter: 70.0,
            min_length: 100.0,
            max_length: 300.0,
            ..Default::default()
        }
    }

    fn launcher(limits: &MountLimits) -> Launcher {
        Launcher::mounted(
            Uuid::new_v4(),
            0,
            ItemKey::new("test", "launcher"),
            Arc::new(definition()),
            limits,
            None,
            &PackRegistry::new(),
        )
    }

    fn ammo(diameter: f64, length: f64, quantity: u32) -> AmmoItem {
        AmmoItem {
            key: ItemKey::new("test", format!("rocket_{diameter}_{length}")),
            definition: Arc::new(ProjectileDefinition {
                diameter,
                length,
                quantity,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn when_states_are_promoted_or_demoted_then_order_is_respected() {
        use LauncherState::*;
        assert_eq!(Controlled.promote(FiringRequested), FiringRequested);
        assert_eq!(FiringCurrently.promote(Controlled), FiringCurrently);
        assert_eq!(FiringCurrently.demote(Active), Active);
        assert_eq!(Active.demote(Controlled), Active);
        assert!(FiringRequested.is_at_least(Controlled));
        assert!(!Active.is_at_least(Controlled));
    }

    #[test]
    fn when_mount_sets_tighter_limits_then_they_win() {
        let mount = MountLimits {
            min_yaw: -45.0,
            max_yaw: 120.0,
            yaw_speed: 4.0,
            max_pitch: 30.0,
            ..Default::default()
        };
        let limits = AimLimits::resolve(&mount, &definition());
        assert_eq!((limits.min_yaw, limits.max_yaw), (-45.0, 90.0));
        assert_eq!(limits.yaw_speed, 4.0);
        assert_eq!(limits.pitch_speed, 5.0);
        // Up is negative internally.
        assert_eq!((limits.min_pitch, limits.max_pitch), (-30.0, 10.0));
        assert!(!limits.free_yaw);
    }

    #[test]
    fn when_mount_is_unset_then_definition_limits_apply() {
        let limits = AimLimits::resolve(&MountLimits::default(), &definition());
        assert_eq!((limits.min_yaw, limits.max_yaw), (-90.0, 90.0));
        assert_eq!((limits.min_pitch, limits.max_pitch), (-45.0, 10.0));
    }

    #[test]
    fn when_mount_allows_full_turn_then_yaw_wraps() {
        let mount = MountLimits {
            min_yaw: -180.0,
            max_yaw: 180.0,
            ..Default::default()
        };
        let mut launcher = launcher(&mount);
        assert!(launcher.limits().free_yaw);
        launcher.internal_angles.y = 175.0;
        launcher.handle_movement(10.0, 0.0);
        assert!((launcher.internal_angles().y - -175.0).abs() < 1e-9);
    }

    #[test]
    fn when_movement_exceeds_speed_or_limits_then_it_is_clamped() {
        let mut launcher = launcher(&MountLimits::default());
        launcher.handle_movement(50.0, -50.0);
        assert_eq!(launcher.internal_angles().y, 10.0);
        assert_eq!(launcher.internal_angles().x, -5.0);

        for _ in 0..20 {
            launcher.handle_movement(50.0, 50.0);
        }
        assert_eq!(launcher.internal_angles().y, 90.0);
        assert_eq!(launcher.internal_angles().x, 10.0);
    }

    #[test]
    fn when_yaw_delta_crosses_the_seam_then_shortest_way_is_taken() {
        let mut launcher = launcher(&MountLimits::default());
        launcher.internal_angles.y = 0.0;
        launcher.handle_movement(350.0, 0.0);
        assert_eq!(launcher.internal_angles().y, -10.0);
    }

    #[test]
    fn when_ammo_does_not_fit_then_reload_is_refused() {
        let mut launcher = launcher(&MountLimits::default());
        assert!(!launcher.try_to_reload(&ammo(50.0, 200.0, 1)));
        assert!(!launcher.try_to_reload(&ammo(70.0, 400.0, 1)));
        assert!(!launcher.try_to_reload(&ammo(70.0, 200.0, 5)));
        assert!(launcher.try_to_reload(&ammo(70.0, 200.0, 2)));
        // Already reloading.
        assert!(!launcher.try_to_reload(&ammo(70.0, 200.0, 1)));
    }

    #[test]
    fn when_reload_quantity_would_overflow_then_it_is_refused() {
        let mut launcher = launcher(&MountLimits::default());
        launcher.rounds_left = 1;
        assert!(!launcher.try_to_reload(&ammo(70.0, 200.0, u32::MAX)));
        assert!(launcher.reloading().is_none());
        assert_eq!(launcher.rounds_left(), 1);
    }

    #[test]
    fn when_saved_ammo_no_longer_resolves_then_rounds_are_dropped() {
        let saved = LauncherData {
            uuid: Uuid::new_v4(),
            state: LauncherState::Active,
            active: true,
            rounds_left: 3,
            current_muzzle_group: 0,
            internal_angles: DVec3::new(0.0, 15.0, 0.0),
            loaded: Some(ItemKey::new("gone", "rocket")),
            reloading: None,
        };
        let launcher = Launcher::mounted(
            Uuid::new_v4(),
            0,
            ItemKey::new("test", "launcher"),
            Arc::new(definition()),
            &MountLimits::default(),
            Some(&saved),
            &PackRegistry::new(),
        );
        assert_eq!(launcher.rounds_left(), 0);
        assert!(launcher.loaded().is_none());
        assert_eq!(launcher.uuid(), saved.uuid);
        assert_eq!(launcher.internal_angles().y, 15.0);
    }
}
