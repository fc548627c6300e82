// Domain projectiles: ballistic flight, guidance and hit resolution against actors, multiparts
// and blocks.

use glam::{DMat3, DVec3};
use rand::Rng;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::damage::{
    ArmorLedger, Damage, DamageCause, HitType, effective_armor, penetration_potential,
    projectile_damage, velocity_ratio,
};
use crate::domain::definitions::{ItemKey, ProjectileDefinition};
use crate::domain::entity::{Capability, Entity, EntityCore, EntityHandle, EntityId, TickContext};
use crate::domain::geometry::{BoundingBox, CollisionGroupRef, facing, re_origin, vector_angles};
use crate::domain::multipart::{HitBoxRef, PartDamage};
use crate::domain::ports::ActorId;
use crate::domain::sync::SyncMessage;

/// What a guided projectile steers toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileTarget {
    Actor(ActorId),
    /// Fixed point, e.g. a GPS designation.
    Point(DVec3),
}

/// Everything a launcher hands over when it fires.
#[derive(Debug, Clone)]
pub struct ProjectileLaunch {
    pub launcher: EntityId,
    pub bullet_number: u32,
    pub item: ItemKey,
    pub definition: Arc<ProjectileDefinition>,
    pub position: DVec3,
    /// Blocks per tick, including the mount's motion.
    pub motion: DVec3,
    pub orientation: DMat3,
    /// Top speed in blocks per tick, reached after the acceleration time.
    pub max_speed: f64,
    /// Controller of the launcher at the time of firing.
    pub controller: Option<ActorId>,
    pub fired_by_player: bool,
    pub target: Option<ProjectileTarget>,
}

/// A multipart box struck along this tick's path.
#[derive(Debug, Clone, Copy)]
struct BoxHit {
    distance: f64,
    hit_box: HitBoxRef,
    bounding_box: BoundingBox,
}

pub struct Projectile {
    core: EntityCore,
    launcher: EntityId,
    bullet_number: u32,
    item: ItemKey,
    definition: Arc<ProjectileDefinition>,
    controller: Option<ActorId>,
    fired_by_player: bool,
    entity_target: Option<ActorId>,
    target_position: Option<DVec3>,
    target_distance: f64,
    initial_velocity: f64,
    /// Thrust per tick while accelerating.
    velocity_to_add_each_tick: f64,
    armor: ArmorLedger,
    last_hit: HitType,
    /// Ticks until removal after impact; -1 while flying.
    despawn_timer: i64,
}

impl Projectile {
    pub fn new(launch: ProjectileLaunch) -> Self {
        let mut core = EntityCore::new(
            Uuid::new_v4(),
            launch.position,
            launch.orientation,
            launch.motion,
        );
        let radius = launch.definition.diameter / 1000.0 / 2.0;
        core.bounding_box = BoundingBox::new(launch.position, radius, radius, radius);
        core.bounding_box.global_center = launch.position;

        let initial_velocity = launch.motion.length();
        let velocity_to_add_each_tick = if launch.definition.acceleration_time > 0 {
            (launch.max_speed - initial_velocity) / launch.definition.acceleration_time as f64
        } else {
            0.0
        };
        let (entity_target, target_position) = match launch.target {
            Some(ProjectileTarget::Actor(actor)) => (Some(actor), None),
            Some(ProjectileTarget::Point(point)) => (None, Some(point)),
            None => (None, None),
        };
        Self {
            core,
            launcher: launch.launcher,
            bullet_number: launch.bullet_number,
            item: launch.item,
            definition: launch.definition,
            controller: launch.controller,
            fired_by_player: launch.fired_by_player,
            entity_target,
            target_position,
            target_distance: 0.0,
            initial_velocity,
            velocity_to_add_each_tick,
            armor: ArmorLedger::default(),
            last_hit: HitType::None,
            despawn_timer: -1,
        }
    }

    pub fn launcher(&self) -> EntityId {
        self.launcher
    }

    pub fn bullet_number(&self) -> u32 {
        self.bullet_number
    }

    pub fn item(&self) -> &ItemKey {
        &self.item
    }

    pub fn last_hit(&self) -> HitType {
        self.last_hit
    }

    pub fn armor_penetrated(&self) -> f64 {
        self.armor.penetrated()
    }

    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    pub fn initial_velocity(&self) -> f64 {
        self.initial_velocity
    }

    fn is_burning(&self) -> bool {
        let delay = self.definition.acceleration_delay;
        delay == 0 || self.core.ticks_existed > delay
    }

    fn debug_message(&self, ctx: &mut TickContext<'_>, message: &str) {
        debug!(
            launcher_id = %self.launcher,
            bullet = self.bullet_number,
            position = ?self.core.position,
            "{message}"
        );
        if ctx.is_client() || !ctx.tuning.world.dev_mode || !self.fired_by_player {
            return;
        }
        if let Some(player) = self.controller {
            ctx.registry.outbox_mut().send_to_player(
                player,
                SyncMessage::Chat {
                    player,
                    message: message.to_string(),
                },
            );
        }
    }

    fn damage(&self, ctx: &TickContext<'_>) -> Damage {
        let ratio = velocity_ratio(self.core.velocity(), self.initial_velocity);
        Damage {
            amount: projectile_damage(
                &self.definition,
                ratio,
                ctx.tuning.projectile.bullet_damage_factor,
            ),
            hit_box: None,
            source: Some(self.launcher),
            controller: self.controller,
            cause: if self.fired_by_player {
                DamageCause::BulletPlayer
            } else {
                DamageCause::BulletNull
            },
            projectile: Some(self.item.clone()),
        }
    }

    /// Ends the flight: explodes on the server and starts the despawn countdown.
    fn explode(&mut self, ctx: &mut TickContext<'_>) {
        if !ctx.is_client() && self.last_hit != HitType::None {
            let strength = if self.definition.blast_strength == 0.0 {
                self.definition.diameter / 10.0
            } else {
                self.definition.blast_strength
            };
            info!(
                launcher_id = %self.launcher,
                hit = ?self.last_hit,
                strength,
                "projectile exploded"
            );
            ctx.world
                .spawn_explosion(self.core.position, strength, self.definition.is_incendiary);
        }
        self.despawn_timer = self.definition.impact_despawn_time as i64;
    }

    /// Gravity, slowdown and thrust. Returns false once the projectile timed out.
    fn apply_propulsion(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let definition = self.definition.clone();
        let ticks = self.core.ticks_existed;
        if ticks > definition.burn_time {
            if definition.slowdown_speed > 0.0 {
                let slowdown = self.core.motion.normalize_or_zero() * -definition.slowdown_speed;
                self.core.motion += slowdown;
            }
            let gravity = ctx
                .registry
                .bullet_gun(self.launcher)
                .map(|gun| gun.definition.gravitational_velocity)
                .unwrap_or(0.0);
            self.core.motion.y -= gravity;

            if ticks > definition.burn_time + ctx.tuning.projectile.timeout_grace_ticks {
                self.debug_message(ctx, "TIMEOUT");
                self.core.valid = false;
                return false;
            }
        }

        if self.velocity_to_add_each_tick != 0.0
            && self.is_burning()
            && (ticks as i64 - definition.acceleration_delay as i64)
                < definition.acceleration_time as i64
        {
            self.core.motion +=
                self.core.orientation * DVec3::new(0.0, 0.0, self.velocity_to_add_each_tick);
        }
        true
    }

    /// Turns toward the target by at most the turn rate per axis, keeping speed.
    fn apply_guidance(&mut self, ctx: &TickContext<'_>) {
        if !self.is_burning() {
            return;
        }
        if let Some(actor) = self.entity_target {
            match ctx.world.actor(actor).filter(|view| view.valid) {
                Some(view) => {
                    self.target_position =
                        Some(view.position + DVec3::new(0.0, view.height / 2.0, 0.0));
                }
                None => {
                    self.entity_target = None;
                    self.target_position = None;
                }
            }
        }
        let Some(target) = self.target_position else {
            return;
        };

        let turn_rate = self.definition.turn_rate.abs();
        let delta = vector_angles(re_origin(target - self.core.position, self.core.orientation));
        let yaw = delta.y.clamp(-turn_rate, turn_rate);
        let pitch = delta.x.clamp(-turn_rate, turn_rate);
        self.core.orientation *= DMat3::from_rotation_y(yaw.to_radians());
        self.core.orientation *= DMat3::from_rotation_x(pitch.to_radians());
        self.core.motion = self.core.orientation * DVec3::new(0.0, 0.0, self.core.velocity());
        self.target_distance = target.distance(self.core.position);
    }

    /// First actor along the path that isn't the controller.
    fn check_actor_hits(&mut self, ctx: &mut TickContext<'_>, damage: &Damage) -> bool {
        let struck = ctx
            .world
            .actors_along(self.core.position, self.core.motion)
            .into_iter()
            .find(|actor| Some(*actor) != self.controller);
        let Some(actor) = struck else {
            return false;
        };
        if let Some(view) = ctx.world.actor(actor) {
            self.core.position = view.position;
        }
        self.last_hit = HitType::Entity;
        if !ctx.is_client() {
            ctx.world.attack_actor(actor, damage);
        }
        self.debug_message(ctx, "HIT ENTITY");
        self.explode(ctx);
        true
    }

    /// Multipart boxes along the path, nearest first. Multiparts carrying the launcher are skipped.
    fn boxes_along_path(
        &self,
        ctx: &TickContext<'_>,
        handle: EntityHandle,
        end: DVec3,
    ) -> Vec<BoxHit> {
        let segment = BoundingBox::around_segment(self.core.position, end);
        let Some(body) = ctx.registry.get(handle).and_then(|entity| entity.as_multipart()) else {
            return Vec::new();
        };
        if body.contains_launcher(self.launcher) || !body.encompassing_box.intersects(&segment) {
            return Vec::new();
        }
        let mut hits: Vec<BoxHit> = body
            .projectile_boxes()
            .filter_map(|(hit_box, bounding_box)| {
                let point = bounding_box.intersection_point(self.core.position, end)?;
                Some(BoxHit {
                    distance: point.distance(self.core.position),
                    hit_box,
                    bounding_box: *bounding_box,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn check_multipart_hits(&mut self, ctx: &mut TickContext<'_>, damage: &Damage) -> bool {
        let end = self.core.position + self.core.motion;
        for handle in ctx.registry.multipart_candidates() {
            for hit in self.boxes_along_path(ctx, handle, end) {
                if self.resolve_box_hit(ctx, handle, hit, damage) {
                    return true;
                }
            }
        }
        false
    }

    /// Applies one box hit. Returns true when it ended the flight.
    fn resolve_box_hit(
        &mut self,
        ctx: &mut TickContext<'_>,
        handle: EntityHandle,
        hit: BoxHit,
        damage: &Damage,
    ) -> bool {
        let server = !ctx.is_client();
        let bounding_box = hit.bounding_box;

        if let Some(group) = bounding_box.group.filter(|group| group.health != 0.0) {
            if server {
                self.damage_collision_group(ctx, handle, group, damage.amount);
            }
        }

        let armor = effective_armor(&bounding_box, self.definition.is_heat);
        if armor > 0.0 {
            let ratio = velocity_ratio(self.core.velocity(), self.initial_velocity);
            let potential = penetration_potential(&self.definition, ratio);
            let stopped = self.armor.absorb(armor, potential);
            self.debug_message(ctx, &format!("HIT ARMOR OF: {}", armor as i64));
            if stopped {
                self.core.position = bounding_box.global_center;
                self.last_hit = HitType::Armor;
                self.debug_message(
                    ctx,
                    &format!("HIT TOO MUCH ARMOR. MAX PEN: {}", potential as i64),
                );
                self.explode(ctx);
                return true;
            }
            return false;
        }

        let damage = damage.with_box(hit.hit_box);
        if let Some(group) = bounding_box.group {
            if group.health == 0.0 {
                self.core.position = bounding_box.global_center;
                self.last_hit = HitType::Entity;
                if server {
                    if let Some(body) = ctx.registry.get_mut(handle).and_then(|e| e.as_multipart_mut()) {
                        body.attack(damage.amount);
                    }
                }
                self.debug_message(
                    ctx,
                    &format!("HIT ENTITY CORE BOX FOR DAMAGE: {}", damage.amount as i64),
                );
                self.explode(ctx);
                return true;
            }
            return false;
        }

        let Some(slot) = hit.hit_box.part_slot() else {
            return false;
        };
        let Some(body) = ctx.registry.get(handle).and_then(|entity| entity.as_multipart()) else {
            return false;
        };
        let Some(part) = body.part(slot) else {
            // Destroyed by an earlier box this tick.
            return false;
        };
        let part_position = part.position;
        let forwards = part.definition.forwards_damage || part.is_engine();

        if server {
            if let Some(body) = ctx.registry.get_mut(handle).and_then(|e| e.as_multipart_mut()) {
                if body.attack_part(slot, damage.amount) == PartDamage::Destroyed {
                    info!(entity_handle = ?handle, slot, "part destroyed by projectile");
                }
            }
        }
        self.debug_message(ctx, &format!("HIT PART FOR DAMAGE: {}", damage.amount as i64));
        if !forwards {
            return false;
        }

        self.core.position = part_position;
        self.last_hit = HitType::Part;
        if server {
            if let Some(body) = ctx.registry.get_mut(handle).and_then(|e| e.as_multipart_mut()) {
                body.attack(damage.amount);
            }
        }
        self.debug_message(ctx, "FORWARDING DAMAGE TO VEHICLE");
        self.explode(ctx);
        true
    }

    fn damage_collision_group(
        &self,
        ctx: &mut TickContext<'_>,
        handle: EntityHandle,
        group: CollisionGroupRef,
        amount: f64,
    ) {
        let Some(entity) = ctx.registry.get_mut(handle) else {
            return;
        };
        let Some(current) = entity
            .as_multipart_mut()
            .and_then(|body| body.damage_collision_box(group, amount))
        else {
            return;
        };
        let variable = format!("collision_{}_damage", group.index + 1);
        entity.core_mut().set_variable(&variable, current);
        let uuid = entity.uuid();
        ctx.registry
            .outbox_mut()
            .send_to_all_clients(SyncMessage::VariableSet {
                entity: uuid,
                variable,
                value: current,
            });
        self.debug_message(
            ctx,
            &format!(
                "HIT HEALTH BOX. ATTACKED FOR: {amount}. BOX CURRENT DAMAGE: {current} OF {}",
                group.health
            ),
        );
    }

    fn check_block_hit(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let Some(hit) = ctx.world.block_hit(self.core.position, self.core.motion) else {
            return false;
        };
        if !ctx.is_client() {
            let hardness = ctx.world.block_hardness(hit.block);
            let roll: f32 = ctx.rng.gen_range(0.0..1.0);
            let strength = roll * 0.3 + 0.3 * self.definition.diameter as f32 / 20.0;
            if ctx.tuning.world.block_breakage && hardness > 0.0 && hardness <= strength {
                ctx.world.destroy_block(hit.block);
            } else if self.definition.is_incendiary {
                ctx.world.set_on_fire(&hit);
            } else {
                ctx.registry
                    .outbox_mut()
                    .send_to_all_clients(SyncMessage::BulletHitBlock { position: hit.block });
            }
        }
        self.core.position = hit.block;
        self.last_hit = HitType::Block;
        self.debug_message(ctx, "HIT BLOCK");
        self.explode(ctx);
        true
    }

    fn check_proximity_fuze(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let fuze = self.definition.proximity_fuze;
        if fuze == 0.0 {
            return false;
        }
        let velocity = self.core.velocity();
        let target = match self.target_position {
            Some(target) => Some(target),
            None => {
                let reach = self.core.motion.normalize_or_zero() * (fuze + velocity);
                ctx.world
                    .block_hit(self.core.position, reach)
                    .map(|hit| hit.block)
            }
        };
        let Some(target) = target else {
            return false;
        };
        let distance = self.core.position.distance(target);
        if distance >= fuze + velocity {
            return false;
        }
        if distance > fuze {
            self.core.position = self.core.position.lerp(target, (distance - fuze) / fuze);
        }
        if self.entity_target.is_some() {
            self.last_hit = HitType::Entity;
            self.debug_message(ctx, "PROX FUZE HIT ENTITY");
        } else {
            self.last_hit = HitType::Block;
            self.debug_message(ctx, "PROX FUZE HIT BLOCK");
        }
        self.explode(ctx);
        true
    }
}

impl Entity for Projectile {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "projectile"
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
            Capability::Renderable | Capability::Definable | Capability::Projectile
        )
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.core.snapshot_previous();
        if self.despawn_timer >= 0 {
            if self.despawn_timer == 0 {
                self.core.valid = false;
            }
            self.despawn_timer -= 1;
            return;
        }

        if !self.apply_propulsion(ctx) {
            return;
        }
        self.apply_guidance(ctx);

        let damage = self.damage(ctx);
        if self.check_actor_hits(ctx, &damage)
            || self.check_multipart_hits(ctx, &damage)
            || self.check_block_hit(ctx)
            || self.check_proximity_fuze(ctx)
        {
            return;
        }

        if self.definition.fuze_time != 0 && self.core.ticks_existed > self.definition.fuze_time {
            self.last_hit = HitType::Burst;
            self.debug_message(ctx, "BURST");
            self.explode(ctx);
            return;
        }

        self.core.position += self.core.motion;
        if self.is_burning() && self.core.motion != DVec3::ZERO {
            self.core.orientation = facing(self.core.motion);
        }
    }

    fn post_update(&mut self, _ctx: &mut TickContext<'_>) {
        self.core.bounding_box.global_center = self.core.position;
        let burn_left = self
            .definition
            .burn_time
            .saturating_sub(self.core.ticks_existed);
        let hit = self.last_hit;
        self.core
            .set_variable("rocket_hit", if hit == HitType::None { 0.0 } else { 1.0 });
        self.core.set_variable("rocket_burntime", burn_left as f64);
        for kind in [
            HitType::Block,
            HitType::Entity,
            HitType::Part,
            HitType::Armor,
            HitType::Burst,
        ] {
            if let Some(variable) = kind.variable() {
                self.core
                    .set_variable(variable, if hit == kind { 1.0 } else { 0.0 });
            }
        }
    }

    fn should_sync(&self) -> bool {
        false
    }

    fn bullet_key(&self) -> Option<(EntityId, u32)> {
        Some((self.launcher, self.bullet_number))
    }
}
