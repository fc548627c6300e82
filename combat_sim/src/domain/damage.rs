// Domain damage model: damage events, hit classification and armor accounting.

use crate::domain::definitions::{ItemKey, ProjectileDefinition};
use crate::domain::entity::EntityId;
use crate::domain::geometry::BoundingBox;
use crate::domain::multipart::HitBoxRef;
use crate::domain::ports::ActorId;

/// Attribution used for kill/death messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageCause {
    /// Fired by a player-controlled launcher.
    BulletPlayer,
    /// Fired without a player behind it.
    BulletNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Damage {
    pub amount: f64,
    /// Sub-box that was struck, when the target is a multipart.
    pub hit_box: Option<HitBoxRef>,
    /// Launcher that fired the projectile.
    pub source: Option<EntityId>,
    /// Controller at the time the projectile was fired.
    pub controller: Option<ActorId>,
    pub cause: DamageCause,
    pub projectile: Option<ItemKey>,
}

impl Damage {
    pub fn with_box(&self, hit_box: HitBoxRef) -> Self {
        Self {
            hit_box: Some(hit_box),
            ..self.clone()
        }
    }
}

/// How a projectile's flight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitType {
    #[default]
    None,
    Entity,
    Part,
    Armor,
    Block,
    Burst,
}

impl HitType {
    /// Animation variable raised when a projectile ends this way.
    pub fn variable(self) -> Option<&'static str> {
        match self {
            HitType::None => None,
            HitType::Entity => Some("rocket_hit_entity"),
            HitType::Part => Some("rocket_hit_part"),
            HitType::Armor => Some("rocket_hit_armor"),
            HitType::Block => Some("rocket_hit_block"),
            HitType::Burst => Some("rocket_hit_burst"),
        }
    }
}

/// Current speed over launch speed; 1 when the projectile left the launcher at rest.
pub fn velocity_ratio(velocity: f64, initial_velocity: f64) -> f64 {
    if initial_velocity > 0.0 {
        velocity / initial_velocity
    } else {
        1.0
    }
}

/// Damage scales linearly with the remaining share of launch speed.
pub fn projectile_damage(definition: &ProjectileDefinition, ratio: f64, damage_factor: f64) -> f64 {
    ratio * definition.damage * damage_factor
}

/// Armor the box presents to this warhead.
pub fn effective_armor(bounding_box: &BoundingBox, is_heat: bool) -> f64 {
    if is_heat && bounding_box.heat_armor_thickness != 0.0 {
        bounding_box.heat_armor_thickness
    } else {
        bounding_box.armor_thickness
    }
}

/// Heat warheads keep full penetration; kinetic ones lose it with speed.
pub fn penetration_potential(definition: &ProjectileDefinition, ratio: f64) -> f64 {
    if definition.is_heat {
        definition.armor_penetration
    } else {
        definition.armor_penetration * ratio
    }
}

/// Running total of armor a projectile has pushed through. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmorLedger {
    penetrated: f64,
}

impl ArmorLedger {
    pub fn penetrated(&self) -> f64 {
        self.penetrated
    }

    /// Adds a plate; returns true once the stack exceeds `potential`.
    pub fn absorb(&mut self, thickness: f64, potential: f64) -> bool {
        if thickness > 0.0 {
            self.penetrated += thickness;
        }
        self.penetrated > potential
    }
}
