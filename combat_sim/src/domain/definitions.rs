// Domain definitions: validated numeric/structural descriptions of spawnable items.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a pack item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    #[serde(rename = "packID")]
    pub pack_id: String,
    #[serde(rename = "systemName")]
    pub system_name: String,
}

impl ItemKey {
    pub fn new(pack_id: impl Into<String>, system_name: impl Into<String>) -> Self {
        Self {
            pack_id: pack_id.into(),
            system_name: system_name.into(),
        }
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pack_id, self.system_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuidanceSystem {
    #[default]
    Dummy,
    Gps,
    Heat,
    Laser,
}

/// Rocket or shell fired by a launcher.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileDefinition {
    pub is_incendiary: bool,
    pub guidance_system: GuidanceSystem,
    /// Heat warheads ignore velocity when penetrating armor.
    pub is_heat: bool,
    /// Rounds added to a launcher per reload.
    pub quantity: u32,
    /// Caliber in mm.
    pub diameter: f64,
    /// Round length in mm.
    pub length: f64,
    pub damage: f64,
    /// Linear deceleration applied each tick after burnout.
    pub slowdown_speed: f64,
    pub burn_time: u64,
    pub acceleration_time: u64,
    pub acceleration_delay: u64,
    /// Speed reached at the end of the acceleration window, m/s.
    pub max_velocity: f64,
    /// 0 falls back to `diameter / 10`.
    pub blast_strength: f64,
    pub armor_penetration: f64,
    pub proximity_fuze: f64,
    /// Ticks before a forced burst; 0 disables.
    pub fuze_time: u64,
    pub impact_despawn_time: u64,
    /// Max degrees per tick the guidance may turn on each axis; 0 means unguided.
    pub turn_rate: f64,
}

/// Single barrel exit point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Muzzle {
    pub pos: DVec3,
    /// Extra barrel rotation in (pitch, yaw, roll) degrees.
    pub rot: Option<DVec3>,
    /// Pivot for muzzles that pitch around a point other than the launcher origin.
    pub center: Option<DVec3>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MuzzleGroup {
    pub muzzles: Vec<Muzzle>,
}

/// Launcher part definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherDefinition {
    pub min_yaw: f64,
    pub max_yaw: f64,
    pub default_yaw: f64,
    pub yaw_speed: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
    pub default_pitch: f64,
    pub pitch_speed: f64,
    /// Muzzle velocity, m/s.
    pub exit_velocity: f64,
    /// Downward speed added each tick to projectiles after burnout.
    pub gravitational_velocity: f64,
    pub fire_delay: u32,
    pub windup_time: u32,
    pub is_semi_auto: bool,
    /// Only the seat's selected launcher of this type fires.
    pub fire_solo: bool,
    pub auto_reload: bool,
    pub reset_position: bool,
    pub disable_muzzle_orientation: bool,
    /// Rounds the launcher holds.
    pub capacity: u32,
    pub reload_time: u32,
    /// Accepted caliber in mm.
    pub diameter: f64,
    pub min_length: f64,
    pub max_length: f64,
    pub muzzle_groups: Vec<MuzzleGroup>,
}

/// Geometry plus armor for one box in a definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxDefinition {
    pub pos: DVec3,
    /// Full width on X and Z.
    pub width: f64,
    pub height: f64,
    pub armor_thickness: f64,
    pub heat_armor_thickness: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionGroupDefinition {
    /// 0 marks the core group that forwards hits to the owner.
    pub health: f64,
    pub boxes: Vec<BoxDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKindDefinition {
    #[default]
    Generic,
    Engine,
    Seat,
    /// Ammunition storage; `feeds_vehicles` lets mounted launchers pull from it.
    Crate { feeds_vehicles: bool },
    Launcher,
}

/// Part that can be installed in a slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartDefinition {
    /// 0 makes the part indestructible.
    pub health: f64,
    /// Hits on this part also hit the multipart it is installed on.
    pub forwards_damage: bool,
    pub boxes: Vec<BoxDefinition>,
    pub kind: PartKindDefinition,
    /// Present for launcher parts.
    pub launcher: Option<LauncherDefinition>,
}

/// Mount limits imposed by a slot on the launcher installed in it. Zero means "no limit".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountLimits {
    pub min_yaw: f64,
    pub max_yaw: f64,
    pub default_yaw: f64,
    pub yaw_speed: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
    pub default_pitch: f64,
    pub pitch_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartSlotDefinition {
    pub pos: DVec3,
    pub rot: DVec3,
    /// Size of the placeholder box shown while the slot is empty.
    pub slot_width: f64,
    pub slot_height: f64,
    /// Seat slots whose riders control a launcher in this slot.
    pub linked_seats: Vec<usize>,
    /// Launcher slots whose controller also drives a launcher in this slot.
    pub coaxial_slots: Vec<usize>,
    pub limits: MountLimits,
    pub default_part: Option<ItemKey>,
}

/// Vehicle (or placed-part) body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipartDefinition {
    /// Damage at which the multipart is wrecked.
    pub health: f64,
    pub collision_groups: Vec<CollisionGroupDefinition>,
    /// Boxes only projectiles collide with.
    pub bullet_collision_boxes: Vec<BoxDefinition>,
    pub part_slots: Vec<PartSlotDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PackItem {
    Vehicle(Arc<MultipartDefinition>),
    Part(Arc<PartDefinition>),
    Projectile(Arc<ProjectileDefinition>),
}

/// On-disk pack shape. Each definition is tagged by its item type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackFile {
    pub items: Vec<PackFileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackFileEntry {
    #[serde(flatten)]
    pub key: ItemKey,
    pub definition: PackFileDefinition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackFileDefinition {
    Vehicle(MultipartDefinition),
    Part(PartDefinition),
    Projectile(ProjectileDefinition),
}

/// Lookup table from item key to definition.
#[derive(Debug, Clone, Default)]
pub struct PackRegistry {
    items: HashMap<ItemKey, PackItem>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: ItemKey, item: PackItem) {
        self.items.insert(key, item);
    }

    pub fn with_vehicle(mut self, key: ItemKey, definition: MultipartDefinition) -> Self {
        self.register(key, PackItem::Vehicle(Arc::new(definition)));
        self
    }

    pub fn with_part(mut self, key: ItemKey, definition: PartDefinition) -> Self {
        self.register(key, PackItem::Part(Arc::new(definition)));
        self
    }

    pub fn with_projectile(mut self, key: ItemKey, definition: ProjectileDefinition) -> Self {
        self.register(key, PackItem::Projectile(Arc::new(definition)));
        self
    }

    pub fn get(&self, key: &ItemKey) -> Option<&PackItem> {
        self.items.get(key)
    }

    pub fn vehicle(&self, key: &ItemKey) -> Option<Arc<MultipartDefinition>> {
        match self.items.get(key) {
            Some(PackItem::Vehicle(definition)) => Some(definition.clone()),
            _ => None,
        }
    }

    pub fn part(&self, key: &ItemKey) -> Option<Arc<PartDefinition>> {
        match self.items.get(key) {
            Some(PackItem::Part(definition)) => Some(definition.clone()),
            _ => None,
        }
    }

    pub fn projectile(&self, key: &ItemKey) -> Option<Arc<ProjectileDefinition>> {
        match self.items.get(key) {
            Some(PackItem::Projectile(definition)) => Some(definition.clone()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<PackFile> for PackRegistry {
    fn from(file: PackFile) -> Self {
        let mut registry = PackRegistry::new();
        for entry in file.items {
            let item = match entry.definition {
                PackFileDefinition::Vehicle(definition) => PackItem::Vehicle(Arc::new(definition)),
                PackFileDefinition::Part(definition) => PackItem::Part(Arc::new(definition)),
                PackFileDefinition::Projectile(definition) => {
                    PackItem::Projectile(Arc::new(definition))
                }
            };
            registry.register(entry.key, item);
        }
        registry
    }
}
