// Shared pack fixtures and world builders for integration tests.
#![allow(dead_code)]

use combat_sim::domain::definitions::{
    BoxDefinition, CollisionGroupDefinition, ItemKey, LauncherDefinition, MultipartDefinition,
    PackRegistry, PartDefinition, PartKindDefinition, PartSlotDefinition, ProjectileDefinition,
};
use combat_sim::domain::entity::{EntityId, Side};
use combat_sim::domain::tuning::SimTuning;
use combat_sim::interface_adapters::headless::{FlatWorld, WorldLog};
use combat_sim::use_cases::SimWorld;
use glam::DVec3;
use std::sync::{Arc, Mutex};

// Every fixture item lives in the same pack.
pub fn key(name: &str) -> ItemKey {
    ItemKey::new("test", name)
}

// A 70 mm rocket: 10 rounds per reload, 40 damage and 25 mm of penetration.
pub fn rocket() -> ProjectileDefinition {
    ProjectileDefinition {
        quantity: 10,
        diameter: 70.0,
        length: 100.0,
        damage: 40.0,
        armor_penetration: 25.0,
        ..Default::default()
    }
}

// Launcher firing 70 mm rounds at 1 block per tick with default tuning.
pub fn pod_launcher(fire_delay: u32) -> LauncherDefinition {
    LauncherDefinition {
        exit_velocity: 200.0,
        fire_delay,
        capacity: 10,
        diameter: 70.0,
        max_length: 1000.0,
        ..Default::default()
    }
}

pub fn pod_part(launcher: LauncherDefinition) -> PartDefinition {
    PartDefinition {
        kind: PartKindDefinition::Launcher,
        launcher: Some(launcher),
        ..Default::default()
    }
}

pub fn seat_part() -> PartDefinition {
    PartDefinition {
        kind: PartKindDefinition::Seat,
        ..Default::default()
    }
}

pub fn crate_part() -> PartDefinition {
    PartDefinition {
        kind: PartKindDefinition::Crate {
            feeds_vehicles: true,
        },
        ..Default::default()
    }
}

// Core hull box: 2 x 2 x 2 centered one block above the vehicle origin.
pub fn hull() -> CollisionGroupDefinition {
    CollisionGroupDefinition {
        health: 0.0,
        boxes: vec![BoxDefinition {
            pos: DVec3::new(0.0, 1.0, 0.0),
            width: 2.0,
            height: 2.0,
            ..Default::default()
        }],
    }
}

// Slot 0 is a seat; slots 1..=launchers hold pods linked to it.
pub fn gunship(launchers: usize) -> MultipartDefinition {
    let mut part_slots = vec![PartSlotDefinition {
        pos: DVec3::new(0.0, 1.0, -1.0),
        default_part: Some(key("seat")),
        ..Default::default()
    }];
    for index in 0..launchers {
        part_slots.push(PartSlotDefinition {
            pos: DVec3::new(index as f64 - 1.0, 2.0, 0.0),
            linked_seats: vec![0],
            default_part: Some(key("pod")),
            ..Default::default()
        });
    }
    MultipartDefinition {
        health: 100.0,
        collision_groups: vec![hull()],
        part_slots,
        ..Default::default()
    }
}

// Pack with the gunship, its parts and the rocket.
pub fn pack_with(launchers: usize, launcher: LauncherDefinition) -> PackRegistry {
    PackRegistry::new()
        .with_vehicle(key("gunship"), gunship(launchers))
        .with_part(key("pod"), pod_part(launcher))
        .with_part(key("seat"), seat_part())
        .with_part(key("crate"), crate_part())
        .with_projectile(key("rocket"), rocket())
}

pub fn server_world(pack: PackRegistry) -> (SimWorld<FlatWorld>, Arc<Mutex<WorldLog>>) {
    world_on(Side::Server, pack)
}

pub fn world_on(side: Side, pack: PackRegistry) -> (SimWorld<FlatWorld>, Arc<Mutex<WorldLog>>) {
    let platform = FlatWorld::new();
    // Grab the log before the world takes ownership of the platform.
    let log = platform.log();
    let world = SimWorld::new(side, platform, Arc::new(pack), SimTuning::default(), 42);
    (world, log)
}

// UUID of the launcher installed in `slot` of `vehicle`.
pub fn launcher_in_slot(world: &SimWorld<FlatWorld>, vehicle: EntityId, slot: usize) -> EntityId {
    world
        .registry()
        .multipart(vehicle)
        .and_then(|body| body.part(slot))
        .and_then(|part| part.launcher())
        .expect("slot should hold a launcher")
}
