mod support;

use combat_sim::domain::definitions::PackRegistry;
use combat_sim::domain::{Entity, EntityId, Launcher, PlacedPart, Vehicle};
use combat_sim::interface_adapters::headless::FlatWorld;
use combat_sim::use_cases::SimWorld;
use glam::{DMat3, DVec3};

// Gunships in a row, each with its first pod loaded, plus one emplaced pod when `emplaced` is set.
fn populated_world(gunships: usize, emplaced: bool) -> (SimWorld<FlatWorld>, Vec<EntityId>) {
    let (mut world, _log) = support::server_world(support::pack_with(2, support::pod_launcher(10)));
    let mut ids = Vec::new();
    for index in 0..gunships {
        let position = DVec3::new(index as f64 * 10.0, 2.0, 0.0);
        let vehicle = world
            .spawn_vehicle(support::key("gunship"), position, DMat3::IDENTITY)
            .expect("gunship should spawn");
        let pod = support::launcher_in_slot(&world, vehicle, 1);
        assert!(world.load_ammo(pod, support::key("rocket")));
        ids.push(vehicle);
    }
    if emplaced {
        let placed = world
            .place_part(support::key("pod"), DVec3::new(0.0, 0.0, 30.0), DMat3::IDENTITY)
            .expect("pod should place");
        ids.push(placed);
    }
    world.tick();
    (world, ids)
}

fn fresh_world(pack: PackRegistry) -> SimWorld<FlatWorld> {
    support::server_world(pack).0
}

#[test]
fn test_empty_world_round_trips() {
    let (world, _) = populated_world(0, false);
    let saved = world.save();
    assert_eq!(saved["entityCount"], 0);

    let mut restored = fresh_world(support::pack_with(2, support::pod_launcher(10)));
    assert_eq!(restored.load(Some(&saved)), 0);
    assert!(restored.registry().is_empty());
}

#[test]
fn test_single_vehicle_round_trips_with_its_launchers() {
    let (world, ids) = populated_world(1, false);
    let saved = world.save();
    assert_eq!(saved["entityCount"], 1);

    let mut restored = fresh_world(support::pack_with(2, support::pod_launcher(10)));
    assert_eq!(restored.load(Some(&saved)), 1);

    let vehicle = restored
        .registry()
        .entity_as::<Vehicle>(ids[0])
        .expect("vehicle should keep its uuid");
    assert_eq!(vehicle.core().position, DVec3::new(0.0, 2.0, 0.0));

    for slot in [1, 2] {
        let original = support::launcher_in_slot(&world, ids[0], slot);
        let copy = support::launcher_in_slot(&restored, ids[0], slot);
        assert_eq!(original, copy);
    }
    let pod = restored
        .registry()
        .entity_as::<Launcher>(support::launcher_in_slot(&restored, ids[0], 1))
        .expect("launcher should be registered");
    assert_eq!(pod.rounds_left(), 10);
    assert_eq!(pod.loaded(), Some(&support::key("rocket")));

    assert_eq!(restored.save(), saved);
}

#[test]
fn test_vehicles_and_placed_parts_round_trip_together() {
    let (world, ids) = populated_world(2, true);
    let saved = world.save();
    assert_eq!(saved["entityCount"], 3);
    assert_eq!(saved["entity2"]["isPlacedPart"], true);

    let mut restored = fresh_world(support::pack_with(2, support::pod_launcher(10)));
    assert_eq!(restored.load(Some(&saved)), 3);
    assert!(restored.registry().entity_as::<Vehicle>(ids[0]).is_some());
    assert!(restored.registry().entity_as::<Vehicle>(ids[1]).is_some());
    assert!(restored.registry().entity_as::<PlacedPart>(ids[2]).is_some());
    // Two pods per gunship plus the emplaced one.
    assert_eq!(restored.registry().iter_of_type::<Launcher>().count(), 5);

    assert_eq!(restored.save(), saved);
}

#[test]
fn test_vehicle_from_a_removed_pack_item_is_skipped() {
    let (world, _) = populated_world(2, false);
    let saved = world.save();

    let mut restored = fresh_world(PackRegistry::new());
    assert_eq!(restored.load(Some(&saved)), 0);
    assert!(restored.registry().is_empty());
}

#[test]
fn test_rounds_of_a_removed_projectile_item_are_dropped() {
    let (world, ids) = populated_world(1, false);
    let saved = world.save();

    let without_rockets = PackRegistry::new()
        .with_vehicle(support::key("gunship"), support::gunship(2))
        .with_part(support::key("pod"), support::pod_part(support::pod_launcher(10)))
        .with_part(support::key("seat"), support::seat_part());
    let mut restored = fresh_world(without_rockets);
    assert_eq!(restored.load(Some(&saved)), 1);

    let pod = restored
        .registry()
        .entity_as::<Launcher>(support::launcher_in_slot(&restored, ids[0], 1))
        .expect("launcher should be registered");
    assert_eq!(pod.rounds_left(), 0);
    assert!(pod.loaded().is_none());
}

#[test]
fn test_closing_a_world_saves_then_empties_it() {
    let (mut world, _) = populated_world(1, true);
    let saved = world.close();
    assert_eq!(saved["entityCount"], 2);
    assert!(world.registry().is_empty());
}
