mod support;

use combat_sim::domain::multipart::HitBoxRef;
use combat_sim::domain::{Entity, Vehicle};
use glam::{DMat3, DVec3};

#[test]
fn test_nearest_multipart_box_wins() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let far = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 0.0, 10.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let near = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 0.0, 5.0), DMat3::IDENTITY)
        .expect("gunship should spawn");

    let hit = world
        .registry()
        .multipart_intersect(DVec3::new(0.0, 1.0, 0.0), DVec3::new(0.0, 1.0, 20.0))
        .expect("both hulls are in the way");

    assert_ne!(hit.entity, far);
    assert_eq!(hit.entity, near);
    assert_eq!(hit.hit_box, HitBoxRef::Body(0));
    assert_eq!(hit.part_slot, None);
    assert_eq!(hit.point, DVec3::new(0.0, 1.0, 4.0));
}

#[test]
fn test_segment_that_misses_every_box_finds_nothing() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 0.0, 5.0), DMat3::IDENTITY)
        .expect("gunship should spawn");

    let hit = world
        .registry()
        .multipart_intersect(DVec3::new(5.0, 1.0, 0.0), DVec3::new(5.0, 1.0, 20.0));
    assert!(hit.is_none());
}

#[test]
fn test_towed_vehicle_moves_with_its_tower_once_per_tick() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let tower = world
        .spawn_vehicle(support::key("gunship"), DVec3::ZERO, DMat3::IDENTITY)
        .expect("gunship should spawn");
    let trailer = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 0.0, -5.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    assert!(world.connect_tow(tower, trailer));
    assert!(!world.connect_tow(tower, tower));
    if let Some(front) = world.registry_mut().entity_as_mut::<Vehicle>(tower) {
        front.core_mut().motion = DVec3::new(1.0, 0.0, 0.0);
    }

    world.tick();
    world.tick();

    let position = |id| {
        world
            .registry()
            .entity_as::<Vehicle>(id)
            .map(|vehicle| vehicle.core().position)
    };
    assert_eq!(position(tower), Some(DVec3::new(2.0, 0.0, 0.0)));
    assert_eq!(position(trailer), Some(DVec3::new(2.0, 0.0, -5.0)));
}

#[test]
fn test_trailer_stops_when_its_tower_is_removed() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let tower = world
        .spawn_vehicle(support::key("gunship"), DVec3::ZERO, DMat3::IDENTITY)
        .expect("gunship should spawn");
    let trailer = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 0.0, -5.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    world.connect_tow(tower, trailer);
    world.registry_mut().remove_by_uuid(tower);

    world.tick();
    let trailer = world
        .registry()
        .entity_as::<Vehicle>(trailer)
        .expect("trailer should remain");
    assert_eq!(trailer.core().ticks_existed, 1);
    assert_eq!(trailer.towed_by(), None);
    assert_eq!(trailer.core().position, DVec3::new(0.0, 0.0, -5.0));
}

#[test]
fn test_vehicle_outside_loaded_chunks_is_frozen() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    world.platform_mut().loaded_radius = Some(50.0);
    let parked = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(100.0, 0.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    if let Some(vehicle) = world.registry_mut().entity_as_mut::<Vehicle>(parked) {
        vehicle.core_mut().motion = DVec3::new(1.0, 0.0, 0.0);
    }

    world.tick();

    let vehicle = world
        .registry()
        .entity_as::<Vehicle>(parked)
        .expect("vehicle should remain");
    assert_eq!(vehicle.core().position, DVec3::new(100.0, 0.0, 0.0));
    assert_eq!(vehicle.core().ticks_existed, 0);
}

#[test]
fn test_snapshots_cover_every_renderable_entity() {
    let (mut world, _log) = support::server_world(support::pack_with(2, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::ZERO, DMat3::IDENTITY)
        .expect("gunship should spawn");
    world.tick();

    let snapshots = world.snapshots();
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots.iter().filter(|s| s.kind == "launcher").count(), 2);
    let hull = snapshots
        .iter()
        .find(|s| s.id == vehicle)
        .expect("vehicle snapshot");
    assert_eq!(hull.kind, "vehicle");
}
