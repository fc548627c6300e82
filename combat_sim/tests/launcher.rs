mod support;

use combat_sim::domain::definitions::{
    GuidanceSystem, LauncherDefinition, MultipartDefinition, PackRegistry, PartSlotDefinition,
    ProjectileDefinition,
};
use combat_sim::domain::geometry::facing;
use combat_sim::domain::inventory::Inventory;
use combat_sim::domain::multipart::{PartData, PartKind, VehicleData};
use combat_sim::domain::{ActorId, Entity, EntityId, Launcher, LauncherState, SyncMessage, Vehicle};
use combat_sim::interface_adapters::headless::{FlatWorld, HeadlessActor};
use combat_sim::use_cases::SimWorld;
use glam::{DMat3, DVec3};

fn launcher(world: &SimWorld<FlatWorld>, id: EntityId) -> &Launcher {
    world
        .registry()
        .entity_as::<Launcher>(id)
        .expect("launcher should be registered")
}

// Pod that can traverse 90 degrees each way at 10 degrees per tick.
fn turret(fire_delay: u32) -> LauncherDefinition {
    LauncherDefinition {
        min_yaw: -90.0,
        max_yaw: 90.0,
        yaw_speed: 10.0,
        min_pitch: -45.0,
        max_pitch: 45.0,
        pitch_speed: 10.0,
        ..support::pod_launcher(fire_delay)
    }
}

// Player holding `item` with `rounds` of rocket ammunition in their inventory.
fn armed_player(world: &mut SimWorld<FlatWorld>, ammo: &str, rounds: u32) -> (ActorId, EntityId) {
    let holder = world.platform_mut().add_player(DVec3::ZERO);
    if let Some(actor) = world.platform_mut().actor_mut(holder) {
        actor.inventory = Inventory::default().with_stack(support::key(ammo), rounds);
    }
    let pod = world
        .equip_hand_held(holder, support::key("pod"))
        .expect("pod is a launcher part");
    (holder, pod)
}

fn crate_rockets(world: &SimWorld<FlatWorld>, vehicle: EntityId, slot: usize) -> u32 {
    let part = world
        .registry()
        .multipart(vehicle)
        .and_then(|body| body.part(slot))
        .expect("crate should be installed");
    match &part.kind {
        PartKind::Crate { inventory, .. } => inventory.count_of(&support::key("rocket")),
        other => panic!("slot {slot} holds {other:?}, not a crate"),
    }
}

#[test]
fn test_group_fires_in_staggered_turns() {
    let (mut world, _log) = support::server_world(support::pack_with(3, support::pod_launcher(30)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pilot = world.platform_mut().add_player(DVec3::new(0.0, 5.0, -10.0));
    assert!(world.set_seat_rider(vehicle, 0, Some(pilot)));
    assert!(world.select_launcher(vehicle, 0, Some(support::key("pod")), 0));

    let pods: Vec<_> = (1..=3)
        .map(|slot| support::launcher_in_slot(&world, vehicle, slot))
        .collect();
    for pod in &pods {
        assert!(world.load_ammo(*pod, support::key("rocket")));
    }
    // Reload completes on the first tick.
    world.tick();
    for pod in &pods {
        assert_eq!(launcher(&world, *pod).rounds_left(), 10);
        assert_eq!(launcher(&world, *pod).state(), LauncherState::Controlled);
    }

    assert_eq!(world.set_seat_trigger(vehicle, 0, true), 3);
    let mut first_shot = [None; 3];
    for tick in 1..=31 {
        world.tick();
        for (index, pod) in pods.iter().enumerate() {
            if first_shot[index].is_none() && launcher(&world, *pod).rounds_left() < 10 {
                first_shot[index] = Some(tick);
            }
        }
    }

    // fire_delay / group size = 10 ticks between launchers.
    assert_eq!(first_shot, [Some(11), Some(21), Some(31)]);
    for pod in &pods {
        assert_eq!(launcher(&world, *pod).rounds_left(), 9);
        let bullets = world.registry().bullets_of(*pod).expect("gun record");
        assert_eq!(bullets.len(), 1);
    }
}

#[test]
fn test_trigger_is_ignored_without_a_rider() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pod = support::launcher_in_slot(&world, vehicle, 1);
    assert!(world.load_ammo(pod, support::key("rocket")));
    assert!(world.set_trigger(pod, true));

    for _ in 0..5 {
        world.tick();
    }

    let pod = launcher(&world, pod);
    assert!(!pod.state().is_at_least(LauncherState::Controlled));
    assert_eq!(pod.controller(), None);
    assert_eq!(pod.rounds_left(), 10);
}

#[test]
fn test_mounted_launcher_reloads_from_feeding_crate() {
    let supply = LauncherDefinition {
        auto_reload: true,
        reload_time: 5,
        ..support::pod_launcher(10)
    };
    let truck = MultipartDefinition {
        health: 100.0,
        collision_groups: vec![support::hull()],
        part_slots: vec![PartSlotDefinition::default(), PartSlotDefinition::default()],
        ..Default::default()
    };
    let pack = support::pack_with(1, supply).with_vehicle(support::key("truck"), truck);
    let (mut world, _log) = support::server_world(pack);

    let rockets = Inventory::default().with_stack(support::key("rocket"), 2);
    let mut data = VehicleData::fresh(
        support::key("truck"),
        EntityId::new_v4(),
        DVec3::new(0.0, 1.0, 0.0),
        DMat3::IDENTITY,
    );
    data.parts = Some(vec![
        PartData {
            inventory: Some(rockets),
            ..PartData::fresh(0, support::key("crate"))
        },
        PartData::fresh(1, support::key("pod")),
    ]);
    let vehicle = world.spawn_vehicle_data(data).expect("truck should spawn");
    let pod = support::launcher_in_slot(&world, vehicle, 1);

    let messages = world.tick();
    assert!(messages.iter().any(|envelope| matches!(
        &envelope.message,
        SyncMessage::LauncherReload { launcher, item } if *launcher == pod && *item == support::key("rocket")
    )));
    assert_eq!(crate_rockets(&world, vehicle, 0), 1);

    for _ in 0..4 {
        world.tick();
    }
    assert_eq!(launcher(&world, pod).reloading(), Some(&support::key("rocket")));
    assert_eq!(launcher(&world, pod).rounds_left(), 0);

    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 10);
    assert_eq!(launcher(&world, pod).loaded(), Some(&support::key("rocket")));
    assert_eq!(launcher(&world, pod).reloading(), None);

    // Full magazine: the second rocket stays in the crate.
    world.tick();
    assert_eq!(crate_rockets(&world, vehicle, 0), 1);
}

#[test]
fn test_hand_held_launcher_reloads_from_holder_and_fires_along_look() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let holder = world.platform_mut().add_player(DVec3::ZERO);
    if let Some(actor) = world.platform_mut().actor_mut(holder) {
        actor.inventory = Inventory::default().with_stack(support::key("rocket"), 3);
    }
    let pod = world
        .equip_hand_held(holder, support::key("pod"))
        .expect("pod is a launcher part");

    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 10);
    assert_eq!(launcher(&world, pod).controller(), Some(holder));

    assert!(world.set_trigger(pod, true));
    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 9);

    let handle = world.registry().bullet(pod, 1).expect("first bullet");
    let bullet = world
        .registry()
        .get(handle)
        .expect("bullet should be registered");
    assert!(bullet.core().position.distance(DVec3::new(0.0, 1.62, 0.0)) < 1e-9);
    assert!(bullet.core().motion.distance(DVec3::new(0.0, 0.0, 1.0)) < 1e-9);

    let remaining = world
        .platform_mut()
        .actor_mut(holder)
        .map(|actor| actor.inventory.count_of(&support::key("rocket")));
    assert_eq!(remaining, Some(2));
}

#[test]
fn test_hand_held_launcher_is_removed_when_holder_leaves() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let holder = world.platform_mut().add_player(DVec3::ZERO);
    let pod = world
        .equip_hand_held(holder, support::key("pod"))
        .expect("pod is a launcher part");
    world.tick();
    assert!(world.registry().entity(pod).is_some());

    world.platform_mut().remove_actor(holder);
    world.tick();
    assert!(world.registry().entity(pod).is_none());
    // Projectiles already fired can still find their gun.
    assert!(world.registry().bullet_gun(pod).is_some());
}

#[test]
fn test_launchers_lose_control_when_vehicle_is_wrecked() {
    let (mut world, _log) = support::server_world(support::pack_with(2, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pilot = world.platform_mut().add_player(DVec3::new(0.0, 5.0, -10.0));
    world.set_seat_rider(vehicle, 0, Some(pilot));
    world.select_launcher(vehicle, 0, Some(support::key("pod")), 0);
    world.tick();
    let pod = support::launcher_in_slot(&world, vehicle, 1);
    assert_eq!(launcher(&world, pod).controller(), Some(pilot));

    let wrecked = world
        .registry_mut()
        .multipart_mut(vehicle)
        .map(|body| body.attack(100.0));
    assert_eq!(wrecked, Some(true));
    world.tick();

    assert_eq!(launcher(&world, pod).controller(), None);
    assert_eq!(launcher(&world, pod).state(), LauncherState::Active);
}

#[test]
fn test_launchers_are_removed_with_their_vehicle() {
    let (mut world, _log) = support::server_world(support::pack_with(2, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pods = [
        support::launcher_in_slot(&world, vehicle, 1),
        support::launcher_in_slot(&world, vehicle, 2),
    ];
    world.tick();

    world.registry_mut().remove_by_uuid(vehicle);
    world.tick();

    for pod in pods {
        assert!(world.registry().entity(pod).is_none());
    }
    assert!(world.registry().is_empty());
}

#[test]
fn test_inactive_launcher_ignores_its_rider() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pilot = world.platform_mut().add_player(DVec3::new(0.0, 5.0, -10.0));
    world.set_seat_rider(vehicle, 0, Some(pilot));
    world.select_launcher(vehicle, 0, Some(support::key("pod")), 0);
    let pod = support::launcher_in_slot(&world, vehicle, 1);
    assert!(world.set_launcher_active(pod, false));

    world.tick();

    assert_eq!(launcher(&world, pod).state(), LauncherState::Inactive);
    assert_eq!(launcher(&world, pod).controller(), None);
}

#[test]
fn test_ammo_of_another_caliber_is_refused() {
    let pack = support::pack_with(1, support::pod_launcher(5)).with_projectile(
        support::key("shell"),
        combat_sim::domain::definitions::ProjectileDefinition {
            diameter: 120.0,
            quantity: 1,
            ..support::rocket()
        },
    );
    let (mut world, _log) = support::server_world(pack);
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::ZERO, DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pod = support::launcher_in_slot(&world, vehicle, 1);

    assert!(!world.load_ammo(pod, support::key("shell")));
    assert!(!world.load_ammo(pod, support::key("seat")));
    assert!(world.load_ammo(pod, support::key("rocket")));
    // Already reloading.
    assert!(!world.load_ammo(pod, support::key("rocket")));
}

#[test]
fn test_unknown_launcher_part_is_not_equipped() {
    let (mut world, _log) = support::server_world(PackRegistry::new());
    let holder = world.platform_mut().add_player(DVec3::ZERO);
    assert!(world.equip_hand_held(holder, support::key("pod")).is_none());
}

#[test]
fn test_launcher_on_frozen_vehicle_holds_fire() {
    let (mut world, _log) = support::server_world(support::pack_with(1, support::pod_launcher(5)));
    let vehicle = world
        .spawn_vehicle(support::key("gunship"), DVec3::new(100.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("gunship should spawn");
    let pilot = world.platform_mut().add_player(DVec3::new(100.0, 5.0, -10.0));
    world.set_seat_rider(vehicle, 0, Some(pilot));
    world.select_launcher(vehicle, 0, Some(support::key("pod")), 0);
    let pod = support::launcher_in_slot(&world, vehicle, 1);
    assert!(world.load_ammo(pod, support::key("rocket")));
    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 10);

    world.platform_mut().loaded_radius = Some(50.0);
    assert_eq!(world.set_seat_trigger(vehicle, 0, true), 1);
    for _ in 0..10 {
        world.tick();
    }

    assert_eq!(launcher(&world, pod).rounds_left(), 10);
    assert!(world.registry().bullets_of(pod).is_none_or(|bullets| bullets.is_empty()));
    let parked = world
        .registry()
        .entity_as::<Vehicle>(vehicle)
        .expect("vehicle should remain");
    assert_eq!(parked.core().ticks_existed, 1);
}

#[test]
fn test_coaxial_launcher_follows_partner_aim_but_never_fires() {
    let twin = MultipartDefinition {
        health: 100.0,
        collision_groups: vec![support::hull()],
        part_slots: vec![
            PartSlotDefinition {
                default_part: Some(support::key("seat")),
                ..Default::default()
            },
            PartSlotDefinition {
                pos: DVec3::new(-0.5, 2.0, 0.0),
                linked_seats: vec![0],
                default_part: Some(support::key("pod")),
                ..Default::default()
            },
            PartSlotDefinition {
                pos: DVec3::new(0.5, 2.0, 0.0),
                coaxial_slots: vec![1],
                default_part: Some(support::key("pod")),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let pack = support::pack_with(1, turret(5)).with_vehicle(support::key("twin"), twin);
    let (mut world, _log) = support::server_world(pack);
    let vehicle = world
        .spawn_vehicle(support::key("twin"), DVec3::new(0.0, 5.0, 0.0), DMat3::IDENTITY)
        .expect("twin should spawn");
    let pilot = world.platform_mut().add_player(DVec3::new(0.0, 5.0, -10.0));
    world
        .platform_mut()
        .set_look(pilot, DMat3::from_rotation_y(30f64.to_radians()));
    world.set_seat_rider(vehicle, 0, Some(pilot));
    world.select_launcher(vehicle, 0, Some(support::key("pod")), 0);

    let main = support::launcher_in_slot(&world, vehicle, 1);
    let coaxial = support::launcher_in_slot(&world, vehicle, 2);
    assert!(world.load_ammo(coaxial, support::key("rocket")));
    assert!(world.set_trigger(coaxial, true));
    for _ in 0..5 {
        world.tick();
    }

    // 10 degrees per tick reaches the pilot's 30 degree yaw on the third tick.
    for pod in [main, coaxial] {
        assert!((launcher(&world, pod).internal_angles().y - 30.0).abs() < 1e-9);
    }
    assert_eq!(launcher(&world, main).controller(), Some(pilot));
    let coaxial = launcher(&world, coaxial);
    assert_eq!(coaxial.controller(), None);
    assert_eq!(coaxial.state(), LauncherState::Active);
    assert_eq!(coaxial.rounds_left(), 10);
}

#[test]
fn test_gps_round_designates_ground_point_or_actor_in_sight() {
    let gps = ProjectileDefinition {
        guidance_system: GuidanceSystem::Gps,
        turn_rate: 5.0,
        ..support::rocket()
    };
    let pack =
        support::pack_with(1, support::pod_launcher(5)).with_projectile(support::key("gps"), gps);
    let (mut world, _log) = support::server_world(pack);
    let (holder, pod) = armed_player(&mut world, "gps", 1);
    // Eye height is 1.62; look down at the ground ten blocks ahead.
    world
        .platform_mut()
        .set_look(holder, facing(DVec3::new(0.0, -1.62, 10.0)));

    // The first tick loads the round; designation needs it in the chamber.
    world.tick();
    assert_eq!(launcher(&world, pod).target_point(), None);
    world.tick();
    let point = launcher(&world, pod)
        .target_point()
        .expect("ground point should be designated");
    assert!(point.distance(DVec3::new(0.0, 0.0, 10.0)) < 1e-6);
    assert_eq!(launcher(&world, pod).entity_target(), None);

    let bystander = world.platform_mut().add_player(DVec3::new(0.0, 0.0, 5.0));
    world.tick();
    assert_eq!(launcher(&world, pod).entity_target(), Some(bystander));
    assert_eq!(launcher(&world, pod).target_point(), None);
}

#[test]
fn test_windup_delays_the_first_shot() {
    let spinning = LauncherDefinition {
        windup_time: 3,
        ..support::pod_launcher(5)
    };
    let (mut world, _log) = support::server_world(support::pack_with(1, spinning));
    let (_, pod) = armed_player(&mut world, "rocket", 1);
    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 10);

    world.set_trigger(pod, true);
    for _ in 0..3 {
        world.tick();
        assert_eq!(launcher(&world, pod).rounds_left(), 10);
    }
    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 9);
}

#[test]
fn test_semi_auto_fires_once_per_trigger_pull() {
    let rifle = LauncherDefinition {
        is_semi_auto: true,
        ..support::pod_launcher(2)
    };
    let (mut world, _log) = support::server_world(support::pack_with(1, rifle));
    let (_, pod) = armed_player(&mut world, "rocket", 1);
    world.tick();

    world.set_trigger(pod, true);
    for _ in 0..5 {
        world.tick();
    }
    assert_eq!(launcher(&world, pod).rounds_left(), 9);

    world.set_trigger(pod, false);
    world.tick();
    world.set_trigger(pod, true);
    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 8);
}

#[test]
fn test_npc_holder_targets_nearest_hostile_and_fires() {
    let (mut world, _log) = support::server_world(support::pack_with(1, turret(5)));
    let mut guard = HeadlessActor::new(uuid::Uuid::new_v4(), DVec3::ZERO, false);
    guard.inventory = Inventory::default().with_stack(support::key("rocket"), 1);
    let guard = world.platform_mut().add_actor(guard);
    let bystander = world.platform_mut().add_player(DVec3::new(0.0, 0.0, 10.0));
    let mut raider = HeadlessActor::new(uuid::Uuid::new_v4(), DVec3::new(0.0, 0.0, 20.0), false);
    raider.hostile = true;
    let raider = world.platform_mut().add_actor(raider);
    let pod = world
        .equip_hand_held(guard, support::key("pod"))
        .expect("pod is a launcher part");

    world.tick();
    let held = launcher(&world, pod);
    assert_eq!(held.controller(), Some(guard));
    assert_eq!(held.entity_target(), Some(raider));
    assert_ne!(held.entity_target(), Some(bystander));
    assert_eq!(held.rounds_left(), 10);

    world.tick();
    assert_eq!(launcher(&world, pod).rounds_left(), 9);
}
