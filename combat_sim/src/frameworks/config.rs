use std::{env, path::PathBuf, time::Duration};

use crate::domain::tuning::SimTuning;

// Runtime constants and env overrides (not gameplay tuning, apart from the world rules below).

pub fn tick_interval() -> Duration {
    let millis = env::var("SIM_TICK_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(50);
    Duration::from_millis(millis)
}

pub fn save_path() -> PathBuf {
    env::var("SIM_SAVE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("world.json"))
}

pub fn pack_path() -> Option<PathBuf> {
    env::var("SIM_PACK_PATH").ok().map(PathBuf::from)
}

pub fn world_seed() -> u64 {
    env::var("SIM_WORLD_SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn flag(name: &str, default: bool) -> bool {
    match env::var(name).as_deref() {
        Ok("1") | Ok("true") => true,
        Ok("0") | Ok("false") => false,
        _ => default,
    }
}

pub fn dev_mode() -> bool {
    flag("SIM_DEV_MODE", false)
}

pub fn block_breakage() -> bool {
    flag("SIM_BLOCK_BREAKAGE", true)
}

pub fn damage_factor() -> f64 {
    env::var("SIM_DAMAGE_FACTOR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1.0)
}

/// Default tuning with the world rules taken from the environment.
pub fn sim_tuning() -> SimTuning {
    let mut tuning = SimTuning::default();
    tuning.world.dev_mode = dev_mode();
    tuning.world.block_breakage = block_breakage();
    tuning.projectile.bullet_damage_factor = damage_factor();
    tuning
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const DEFAULT_WORLD_ID: &str = "overworld";
