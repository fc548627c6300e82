/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Ticks a projectile may coast after burnout before it is removed.
    pub timeout_grace_ticks: u64,

    /// Global multiplier applied to projectile damage.
    pub bullet_damage_factor: f64,

    /// Ticks per second of the simulation clock.
    pub ticks_per_second: f64,

    /// Definition speeds are divided by this after the per-tick conversion.
    pub velocity_scale: f64,
}

impl ProjectileTuning {
    /// Converts a definition speed into blocks per tick.
    pub fn per_tick(&self, speed: f64) -> f64 {
        speed / self.ticks_per_second / self.velocity_scale
    }
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            timeout_grace_ticks: 600,
            bullet_damage_factor: 1.0,
            ticks_per_second: 20.0,
            velocity_scale: 10.0,
        }
    }
}
