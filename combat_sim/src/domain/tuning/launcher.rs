/// Gameplay tuning for launcher targeting.

#[derive(Debug, Clone, Copy)]
pub struct LauncherTuning {
    /// Radius NPC controllers search for hostiles in.
    pub hostile_search_radius: f64,

    /// Max distance of a player's look-ray target lock.
    pub raytrace_distance: f64,

    /// Ticks between checks for a closer NPC target.
    pub retarget_interval_ticks: u64,

    /// A new target must be this much closer to replace the current one.
    pub retarget_margin: f64,
}

impl Default for LauncherTuning {
    fn default() -> Self {
        Self {
            hostile_search_radius: 48.0,
            raytrace_distance: 750.0,
            retarget_interval_ticks: 20,
            retarget_margin: 5.0,
        }
    }
}
