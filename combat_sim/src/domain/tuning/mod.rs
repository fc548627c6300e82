// Gameplay tuning, kept separate from runtime config.

pub mod launcher;
pub mod projectile;
pub mod world;

use launcher::LauncherTuning;
use projectile::ProjectileTuning;
use world::WorldTuning;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimTuning {
    pub launcher: LauncherTuning,
    pub projectile: ProjectileTuning,
    pub world: WorldTuning,
}
