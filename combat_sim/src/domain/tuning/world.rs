/// World-level rules.

#[derive(Debug, Clone, Copy)]
pub struct WorldTuning {
    /// Projectiles may break soft blocks.
    pub block_breakage: bool,

    /// Sends debug chat to controllers and skips ammunition consumption on reload.
    pub dev_mode: bool,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            block_breakage: true,
            dev_mode: false,
        }
    }
}
