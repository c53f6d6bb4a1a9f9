use derive_more::Display;

/// Pipeline stages, in execution order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    #[display("snapshot")]
    Snapshot,
    #[display("fetch+package")]
    Package,
    #[display("bundle")]
    Bundle,
    #[display("catalog")]
    Catalog,
    #[display("upload")]
    Upload,
    #[display("cleanup")]
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Snapshot,
        Stage::Package,
        Stage::Bundle,
        Stage::Catalog,
        Stage::Upload,
        Stage::Cleanup,
    ];

    /// Whether the stage is subject to gating (everything but cleanup).
    pub fn is_gated(&self) -> bool {
        !matches!(self, Stage::Cleanup)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageState {
    #[default]
    NotRun,
    Succeeded,
    Failed(String),
}

impl StageState {
    pub fn is_success(&self) -> bool {
        matches!(self, StageState::Succeeded)
    }
}
