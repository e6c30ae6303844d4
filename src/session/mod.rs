pub(crate) mod pacing;
pub(crate) mod plan;
pub(crate) mod preview;
pub(crate) mod scheduler;
