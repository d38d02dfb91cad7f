mod engine;

pub use engine::{format_clock, CycleState, Phase, WorkBreakCycle};
