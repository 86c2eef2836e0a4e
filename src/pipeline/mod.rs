pub mod control;
pub mod scheduler;
pub mod stats;

pub use control::{Command, ControlHandle};
pub use scheduler::{FrameScheduler, ScheduleState, TickOutcome};
pub use stats::{TickSnapshot, TickStats};
