mod driver;
mod engine;
mod mode;

pub use driver::TimerDriver;
pub use engine::{Completion, TimerEngine, TimerState};
pub use mode::{format_clock, Mode, ModePolicy};
