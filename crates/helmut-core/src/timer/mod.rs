mod engine;
mod format;

pub use engine::{
    Cancelled, CompletionReceiver, TimerCompletion, TimerEngine, TimerPhase, TimerSnapshot, TICK,
};
pub use format::format_time;
