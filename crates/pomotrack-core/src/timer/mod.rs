//! Pomodoro timer: phase rules, the pure state machine, and the async
//! controller that drives it in real time.

mod controller;
mod machine;
mod phase;

pub use controller::{ControllerOptions, TimerController};
pub use machine::{FinishedInterval, IntervalCapture, TimerMachine, TimerSnapshot, Transition};
pub use phase::{break_after, Phase};
