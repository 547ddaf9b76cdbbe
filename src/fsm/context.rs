//! Shared mutable context threaded through every state handler.
//!
//! `RunnerContext` is the blackboard the handlers read from and write to:
//! the engine state observed this tick, the wall clock, the starter
//! debounce timer, and the per-run start-attempt counter.

use crate::telemetry::EngineState;

/// Minimum dwell between starter observations before they are believed.
/// The starter alternates cranking and resting several times before the
/// engine catches; shorter pulses are telemetry flicker, not stalls.
pub const STARTER_DEBOUNCE_SECS: u64 = 4;

/// The context passed to every state handler function.
#[derive(Debug)]
pub struct RunnerContext {
    /// Hardware-reported engine state observed this tick.
    pub engine_state: EngineState,
    /// Wall clock for this tick (epoch seconds).
    pub now: u64,
    /// Starter debounce timer: epoch seconds at which the current crank
    /// cycle was first observed. Zero means "not armed".
    pub debounce_armed_at: u64,
    /// Starter attempts made during the current run.
    pub start_attempts: u32,
}

impl RunnerContext {
    pub fn new() -> Self {
        Self {
            engine_state: EngineState::NotConnected,
            now: 0,
            debounce_armed_at: 0,
            start_attempts: 0,
        }
    }

    /// True once the armed debounce timer has dwelled long enough for the
    /// current starter observation to be trusted.
    pub fn debounce_elapsed(&self) -> bool {
        self.debounce_armed_at != 0
            && self.now.saturating_sub(self.debounce_armed_at) > STARTER_DEBOUNCE_SECS
    }
}

impl Default for RunnerContext {
    fn default() -> Self {
        Self::new()
    }
}
