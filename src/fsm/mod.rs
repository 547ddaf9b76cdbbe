//! Function-pointer finite state machine for the runner.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌──────────────┬───────────┬──────────┬─────────────────┐ │
//! │  │ RunnerState  │ on_enter  │ on_exit  │ on_update       │ │
//! │  ├──────────────┼───────────┼──────────┼─────────────────┤ │
//! │  │ NotConnected │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Opt<>  │ │
//! │  │ Stopped      │ …         │ …        │ …               │ │
//! │  │ Starting     │ …         │ …        │ …               │ │
//! │  │ Running      │ …         │ …        │ …               │ │
//! │  │ Stopping     │ …         │ …        │ …               │ │
//! │  │ Fault        │ …         │ …        │ …               │ │
//! │  └──────────────┴───────────┴──────────┴─────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the orchestrator calls [`RunnerStateMachine::update`] with the
//! engine state decoded from telemetry and the wall clock. The machine
//! dispatches `on_update` for the **current** state; a returned
//! `Some(next)` runs `on_exit` → pointer swap → `on_enter`. Telemetry loss
//! short-circuits the table entirely: `EngineState::NotConnected` forces
//! the runner to `NotConnected` from any state.
//!
//! The machine is the sole owner of the authoritative runner state, the
//! previous state, and the per-run start-attempt counter.

pub mod context;
pub mod states;

use log::info;
use serde::{Deserialize, Serialize};

use crate::telemetry::EngineState;
use context::RunnerContext;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The runner's own operating state - what the supervisor is doing, as
/// opposed to [`EngineState`], which is what the hardware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunnerState {
    NotConnected = 0,
    Stopped = 1,
    Starting = 2,
    Running = 3,
    Stopping = 4,
    Fault = 5,
}

impl RunnerState {
    /// Total number of states - used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert a table index back to `RunnerState`. Panics on
    /// out-of-range in debug builds; returns `Fault` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::NotConnected,
            1 => Self::Stopped,
            2 => Self::Starting,
            3 => Self::Running,
            4 => Self::Stopping,
            5 => Self::Fault,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Fault
            }
        }
    }

    /// Whether a run is in progress (the phase in which safety
    /// exceedances abort).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut RunnerContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut RunnerContext) -> Option<RunnerState>;

/// Static descriptor for a single state. Stored in a fixed-size array:
/// no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: RunnerState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// The runner state machine. Owns the state table, the shared context,
/// and the current/previous state pointers.
pub struct RunnerStateMachine {
    table: [StateDescriptor; RunnerState::COUNT],
    current: usize,
    previous: usize,
    ctx: RunnerContext,
}

impl RunnerStateMachine {
    /// Construct the machine in its initial `NotConnected` state.
    pub fn new() -> Self {
        Self {
            table: states::build_state_table(),
            current: RunnerState::NotConnected as usize,
            previous: RunnerState::NotConnected as usize,
            ctx: RunnerContext::new(),
        }
    }

    /// Advance the machine by one tick.
    ///
    /// Telemetry loss wins unconditionally: `EngineState::NotConnected`
    /// forces the runner to `NotConnected` no matter what the current
    /// state's handler would have done - even out of `Fault`.
    pub fn update(&mut self, engine_state: EngineState, now: u64) {
        self.ctx.engine_state = engine_state;
        self.ctx.now = now;

        if engine_state == EngineState::NotConnected {
            if self.current != RunnerState::NotConnected as usize {
                self.transition(RunnerState::NotConnected);
            }
            return;
        }

        if let Some(next) = (self.table[self.current].on_update)(&mut self.ctx) {
            self.transition(next);
        }
    }

    /// Force an immediate transition (used by the orchestrator for
    /// start/stop commands and external fault injection).
    pub fn force(&mut self, next: RunnerState) {
        if next as usize != self.current {
            self.transition(next);
        }
    }

    /// Reset the per-run counters. Orchestrator-scoped: called from the
    /// stop path, not by any state handler.
    pub fn reset_run_counters(&mut self) {
        self.ctx.start_attempts = 0;
        self.ctx.debounce_armed_at = 0;
    }

    /// The current authoritative runner state.
    pub fn state(&self) -> RunnerState {
        RunnerState::from_index(self.current)
    }

    /// The state before the latest transition.
    pub fn previous_state(&self) -> RunnerState {
        RunnerState::from_index(self.previous)
    }

    /// Starter attempts made during the current run.
    pub fn start_attempts(&self) -> u32 {
        self.ctx.start_attempts
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: RunnerState) {
        let next_idx = next_id as usize;

        info!(
            "runner state: {} -> {} (engine={:?})",
            self.table[self.current].name, self.table[next_idx].name, self.ctx.engine_state
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(&mut self.ctx);
        }

        self.previous = self.current;
        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(&mut self.ctx);
        }
    }
}

impl Default for RunnerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> RunnerStateMachine {
        RunnerStateMachine::new()
    }

    #[test]
    fn starts_not_connected() {
        let m = machine();
        assert_eq!(m.state(), RunnerState::NotConnected);
        assert_eq!(m.previous_state(), RunnerState::NotConnected);
        assert_eq!(m.start_attempts(), 0);
    }

    #[test]
    fn not_connected_to_stopped_on_stopped_engine() {
        let mut m = machine();
        m.update(EngineState::Stopped, 100);
        assert_eq!(m.state(), RunnerState::Stopped);
        assert_eq!(m.previous_state(), RunnerState::NotConnected);
    }

    #[test]
    fn not_connected_distrusts_running_engine() {
        // An engine that is already turning before the runner ever
        // confirmed a connection gets forced down, not adopted.
        for engine in [
            EngineState::StarterRunning,
            EngineState::StarterWaiting,
            EngineState::Fault,
        ] {
            let mut m = machine();
            m.update(engine, 100);
            assert_eq!(m.state(), RunnerState::Stopping, "engine={engine:?}");
        }
    }

    #[test]
    fn stopped_engine_moving_on_its_own_forces_stopping() {
        let mut m = machine();
        m.update(EngineState::Stopped, 100);
        m.update(EngineState::StarterRunning, 101);
        assert_eq!(m.state(), RunnerState::Stopping);
    }

    #[test]
    fn stopping_settles_to_stopped() {
        let mut m = machine();
        m.force(RunnerState::Stopping);
        m.update(EngineState::StarterRunning, 100);
        assert_eq!(m.state(), RunnerState::Stopping);
        m.update(EngineState::Stopped, 101);
        assert_eq!(m.state(), RunnerState::Stopped);
    }

    #[test]
    fn starting_arms_debounce_then_runs_after_dwell() {
        let mut m = machine();
        m.force(RunnerState::Starting);
        // First observation arms the timer, no transition yet.
        m.update(EngineState::StarterRunning, 100);
        assert_eq!(m.state(), RunnerState::Starting);
        // Within the dwell window: still starting.
        m.update(EngineState::StarterRunning, 104);
        assert_eq!(m.state(), RunnerState::Starting);
        // More than 4 s after arming: the engine has caught.
        m.update(EngineState::StarterRunning, 105);
        assert_eq!(m.state(), RunnerState::Running);
    }

    #[test]
    fn starter_waiting_after_dwell_counts_an_attempt() {
        let mut m = machine();
        m.force(RunnerState::Starting);
        m.update(EngineState::StarterRunning, 100); // arm
        m.update(EngineState::StarterWaiting, 105); // attempt 1, rearm
        assert_eq!(m.start_attempts(), 1);
        assert_eq!(m.state(), RunnerState::Starting);
        m.update(EngineState::StarterWaiting, 110); // attempt 2, rearm
        assert_eq!(m.start_attempts(), 2);
    }

    #[test]
    fn transient_waiting_pulse_is_debounced() {
        let mut m = machine();
        m.force(RunnerState::Starting);
        m.update(EngineState::StarterRunning, 100); // arm
        m.update(EngineState::StarterWaiting, 102); // within dwell - ignored
        assert_eq!(m.start_attempts(), 0);
        assert_eq!(m.state(), RunnerState::Starting);
    }

    #[test]
    fn stopped_engine_while_starting_keeps_settling() {
        let mut m = machine();
        m.force(RunnerState::Starting);
        m.update(EngineState::Stopped, 100);
        m.update(EngineState::Stopped, 110);
        assert_eq!(m.state(), RunnerState::Starting);
    }

    #[test]
    fn running_stall_to_waiting_restarts_cycle() {
        let mut m = running_machine();
        m.update(EngineState::StarterWaiting, 200);
        assert_eq!(m.state(), RunnerState::Starting);
    }

    #[test]
    fn running_unexpected_stop_counts_attempt() {
        let mut m = running_machine();
        let before = m.start_attempts();
        m.update(EngineState::Stopped, 200);
        assert_eq!(m.state(), RunnerState::Starting);
        assert_eq!(m.start_attempts(), before + 1);
    }

    #[test]
    fn running_stays_while_engine_runs() {
        let mut m = running_machine();
        m.update(EngineState::StarterRunning, 200);
        assert_eq!(m.state(), RunnerState::Running);
    }

    #[test]
    fn telemetry_loss_wins_from_every_state() {
        for state in [
            RunnerState::Stopped,
            RunnerState::Starting,
            RunnerState::Running,
            RunnerState::Stopping,
            RunnerState::Fault,
        ] {
            let mut m = machine();
            m.force(state);
            m.update(EngineState::NotConnected, 100);
            assert_eq!(m.state(), RunnerState::NotConnected, "from {state:?}");
        }
    }

    #[test]
    fn fault_is_terminal_under_normal_telemetry() {
        let mut m = machine();
        m.force(RunnerState::Fault);
        for engine in [
            EngineState::Stopped,
            EngineState::StarterRunning,
            EngineState::StarterWaiting,
            EngineState::Fault,
        ] {
            m.update(engine, 100);
            assert_eq!(m.state(), RunnerState::Fault);
        }
    }

    #[test]
    fn reset_run_counters_clears_attempts_and_timer() {
        let mut m = machine();
        m.force(RunnerState::Starting);
        m.update(EngineState::StarterRunning, 100);
        m.update(EngineState::StarterWaiting, 105);
        assert!(m.start_attempts() > 0);
        m.reset_run_counters();
        assert_eq!(m.start_attempts(), 0);
    }

    #[test]
    fn state_index_roundtrip() {
        for i in 0..RunnerState::COUNT {
            assert_eq!(RunnerState::from_index(i) as usize, i);
        }
    }

    /// Drive a fresh machine through a full debounced start.
    fn running_machine() -> RunnerStateMachine {
        let mut m = machine();
        m.force(RunnerState::Starting);
        m.update(EngineState::StarterRunning, 100);
        m.update(EngineState::StarterRunning, 105);
        assert_eq!(m.state(), RunnerState::Running);
        m
    }
}
