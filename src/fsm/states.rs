//! Concrete state handler functions and table builder.
//!
//! ```text
//!  NOT_CONNECTED ──[engine stopped]──▶ STOPPED ◀──[engine stopped]── STOPPING
//!        │                               │                              ▲
//!  [engine moving:                 [engine moves                        │
//!   force clean stop]               on its own]                         │
//!        └──────────────▶ STOPPING ◀─────┘            [exceedance/stop command]
//!                                                                       │
//!  STARTING ──[starter runs > 4s]──▶ RUNNING ──────────────────────────▶│
//!     ▲  │                              │
//!     │  └─[starter waits > 4s:         └─[stall: waiting or stopped]──▶ STARTING
//!     │     count attempt, rearm]
//!     │
//!  (entered by the start command, or by a stall from RUNNING)
//!
//!  Any state ──[telemetry lost]──▶ NOT_CONNECTED   (handled in the engine)
//! ```
//!
//! The starter debounce lives here: the starter motor alternates between
//! powered cranks and rest pauses while the engine tries to catch, so a
//! starter observation is only believed once it has dwelled more than
//! [`STARTER_DEBOUNCE_SECS`](super::context::STARTER_DEBOUNCE_SECS) past
//! the last arming of the timer.

use log::info;

use super::context::RunnerContext;
use super::{RunnerState, StateDescriptor};
use crate::telemetry::EngineState;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at machine construction.
pub fn build_state_table() -> [StateDescriptor; RunnerState::COUNT] {
    [
        // Index 0 - NotConnected
        StateDescriptor {
            id: RunnerState::NotConnected,
            name: "NotConnected",
            on_enter: None,
            on_exit: None,
            on_update: not_connected_update,
        },
        // Index 1 - Stopped
        StateDescriptor {
            id: RunnerState::Stopped,
            name: "Stopped",
            on_enter: None,
            on_exit: None,
            on_update: stopped_update,
        },
        // Index 2 - Starting
        StateDescriptor {
            id: RunnerState::Starting,
            name: "Starting",
            on_enter: None,
            on_exit: None,
            on_update: starting_update,
        },
        // Index 3 - Running
        StateDescriptor {
            id: RunnerState::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: None,
            on_update: running_update,
        },
        // Index 4 - Stopping
        StateDescriptor {
            id: RunnerState::Stopping,
            name: "Stopping",
            on_enter: None,
            on_exit: None,
            on_update: stopping_update,
        },
        // Index 5 - Fault
        StateDescriptor {
            id: RunnerState::Fault,
            name: "Fault",
            on_enter: None,
            on_exit: None,
            on_update: fault_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NOT_CONNECTED - waiting for the first trustworthy engine report
// ═══════════════════════════════════════════════════════════════════════════

fn not_connected_update(ctx: &mut RunnerContext) -> Option<RunnerState> {
    match ctx.engine_state {
        EngineState::Stopped => Some(RunnerState::Stopped),
        // An engine that is already turning before the runner confirmed a
        // connection is never adopted as-is: force a clean stop first.
        _ => Some(RunnerState::Stopping),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPED - engine quiescent, no run in progress
// ═══════════════════════════════════════════════════════════════════════════

fn stopped_update(ctx: &mut RunnerContext) -> Option<RunnerState> {
    if ctx.engine_state == EngineState::Stopped {
        None
    } else {
        // The engine moved on its own. Force a clean stop before
        // trusting it again.
        info!("engine moved while stopped ({:?})", ctx.engine_state);
        Some(RunnerState::Stopping)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  STARTING - starter cycling, debounced until the engine catches
// ═══════════════════════════════════════════════════════════════════════════

fn starting_update(ctx: &mut RunnerContext) -> Option<RunnerState> {
    if ctx.debounce_armed_at == 0 {
        // First observation of this crank cycle: arm and wait.
        ctx.debounce_armed_at = ctx.now;
        return None;
    }

    match ctx.engine_state {
        EngineState::StarterWaiting if ctx.debounce_elapsed() => {
            // Another crank cycle is beginning.
            ctx.start_attempts += 1;
            ctx.debounce_armed_at = ctx.now;
            info!("start attempt {} underway", ctx.start_attempts);
            None
        }
        EngineState::StarterRunning if ctx.debounce_elapsed() => {
            // Sustained cranking past the dwell: the engine has caught.
            Some(RunnerState::Running)
        }
        // Stopped: still settling into the crank cycle. Short pulses of
        // either starter state: flicker, ignore.
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING - engine turning under its own power
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut RunnerContext) {
    // The crank cycle is over; a fresh one re-arms from scratch.
    ctx.debounce_armed_at = 0;
    info!("engine running after {} start attempt(s)", ctx.start_attempts);
}

fn running_update(ctx: &mut RunnerContext) -> Option<RunnerState> {
    match ctx.engine_state {
        EngineState::StarterWaiting => {
            // Stall: the starter is resting again. Restart the cycle with
            // the timer armed so the next observation is dwell-checked.
            ctx.debounce_armed_at = ctx.now;
            Some(RunnerState::Starting)
        }
        EngineState::Stopped => {
            // Unexpected stall straight to stopped.
            ctx.start_attempts += 1;
            Some(RunnerState::Starting)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPING - commanded down, waiting for the engine to confirm
// ═══════════════════════════════════════════════════════════════════════════

fn stopping_update(ctx: &mut RunnerContext) -> Option<RunnerState> {
    if ctx.engine_state == EngineState::Stopped {
        Some(RunnerState::Stopped)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULT - terminal until an external stop/reset starts a new cycle
// ═══════════════════════════════════════════════════════════════════════════

fn fault_update(_ctx: &mut RunnerContext) -> Option<RunnerState> {
    None
}
