//! Outbound runner events.
//!
//! The orchestrator emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them - log them, publish them to the
//! message-bus relay for the bot, etc. All emissions are best-effort and
//! fire-and-forget.

use serde::Serialize;

use crate::config::RunnerConfig;
use crate::control::RunnerMode;
use crate::fsm::RunnerState;

/// Structured events emitted by the control core.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// State heartbeat, emitted every tick (≥2 Hz at the default period).
    Heartbeat(RunnerState),

    /// Full status snapshot, emitted at the configured report period.
    Status(StatusSnapshot),

    /// Why the current run was aborted or stopped.
    StopReason(String),

    /// Named log files flushed at the end of a run.
    LogBundle(Vec<String>),

    /// Echo of the full configuration after an accepted change.
    ConfigEcho(RunnerConfig),
}

/// A point-in-time status summary suitable for relaying to operators.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: RunnerState,
    pub mode: RunnerMode,
    pub rpm: i32,
    pub temperature_c: f32,
    pub fuel_volume_percent: f32,
    pub voltage_in: f32,
    pub vibration: f32,
    pub engaged_hours: f32,
    /// Starter attempts made during the current run.
    pub start_attempts: u32,
    /// Seconds left in the run budget (full budget when no run is active).
    pub time_remaining_secs: u64,
}
