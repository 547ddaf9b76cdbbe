//! Inbound commands to the runner.
//!
//! These represent operator intent arriving from the outside world (the
//! chat bot via the message-bus relay, or a local console). They are
//! posted into the command mailbox and drained by the orchestrator at the
//! top of each tick.

use crate::config::RunnerConfig;

/// Commands external adapters can send into the control core.
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    /// Begin a supervised run with the current configuration.
    Start,

    /// Stop the current run (idempotent).
    Stop,

    /// Change a single numeric configuration field. Validated against the
    /// field's declared min/max; rejection leaves the config untouched.
    Reconfigure { field: String, value: f64 },

    /// Replace the whole configuration (validated wholesale first).
    UpdateConfig(RunnerConfig),
}

impl RunnerCommand {
    /// Whether applying this command changes the runner's operating state.
    /// At most one such command is applied per tick.
    pub fn is_state_affecting(&self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}
