//! Engine telemetry snapshot.
//!
//! `EngineTelemetry` is the decoded status record produced by the CAN
//! transport. The control core never parses wire frames itself - it
//! receives a fully-typed snapshot, replaced wholesale on every transport
//! update, and treats it as read-only for the duration of a tick.

use serde::{Deserialize, Serialize};

/// How long a telemetry snapshot stays trustworthy. If the transport has
/// not refreshed it within this window, the core must treat the engine as
/// disconnected rather than act on stale data.
pub const TELEMETRY_STALE_SECS: u64 = 2;

// ---------------------------------------------------------------------------
// Hardware-reported engine state
// ---------------------------------------------------------------------------

/// Operating state of the physical engine as reported over the CAN link.
///
/// This is deliberately a *separate* type from the runner's own
/// [`RunnerState`](crate::fsm::RunnerState): the two enums live in
/// different domains (what the hardware says vs. what the supervisor is
/// doing) and must never be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No telemetry seen, or the last snapshot is stale.
    NotConnected,
    /// Engine stopped, starter idle.
    Stopped,
    /// Starter motor is cranking.
    StarterRunning,
    /// Starter resting between crank cycles.
    StarterWaiting,
    /// The ECU reports a hardware fault.
    Fault,
}

// ---------------------------------------------------------------------------
// Telemetry snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of everything the engine reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineTelemetry {
    /// Hardware-reported engine state.
    pub state: EngineState,
    /// Crankshaft speed (rpm).
    pub rpm: i32,
    /// Oil/coolant temperature (°C).
    pub temperature_c: f32,
    /// Remaining fuel, absolute (litres).
    pub fuel_volume_l: f32,
    /// Remaining fuel as a percentage of tank capacity.
    pub fuel_volume_percent: f32,
    /// Current gas throttle position (native actuator units).
    pub gas_throttle: i32,
    /// Current air throttle position (native actuator units).
    pub air_throttle: i32,
    /// Supply voltage at the stand (V).
    pub voltage_in: f32,
    /// Vibration magnitude from the accelerometer, if fitted.
    pub vibration: f32,
    /// Whether the stand actually carries a vibration sensor. When false,
    /// `vibration` is meaningless and must never trigger an abort.
    pub vibration_supported: bool,
    /// Cumulative engine engaged time over its whole life (hours).
    pub engaged_hours: f32,
    /// Epoch seconds at which the transport last refreshed this snapshot.
    pub updated_at: u64,
}

impl EngineTelemetry {
    /// A disconnected placeholder, used before the first transport update.
    pub fn disconnected() -> Self {
        Self {
            state: EngineState::NotConnected,
            rpm: 0,
            temperature_c: 0.0,
            fuel_volume_l: 0.0,
            fuel_volume_percent: 0.0,
            gas_throttle: 0,
            air_throttle: 0,
            voltage_in: 0.0,
            vibration: 0.0,
            vibration_supported: false,
            engaged_hours: 0.0,
            updated_at: 0,
        }
    }

    /// True if the snapshot is older than [`TELEMETRY_STALE_SECS`].
    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.updated_at) > TELEMETRY_STALE_SECS
    }
}

impl Default for EngineTelemetry {
    fn default() -> Self {
        Self::disconnected()
    }
}
