//! Safety monitor - exceedance tracking.
//!
//! The monitor runs **every tick before the state update** and evaluates
//! the configured limits against the latest telemetry and elapsed time.
//! Exceedance is level-triggered: the verdict is recomputed fresh each
//! tick and never latched. The orchestrator treats any tripped flag,
//! while a run is active, as "abort now".
//!
//! Checks are phase-split:
//! - while `Stopped`, only supply voltage, temperature, and lifetime
//!   engaged-time are meaningful;
//! - while `Starting`/`Running`, fuel, vibration, elapsed run time,
//!   starter attempts, and the rpm band join in.

use log::warn;

use crate::config::RunnerConfig;
use crate::fsm::{RunnerState, RunnerStateMachine};
use crate::telemetry::EngineTelemetry;

/// Lifetime engaged-time ceiling for a break-in engine (hours). An engine
/// past this has long finished running-in and does not belong on the stand.
pub const ENGAGED_HOURS_LIMIT: f32 = 40.0;

/// Half-width of the acceptable rpm window around the target.
pub const RPM_BAND: i32 = 500;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// One tick's exceedance verdict: a named flag per configured limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceedanceVerdict {
    pub temperature: bool,
    pub voltage: bool,
    pub fuel: bool,
    pub vibration: bool,
    pub time: bool,
    pub rpm: bool,
    pub start_attempts: bool,
    pub engaged_time: bool,
}

impl ExceedanceVerdict {
    /// True if any individual flag tripped.
    pub fn any(&self) -> bool {
        self.temperature
            || self.voltage
            || self.fuel
            || self.vibration
            || self.time
            || self.rpm
            || self.start_attempts
            || self.engaged_time
    }

    /// Human-readable list of tripped flags, for the stop reason.
    pub fn describe(&self) -> String {
        let mut reasons: Vec<&str> = Vec::new();
        if self.temperature {
            reasons.push("temperature above maximum");
        }
        if self.voltage {
            reasons.push("supply voltage below minimum");
        }
        if self.fuel {
            reasons.push("fuel level below minimum");
        }
        if self.vibration {
            reasons.push("vibration above maximum");
        }
        if self.time {
            reasons.push("run time budget elapsed");
        }
        if self.rpm {
            reasons.push("rpm out of band");
        }
        if self.start_attempts {
            reasons.push("start attempts exceeded");
        }
        if self.engaged_time {
            reasons.push("lifetime engaged time exceeded");
        }
        reasons.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Safety monitor. Stateless: a pure function of its inputs, packaged as
/// a struct so the orchestrator can hold and inject it like the other
/// collaborators.
pub struct ExceedanceMonitor;

impl ExceedanceMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate all applicable limits for this tick.
    ///
    /// `start_time` is the orchestrator-owned run start (epoch seconds,
    /// 0 = no run). The previous verdict is discarded by the caller; this
    /// function mutates nothing.
    pub fn check(
        &self,
        telemetry: &EngineTelemetry,
        config: &RunnerConfig,
        machine: &RunnerStateMachine,
        start_time: u64,
        now: u64,
    ) -> ExceedanceVerdict {
        match machine.state() {
            RunnerState::Stopped => Self::check_stopped(telemetry, config, machine),
            RunnerState::Starting | RunnerState::Running => {
                Self::check_running(telemetry, config, machine, start_time, now)
            }
            // NotConnected / Stopping / Fault: nothing to enforce; the
            // orchestrator is already holding the engine down.
            RunnerState::NotConnected | RunnerState::Stopping | RunnerState::Fault => {
                ExceedanceVerdict::default()
            }
        }
    }

    /// Checks that apply while no run is in progress.
    fn check_stopped(
        telemetry: &EngineTelemetry,
        config: &RunnerConfig,
        machine: &RunnerStateMachine,
    ) -> ExceedanceVerdict {
        // A non-zero attempt counter outside a run is a logic bug in the
        // stop path, not a runtime condition.
        debug_assert!(
            machine.start_attempts() == 0,
            "start_attempts={} while stopped",
            machine.start_attempts()
        );

        ExceedanceVerdict {
            voltage: telemetry.voltage_in < config.min_vin_voltage,
            temperature: telemetry.temperature_c > config.max_temperature_c,
            engaged_time: telemetry.engaged_hours > ENGAGED_HOURS_LIMIT,
            ..ExceedanceVerdict::default()
        }
    }

    /// Checks that apply while a run is active.
    fn check_running(
        telemetry: &EngineTelemetry,
        config: &RunnerConfig,
        machine: &RunnerStateMachine,
        start_time: u64,
        now: u64,
    ) -> ExceedanceVerdict {
        let mut verdict = ExceedanceVerdict::default();

        // Starter attempts trip first and short-circuit the rest of the
        // tick: the run is over either way.
        if machine.start_attempts() >= config.max_start_attempts {
            warn!(
                "start attempts exhausted: {}/{}",
                machine.start_attempts(),
                config.max_start_attempts
            );
            verdict.start_attempts = true;
            return verdict;
        }

        verdict.voltage = telemetry.voltage_in < config.min_vin_voltage;
        verdict.temperature = telemetry.temperature_c > config.max_temperature_c;
        verdict.engaged_time = telemetry.engaged_hours > ENGAGED_HOURS_LIMIT;

        // Minimum fuel compares against percent remaining; the absolute
        // volume is carried for reporting only.
        verdict.fuel = telemetry.fuel_volume_percent < config.min_fuel_percent;

        // Absence of the sensor must never read as an exceedance.
        verdict.vibration =
            telemetry.vibration_supported && telemetry.vibration > config.max_vibration;

        // The diagnostic modes override the configured budget with fixed
        // bounds; see RunnerMode::time_budget_secs.
        let budget = config.mode.time_budget_secs(config.time_secs);
        verdict.time = start_time > 0 && now.saturating_sub(start_time) > budget;

        // Rpm is unstable while cranking; holding it to the band during
        // Starting would abort every cold start.
        verdict.rpm = config.mode.checks_rpm()
            && machine.state() == RunnerState::Running
            && (telemetry.rpm - config.target_rpm).abs() > RPM_BAND;

        verdict
    }
}

impl Default for ExceedanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
