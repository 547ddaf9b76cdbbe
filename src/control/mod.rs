//! Command generation - per-mode throttle policy.
//!
//! A run operates in exactly one [`RunnerMode`]. Each tick the strategy
//! maps (runner state, telemetry) to a `(gas, air)` actuator pair in
//! native units. The mode set is closed: one enum, one exhaustive match,
//! no runtime policy lookup.

pub mod pid;

use serde::{Deserialize, Serialize};

use crate::config::RunnerConfig;
use crate::fsm::RunnerState;
use crate::telemetry::EngineTelemetry;
use pid::PidRegulator;

// ---------------------------------------------------------------------------
// Native actuator units
// ---------------------------------------------------------------------------

/// Full-scale throttle command in native actuator units.
pub const CMD_MAX: i32 = 8191;

/// Gas throttle applied while cranking the starter.
pub const CRANK_GAS: i32 = 3500;

/// Air throttle held fully open during cranking.
pub const AIR_OPEN: i32 = CMD_MAX;

/// Actuator release sentinel: the ECU returns the channel to its default
/// position when commanded `-1`.
pub const AIR_RELEASE: i32 = -1;

/// Fixed gas throttle for the starter-check diagnostic mode (20% scale).
const CHECK_GAS_PERCENT: u8 = 20;

/// Translate a configured percentage into native actuator units.
pub fn percent_to_unit(percent: u8) -> i32 {
    i32::from(percent) * CMD_MAX / 100
}

// ---------------------------------------------------------------------------
// Runner mode
// ---------------------------------------------------------------------------

/// Throttle-control policy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerMode {
    /// Fixed gas/air throttle from configured percentages.
    Const,
    /// Gas throttle from the on-board PID regulator, chasing `target_rpm`.
    Pid,
    /// Target rpm forwarded unmodified; regulation delegated to the ECU.
    Rpm,
    /// Short starter-exercise diagnostic at a fixed low throttle.
    Check,
    /// Fuel-line priming: gas at the configured percentage, air released.
    FuelPumping,
}

impl RunnerMode {
    /// Elapsed-time bound for this mode. The two diagnostic modes carry
    /// fixed limits regardless of the configured run budget.
    pub fn time_budget_secs(self, configured: u64) -> u64 {
        match self {
            Self::Check => 12,
            Self::FuelPumping => 30,
            Self::Const | Self::Pid | Self::Rpm => configured,
        }
    }

    /// Whether the safety monitor holds this mode to the rpm band.
    /// `Const` commands raw throttle and never flags rpm; the diagnostic
    /// modes never reach stable rpm at all.
    pub fn checks_rpm(self) -> bool {
        matches!(self, Self::Pid | Self::Rpm)
    }
}

// ---------------------------------------------------------------------------
// Throttle command
// ---------------------------------------------------------------------------

/// One actuator command pair, in native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleCommand {
    pub gas: i32,
    pub air: i32,
}

impl ThrottleCommand {
    /// Everything released - the command sent outside a run.
    pub fn zero() -> Self {
        Self { gas: 0, air: AIR_RELEASE }
    }

    /// Crank command used while the starter works through its cycles.
    pub fn crank() -> Self {
        Self { gas: CRANK_GAS, air: AIR_OPEN }
    }
}

// ---------------------------------------------------------------------------
// Command strategy
// ---------------------------------------------------------------------------

/// Per-mode command generation. Owns the PID regulator; everything else is
/// read from the configuration each tick.
#[derive(Debug)]
pub struct CommandStrategy {
    pid: PidRegulator,
}

impl CommandStrategy {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            pid: PidRegulator::new(
                config.kp,
                config.ki,
                config.kd,
                f64::from(config.target_rpm),
            ),
        }
    }

    /// Rebuild the regulator from the current gains and re-seed its clock.
    /// Called when a run starts and after an accepted reconfiguration.
    pub fn begin_run(&mut self, config: &RunnerConfig, now: u64) {
        self.pid = PidRegulator::new(
            config.kp,
            config.ki,
            config.kd,
            f64::from(config.target_rpm),
        );
        self.pid.reset(now);
    }

    /// Compute the actuator pair for the current runner state.
    ///
    /// `Starting` cranks at a fixed throttle for the regular modes; the
    /// two diagnostic modes intentionally crank at their operating command
    /// instead. Any state outside a run commands zero.
    pub fn get_command(
        &mut self,
        config: &RunnerConfig,
        run_state: RunnerState,
        telemetry: &EngineTelemetry,
        now: u64,
    ) -> ThrottleCommand {
        match run_state {
            RunnerState::Running => self.running_command(config, telemetry, now),
            RunnerState::Starting => match config.mode {
                RunnerMode::Check | RunnerMode::FuelPumping => {
                    self.running_command(config, telemetry, now)
                }
                RunnerMode::Const | RunnerMode::Pid | RunnerMode::Rpm => {
                    ThrottleCommand::crank()
                }
            },
            RunnerState::NotConnected
            | RunnerState::Stopped
            | RunnerState::Stopping
            | RunnerState::Fault => ThrottleCommand::zero(),
        }
    }

    fn running_command(
        &mut self,
        config: &RunnerConfig,
        telemetry: &EngineTelemetry,
        now: u64,
    ) -> ThrottleCommand {
        let air = percent_to_unit(config.air_throttle_percent);
        match config.mode {
            RunnerMode::Const => ThrottleCommand {
                gas: percent_to_unit(config.gas_throttle_percent),
                air,
            },
            RunnerMode::Pid => ThrottleCommand {
                gas: self.pid.next(f64::from(telemetry.rpm), now).round() as i32,
                air,
            },
            RunnerMode::Rpm => ThrottleCommand {
                gas: config.target_rpm,
                air,
            },
            RunnerMode::Check => ThrottleCommand {
                gas: percent_to_unit(CHECK_GAS_PERCENT),
                air,
            },
            RunnerMode::FuelPumping => ThrottleCommand {
                gas: percent_to_unit(config.gas_throttle_percent),
                air: AIR_RELEASE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::EngineState;

    fn telemetry(rpm: i32) -> EngineTelemetry {
        EngineTelemetry {
            state: EngineState::StarterRunning,
            rpm,
            updated_at: 100,
            ..EngineTelemetry::disconnected()
        }
    }

    fn config(mode: RunnerMode) -> RunnerConfig {
        RunnerConfig { mode, ..RunnerConfig::default() }
    }

    #[test]
    fn zero_command_outside_a_run() {
        let cfg = config(RunnerMode::Const);
        let mut strat = CommandStrategy::new(&cfg);
        for state in [
            RunnerState::NotConnected,
            RunnerState::Stopped,
            RunnerState::Stopping,
            RunnerState::Fault,
        ] {
            let cmd = strat.get_command(&cfg, state, &telemetry(0), 100);
            assert_eq!(cmd, ThrottleCommand { gas: 0, air: AIR_RELEASE });
        }
    }

    #[test]
    fn regular_modes_crank_while_starting() {
        for mode in [RunnerMode::Const, RunnerMode::Pid, RunnerMode::Rpm] {
            let cfg = config(mode);
            let mut strat = CommandStrategy::new(&cfg);
            let cmd = strat.get_command(&cfg, RunnerState::Starting, &telemetry(0), 100);
            assert_eq!(cmd, ThrottleCommand { gas: CRANK_GAS, air: AIR_OPEN });
        }
    }

    #[test]
    fn const_running_command_scales_percentages() {
        let mut cfg = config(RunnerMode::Const);
        cfg.gas_throttle_percent = 50;
        cfg.air_throttle_percent = 100;
        let mut strat = CommandStrategy::new(&cfg);
        let cmd = strat.get_command(&cfg, RunnerState::Running, &telemetry(3000), 100);
        assert_eq!(cmd.gas, 50 * CMD_MAX / 100);
        assert_eq!(cmd.air, CMD_MAX);
    }

    #[test]
    fn const_running_command_ignores_telemetry() {
        let cfg = config(RunnerMode::Const);
        let mut strat = CommandStrategy::new(&cfg);
        let a = strat.get_command(&cfg, RunnerState::Running, &telemetry(0), 100);
        let b = strat.get_command(&cfg, RunnerState::Running, &telemetry(9000), 200);
        assert_eq!(a, b);
    }

    #[test]
    fn diagnostic_modes_crank_at_running_command() {
        for mode in [RunnerMode::Check, RunnerMode::FuelPumping] {
            let cfg = config(mode);
            let mut strat = CommandStrategy::new(&cfg);
            let starting = strat.get_command(&cfg, RunnerState::Starting, &telemetry(0), 100);
            let running = strat.get_command(&cfg, RunnerState::Running, &telemetry(0), 100);
            assert_eq!(starting, running, "mode {mode:?}");
        }
    }

    #[test]
    fn check_mode_uses_fixed_low_throttle() {
        let mut cfg = config(RunnerMode::Check);
        cfg.gas_throttle_percent = 90; // must be ignored
        let mut strat = CommandStrategy::new(&cfg);
        let cmd = strat.get_command(&cfg, RunnerState::Running, &telemetry(0), 100);
        assert_eq!(cmd.gas, 20 * CMD_MAX / 100);
    }

    #[test]
    fn fuel_pumping_releases_air() {
        let mut cfg = config(RunnerMode::FuelPumping);
        cfg.gas_throttle_percent = 40;
        let mut strat = CommandStrategy::new(&cfg);
        let cmd = strat.get_command(&cfg, RunnerState::Running, &telemetry(0), 100);
        assert_eq!(cmd.gas, 40 * CMD_MAX / 100);
        assert_eq!(cmd.air, AIR_RELEASE);
    }

    #[test]
    fn rpm_mode_forwards_target_unmodified() {
        let mut cfg = config(RunnerMode::Rpm);
        cfg.target_rpm = 5200;
        let mut strat = CommandStrategy::new(&cfg);
        let cmd = strat.get_command(&cfg, RunnerState::Running, &telemetry(100), 100);
        assert_eq!(cmd.gas, 5200);
    }

    #[test]
    fn diagnostic_time_budgets_override_configuration() {
        assert_eq!(RunnerMode::Check.time_budget_secs(600), 12);
        assert_eq!(RunnerMode::FuelPumping.time_budget_secs(600), 30);
        assert_eq!(RunnerMode::Const.time_budget_secs(600), 600);
        assert_eq!(RunnerMode::Pid.time_budget_secs(600), 600);
    }

    #[test]
    fn only_regulated_modes_check_rpm() {
        assert!(RunnerMode::Pid.checks_rpm());
        assert!(RunnerMode::Rpm.checks_rpm());
        assert!(!RunnerMode::Const.checks_rpm());
        assert!(!RunnerMode::Check.checks_rpm());
        assert!(!RunnerMode::FuelPumping.checks_rpm());
    }
}
