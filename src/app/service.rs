//! The runner orchestrator.
//!
//! [`RunnerService::tick`] is the whole control core, run once per loop
//! period. Each tick, in order:
//!
//! 1. acquire the freshest telemetry (a read failure counts as a
//!    disconnect, never as stale-but-plausible data);
//! 2. force the engine view to `NotConnected` if the snapshot is stale;
//! 3. drain the command mailbox, applying at most one state-affecting
//!    command;
//! 4. evaluate the exceedance monitor and abort the run if it trips,
//!    otherwise advance the state machine on the engine observation;
//! 5. compute and send the throttle command (skipped while disconnected);
//! 6. emit the heartbeat, and a status snapshot at the report period.
//!
//! Nothing in here blocks and nothing in here panics on bad input from
//! the outside world; a tick that cannot make progress logs why and
//! leaves the next tick to try again.

use log::{debug, info, warn};

use crate::app::commands::RunnerCommand;
use crate::app::events::{RunnerEvent, StatusSnapshot};
use crate::app::ports::{EventSink, TransportPort};
use crate::config::RunnerConfig;
use crate::control::CommandStrategy;
use crate::fsm::{RunnerState, RunnerStateMachine};
use crate::mailbox::CommandMailbox;
use crate::safety::ExceedanceMonitor;
use crate::telemetry::{EngineState, EngineTelemetry};

/// What the loop should do after this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Normal pacing.
    Normal,
    /// No engine link this tick; the loop backs off before retrying.
    Disconnected,
}

pub struct RunnerService {
    config: RunnerConfig,
    machine: RunnerStateMachine,
    monitor: ExceedanceMonitor,
    strategy: CommandStrategy,
    /// Epoch seconds when the current run began; 0 when no run is active.
    start_time: u64,
    last_status_at: u64,
    /// Log files named in the end-of-run bundle event.
    log_files: Vec<String>,
}

impl RunnerService {
    pub fn new(config: RunnerConfig) -> Self {
        let strategy = CommandStrategy::new(&config);
        Self {
            config,
            machine: RunnerStateMachine::new(),
            monitor: ExceedanceMonitor::new(),
            strategy,
            start_time: 0,
            last_status_at: 0,
            log_files: Vec::new(),
        }
    }

    /// Names the files announced in the [`RunnerEvent::LogBundle`] emitted
    /// when a run ends.
    pub fn with_log_bundle(mut self, files: Vec<String>) -> Self {
        self.log_files = files;
        self
    }

    pub fn state(&self) -> RunnerState {
        self.machine.state()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one orchestration step at time `now` (epoch seconds).
    pub fn tick(
        &mut self,
        now: u64,
        mailbox: &CommandMailbox,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        // 1. Telemetry. A transport that cannot produce a snapshot is
        // indistinguishable from a dead link.
        let mut telemetry = match transport.latest_telemetry() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("telemetry read failed: {err}");
                EngineTelemetry::disconnected()
            }
        };

        // 2. Staleness wins over whatever the snapshot claims.
        if telemetry.is_stale(now) {
            debug!(
                "telemetry stale ({}s old), treating engine as disconnected",
                now.saturating_sub(telemetry.updated_at)
            );
            telemetry.state = EngineState::NotConnected;
        }

        // 3. Commands. Configuration changes are applied freely; the first
        // start/stop ends the drain so a queued burst cannot make the
        // runner change operating state twice in one tick.
        while let Some(command) = mailbox.take() {
            if self.handle_command(command, now, sink) {
                break;
            }
        }

        // 4. Safety verdict against the pre-update state, then the state
        // advance itself. An abort takes the place of the normal advance.
        let verdict = self
            .monitor
            .check(&telemetry, &self.config, &self.machine, self.start_time, now);
        if verdict.any() && self.machine.state().is_active() {
            let reason = verdict.describe();
            warn!("run aborted: {reason}");
            sink.emit(&RunnerEvent::StopReason(reason));
            self.stop(now, sink);
        } else {
            self.machine.update(telemetry.state, now);
            if self.machine.state() == RunnerState::NotConnected {
                // Whatever run was in flight is unaccounted for; forget it
                // rather than resume against unknown engine history.
                self.machine.reset_run_counters();
                self.start_time = 0;
            }
        }

        // 5. Actuation. Not attempted without a link; a failed send is
        // logged and retried by the next tick's command.
        let outcome = if telemetry.state == EngineState::NotConnected {
            TickOutcome::Disconnected
        } else {
            let command =
                self.strategy
                    .get_command(&self.config, self.machine.state(), &telemetry, now);
            if let Err(err) = transport.send_command(command.gas, command.air) {
                warn!("throttle command not delivered: {err}");
            }
            TickOutcome::Normal
        };

        // 6. Liveness and reporting.
        sink.emit(&RunnerEvent::Heartbeat(self.machine.state()));
        if now.saturating_sub(self.last_status_at) >= self.config.report_period_secs {
            sink.emit(&RunnerEvent::Status(self.status_snapshot(&telemetry, now)));
            self.last_status_at = now;
        }

        outcome
    }

    /// End the current run. Safe to call at any time, any number of times;
    /// repeated calls observe the same state.
    pub fn stop(&mut self, now: u64, sink: &mut impl EventSink) {
        if self.machine.state() != RunnerState::Stopped {
            self.machine.force(RunnerState::Stopping);
        }
        let attempts = self.machine.start_attempts();
        self.machine.reset_run_counters();
        if self.start_time != 0 {
            info!(
                "run ended after {}s, {} start attempt(s)",
                now.saturating_sub(self.start_time),
                attempts
            );
            self.start_time = 0;
            if !self.log_files.is_empty() {
                sink.emit(&RunnerEvent::LogBundle(self.log_files.clone()));
            }
        }
    }

    /// Returns true when the command changed the runner's operating state.
    fn handle_command(
        &mut self,
        command: RunnerCommand,
        now: u64,
        sink: &mut impl EventSink,
    ) -> bool {
        match command {
            RunnerCommand::Start => {
                if self.machine.state() != RunnerState::Stopped {
                    warn!(
                        "start ignored in state {:?}",
                        self.machine.state()
                    );
                    return false;
                }
                info!("starting {:?} run", self.config.mode);
                self.machine.reset_run_counters();
                self.machine.force(RunnerState::Starting);
                self.start_time = now;
                self.strategy.begin_run(&self.config, now);
                true
            }
            RunnerCommand::Stop => {
                info!("stop requested");
                self.stop(now, sink);
                true
            }
            RunnerCommand::Reconfigure { field, value } => {
                match self.config.apply_field(&field, value) {
                    Ok(()) => {
                        info!("config: {field} = {value}");
                        self.resync_strategy(now);
                        sink.emit(&RunnerEvent::ConfigEcho(self.config.clone()));
                    }
                    Err(err) => {
                        warn!("config change rejected ({field} = {value}): {err}");
                    }
                }
                false
            }
            RunnerCommand::UpdateConfig(candidate) => {
                match candidate.validate() {
                    Ok(()) => {
                        info!("configuration replaced");
                        self.config = candidate;
                        self.resync_strategy(now);
                        sink.emit(&RunnerEvent::ConfigEcho(self.config.clone()));
                    }
                    Err(err) => {
                        warn!("configuration replacement rejected: {err}");
                    }
                }
                false
            }
        }
    }

    /// Mid-run gain or setpoint changes rebuild the regulator so stale
    /// integral state cannot leak across configurations.
    fn resync_strategy(&mut self, now: u64) {
        if self.machine.state().is_active() {
            self.strategy.begin_run(&self.config, now);
        }
    }

    fn status_snapshot(&self, telemetry: &EngineTelemetry, now: u64) -> StatusSnapshot {
        let budget = self.config.mode.time_budget_secs(self.config.time_secs);
        let time_remaining_secs = if self.start_time != 0 {
            budget.saturating_sub(now.saturating_sub(self.start_time))
        } else {
            budget
        };
        StatusSnapshot {
            state: self.machine.state(),
            mode: self.config.mode,
            rpm: telemetry.rpm,
            temperature_c: telemetry.temperature_c,
            fuel_volume_percent: telemetry.fuel_volume_percent,
            voltage_in: telemetry.voltage_in,
            vibration: telemetry.vibration,
            engaged_hours: telemetry.engaged_hours,
            start_attempts: self.machine.start_attempts(),
            time_remaining_secs,
        }
    }
}
