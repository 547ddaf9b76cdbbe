//! Simulated engine transport.
//!
//! A small physical caricature of the engine controller, good enough to
//! exercise every runner state on the bench: the starter cranks in
//! cycles with rest pauses, the engine catches after a configurable
//! number of cycles, rpm chases the commanded throttle, fuel burns down
//! and the block heats up while turning.

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::app::ports::{TransportError, TransportPort};
use crate::control::CMD_MAX;
use crate::telemetry::{EngineState, EngineTelemetry};

const TANK_CAPACITY_L: f64 = 10.0;
const CRANK_SECS: u64 = 6;
const REST_SECS: u64 = 5;
/// Fuel burn while the engine is turning, litres per second.
const BURN_L_PER_SEC: f64 = 0.002;
/// Top rpm at full throttle.
const MAX_RPM: f64 = 6000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimPhase {
    Off,
    /// Starter powered, engine not yet caught.
    Cranking { since: u64, cycle: u32 },
    /// Starter resting between cranks.
    Resting { since: u64, cycle: u32 },
    /// Engine turning under its own power.
    Caught,
}

pub struct SimEngineTransport {
    phase: SimPhase,
    rpm: f64,
    temperature_c: f64,
    fuel_l: f64,
    engaged_hours: f64,
    gas: i32,
    air: i32,
    /// How many crank cycles fail before the engine catches.
    cycles_until_catch: u32,
    last_step: u64,
}

impl SimEngineTransport {
    pub fn new() -> Self {
        Self::with_catch_after(1)
    }

    /// `cycles_until_catch` failed crank cycles happen before the engine
    /// catches, so attempt counting can be watched on the bench.
    pub fn with_catch_after(cycles_until_catch: u32) -> Self {
        Self {
            phase: SimPhase::Off,
            rpm: 0.0,
            temperature_c: 25.0,
            fuel_l: TANK_CAPACITY_L * 0.8,
            engaged_hours: 0.0,
            gas: 0,
            air: 0,
            cycles_until_catch,
            last_step: 0,
        }
    }

    /// Advance the model to time `now` (epoch seconds).
    pub fn step(&mut self, now: u64) {
        let dt = now.saturating_sub(self.last_step).min(10) as f64;
        self.last_step = now;

        if self.gas <= 0 {
            // Throttle released: spin down wherever we were.
            self.rpm *= 0.5_f64.powf(dt);
            if self.rpm < 50.0 {
                self.rpm = 0.0;
                self.phase = SimPhase::Off;
            } else if self.phase != SimPhase::Off {
                self.phase = SimPhase::Caught;
            }
        } else {
            match self.phase {
                SimPhase::Off => {
                    debug!("sim: crank cycle 0 begins");
                    self.phase = SimPhase::Cranking { since: now, cycle: 0 };
                }
                SimPhase::Cranking { since, cycle } => {
                    self.rpm = 300.0;
                    if now.saturating_sub(since) >= CRANK_SECS {
                        if cycle < self.cycles_until_catch {
                            debug!("sim: crank cycle {cycle} failed, resting");
                            self.phase = SimPhase::Resting { since: now, cycle };
                        } else {
                            debug!("sim: engine caught");
                            self.phase = SimPhase::Caught;
                        }
                    }
                }
                SimPhase::Resting { since, cycle } => {
                    self.rpm = 0.0;
                    if now.saturating_sub(since) >= REST_SECS {
                        self.phase = SimPhase::Cranking {
                            since: now,
                            cycle: cycle + 1,
                        };
                    }
                }
                SimPhase::Caught => {}
            }
        }

        if self.phase == SimPhase::Caught {
            let target = MAX_RPM * f64::from(self.gas.clamp(0, CMD_MAX)) / f64::from(CMD_MAX);
            self.rpm += (target - self.rpm) * (1.0 - 0.7_f64.powf(dt));
        }

        let turning = self.rpm > 0.0;
        if turning {
            self.fuel_l = (self.fuel_l - BURN_L_PER_SEC * dt).max(0.0);
            self.engaged_hours += dt / 3600.0;
        }
        // Block temperature chases an rpm-dependent equilibrium.
        let ambient = 25.0 + self.rpm / 40.0;
        self.temperature_c += (ambient - self.temperature_c) * (1.0 - 0.9_f64.powf(dt));
    }

    fn engine_state(&self) -> EngineState {
        match self.phase {
            SimPhase::Off => EngineState::Stopped,
            // A caught engine still reports through the starter channel;
            // sustained running is what the runner's debounce detects.
            SimPhase::Cranking { .. } | SimPhase::Caught => EngineState::StarterRunning,
            SimPhase::Resting { .. } => EngineState::StarterWaiting,
        }
    }

    fn snapshot(&self, now: u64) -> EngineTelemetry {
        EngineTelemetry {
            state: self.engine_state(),
            rpm: self.rpm.round() as i32,
            temperature_c: self.temperature_c as f32,
            fuel_volume_l: self.fuel_l as f32,
            fuel_volume_percent: (self.fuel_l / TANK_CAPACITY_L * 100.0) as f32,
            gas_throttle: self.gas,
            air_throttle: self.air,
            voltage_in: 50.4,
            vibration: (self.rpm / 100.0) as f32,
            vibration_supported: true,
            engaged_hours: self.engaged_hours as f32,
            updated_at: now,
        }
    }
}

impl Default for SimEngineTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportPort for SimEngineTransport {
    fn latest_telemetry(&mut self) -> Result<EngineTelemetry, TransportError> {
        let now = epoch_secs();
        self.step(now);
        Ok(self.snapshot(now))
    }

    fn send_command(&mut self, gas: i32, air: i32) -> Result<(), TransportError> {
        self.gas = gas;
        self.air = air;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
