//! Runner configuration parameters.
//!
//! All tunable parameters for a supervised break-in run. Values are loaded
//! from a config file at startup and may be changed at runtime through the
//! `Reconfigure` command; every numeric field carries a declared min/max
//! and a rejected update leaves the configuration untouched.

use serde::{Deserialize, Serialize};

use crate::control::RunnerMode;

/// Core runner configuration.
///
/// Immutable within a tick; replaced atomically when a reconfiguration is
/// accepted. Every numeric bound below is a hard ceiling/floor - the
/// safety monitor applies no hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    // --- Run ---
    /// Throttle-control policy for the run.
    pub mode: RunnerMode,
    /// Target crankshaft speed (rpm) for `Pid` and `Rpm` modes.
    pub target_rpm: i32,
    /// Total run time budget (seconds).
    pub time_secs: u64,

    // --- Constant-throttle mode ---
    /// Gas throttle (0-100%) for `Const` and `FuelPumping` modes.
    pub gas_throttle_percent: u8,
    /// Air throttle (0-100%) applied while running.
    pub air_throttle_percent: u8,

    // --- PID gains ---
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    // --- Reporting ---
    /// Full status snapshot period (seconds).
    pub report_period_secs: u64,

    // --- Safety limits ---
    /// Maximum oil/coolant temperature (°C).
    pub max_temperature_c: f32,
    /// Maximum vibration magnitude (checked only when instrumented).
    pub max_vibration: f32,
    /// Minimum remaining fuel (% of tank).
    pub min_fuel_percent: f32,
    /// Minimum supply voltage (V).
    pub min_vin_voltage: f32,
    /// Maximum allowed starter attempts per run.
    pub max_start_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: RunnerMode::Const,
            target_rpm: 4500,
            time_secs: 600,

            gas_throttle_percent: 30,
            air_throttle_percent: 50,

            kp: 0.2,
            ki: 0.0,
            kd: 0.0,

            report_period_secs: 10,

            max_temperature_c: 190.0,
            max_vibration: 100.0,
            min_fuel_percent: 5.0,
            min_vin_voltage: 40.0,
            max_start_attempts: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Field-level reconfiguration
// ---------------------------------------------------------------------------

/// Declared range for one remotely-settable numeric field.
struct FieldLimit {
    name: &'static str,
    min: f64,
    max: f64,
}

/// Min/max table for every field the `Reconfigure` command may touch.
/// A value outside its range is rejected before anything is mutated.
const FIELD_LIMITS: &[FieldLimit] = &[
    FieldLimit { name: "target_rpm", min: 0.0, max: 10_000.0 },
    FieldLimit { name: "time_secs", min: 0.0, max: 24.0 * 3600.0 },
    FieldLimit { name: "gas_throttle_percent", min: 0.0, max: 100.0 },
    FieldLimit { name: "air_throttle_percent", min: 0.0, max: 100.0 },
    FieldLimit { name: "kp", min: 0.0, max: 100.0 },
    FieldLimit { name: "ki", min: 0.0, max: 100.0 },
    FieldLimit { name: "kd", min: 0.0, max: 100.0 },
    FieldLimit { name: "report_period_secs", min: 1.0, max: 3600.0 },
    FieldLimit { name: "max_temperature_c", min: 0.0, max: 250.0 },
    FieldLimit { name: "max_vibration", min: 0.0, max: 1000.0 },
    FieldLimit { name: "min_fuel_percent", min: 0.0, max: 100.0 },
    FieldLimit { name: "min_vin_voltage", min: 0.0, max: 100.0 },
    FieldLimit { name: "max_start_attempts", min: 0.0, max: 100.0 },
];

/// Why a field update was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// The field name is not remotely settable (or does not exist).
    UnknownField,
    /// The value lies outside the field's declared min/max.
    OutOfRange,
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownField => write!(f, "unknown field"),
            Self::OutOfRange => write!(f, "value out of range"),
        }
    }
}

impl RunnerConfig {
    /// Validate and apply a single numeric field update.
    ///
    /// On rejection the configuration is left exactly as it was.
    pub fn apply_field(&mut self, name: &str, value: f64) -> Result<(), FieldError> {
        let limit = FIELD_LIMITS
            .iter()
            .find(|l| l.name == name)
            .ok_or(FieldError::UnknownField)?;
        if !value.is_finite() || value < limit.min || value > limit.max {
            return Err(FieldError::OutOfRange);
        }

        match name {
            "target_rpm" => self.target_rpm = value as i32,
            "time_secs" => self.time_secs = value as u64,
            "gas_throttle_percent" => self.gas_throttle_percent = value as u8,
            "air_throttle_percent" => self.air_throttle_percent = value as u8,
            "kp" => self.kp = value,
            "ki" => self.ki = value,
            "kd" => self.kd = value,
            "report_period_secs" => self.report_period_secs = value as u64,
            "max_temperature_c" => self.max_temperature_c = value as f32,
            "max_vibration" => self.max_vibration = value as f32,
            "min_fuel_percent" => self.min_fuel_percent = value as f32,
            "min_vin_voltage" => self.min_vin_voltage = value as f32,
            "max_start_attempts" => self.max_start_attempts = value as u32,
            _ => unreachable!("field present in FIELD_LIMITS but not applied"),
        }
        Ok(())
    }

    /// Whole-config sanity check, used before a full `UpdateConfig` replace.
    pub fn validate(&self) -> Result<(), FieldError> {
        let numeric: &[(&str, f64)] = &[
            ("target_rpm", f64::from(self.target_rpm)),
            ("time_secs", self.time_secs as f64),
            ("gas_throttle_percent", f64::from(self.gas_throttle_percent)),
            ("air_throttle_percent", f64::from(self.air_throttle_percent)),
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("report_period_secs", self.report_period_secs as f64),
            ("max_temperature_c", f64::from(self.max_temperature_c)),
            ("max_vibration", f64::from(self.max_vibration)),
            ("min_fuel_percent", f64::from(self.min_fuel_percent)),
            ("min_vin_voltage", f64::from(self.min_vin_voltage)),
            ("max_start_attempts", f64::from(self.max_start_attempts)),
        ];
        for (name, value) in numeric {
            let limit = FIELD_LIMITS
                .iter()
                .find(|l| l.name == *name)
                .ok_or(FieldError::UnknownField)?;
            if !value.is_finite() || *value < limit.min || *value > limit.max {
                return Err(FieldError::OutOfRange);
            }
        }
        Ok(())
    }
}
