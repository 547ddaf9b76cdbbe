//! PID regulator for closed-loop rpm control.
//!
//! Maps measured rpm to a gas-throttle command around the configured
//! setpoint. The control law reproduces the stand's reference behaviour,
//! including its quirks: the output is **not** clamped to the actuator
//! range, and the integral accumulator already carries the `ki` factor.
//! Clamping would change observable behaviour on hardware that has been
//! tuned against the unclamped law, so it is pinned by a test instead of
//! fixed here.

/// PID regulator.
#[derive(Debug, Clone)]
pub struct PidRegulator {
    kp: f64,
    ki: f64,
    kd: f64,
    setpoint: f64,
    integral: f64,
    prev_error: f64,
    prev_time: u64,
}

impl PidRegulator {
    pub fn new(kp: f64, ki: f64, kd: f64, setpoint: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            integral: 0.0,
            prev_error: 0.0,
            prev_time: 0,
        }
    }

    /// Compute the next throttle command for a measurement taken at `now`
    /// (epoch seconds).
    ///
    /// `dt` is the wall-clock gap since the previous call. A zero gap
    /// (two calls within the same second, or an unseeded regulator)
    /// contributes no derivative or integral update.
    pub fn next(&mut self, measured: f64, now: u64) -> f64 {
        let dt = now.saturating_sub(self.prev_time) as f64;
        let error = self.setpoint - measured;

        let derivative = if dt > 0.0 {
            (error - self.prev_error) / dt
        } else {
            0.0
        };
        self.integral += self.ki * error * dt;

        let command = self.setpoint
            + self.kp * error
            + self.kd * derivative
            + self.ki * self.integral;

        self.prev_time = now;
        self.prev_error = error;
        command
    }

    /// Re-seed the regulator at the start of a run.
    /// Clears the accumulators and anchors `dt` at `now`.
    pub fn reset(&mut self, now: u64) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.prev_time = now;
    }
}
