//! Application core - pure domain logic, zero I/O.
//!
//! This module ties the runner state machine, safety monitor, and command
//! strategy into the per-tick orchestration. All interaction with the
//! outside world (CAN transport, message-bus relay, config storage)
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without hardware.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
