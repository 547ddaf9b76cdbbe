//! Concrete implementations of the application ports.
//!
//! Everything here is host-side plumbing: a logging event sink, a JSON
//! file configuration store, and a simulated engine transport for
//! running the control core without hardware on the bench.

pub mod file_config;
pub mod log_sink;
pub mod sim;
