//! Port traits - the seams between the control core and the world.
//!
//! Adapters implement these. The core never names a concrete transport,
//! relay, or storage backend; swapping the CAN link for a simulated
//! engine, or the message bus for a plain logger, is an adapter concern.

use std::fmt;

use crate::app::events::RunnerEvent;
use crate::telemetry::EngineTelemetry;

// ═══════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════

/// Failures at the engine transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No link to the engine controller.
    NotConnected,
    /// The link is up but the write was rejected or timed out.
    SendFailed(String),
    /// A frame arrived but could not be decoded.
    Malformed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "engine transport not connected"),
            Self::SendFailed(why) => write!(f, "command send failed: {why}"),
            Self::Malformed(why) => write!(f, "malformed engine frame: {why}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Failures at the configuration storage boundary.
#[derive(Debug)]
pub enum ConfigError {
    /// No stored configuration exists yet.
    NotFound,
    /// Stored bytes exist but do not parse as a configuration.
    Corrupted(String),
    /// Underlying storage I/O failed.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored configuration"),
            Self::Corrupted(why) => write!(f, "stored configuration is corrupted: {why}"),
            Self::Io(err) => write!(f, "configuration storage i/o: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Ports
// ═══════════════════════════════════════════════════════════════════════════

/// Engine transport: telemetry in, throttle commands out.
pub trait TransportPort {
    /// The freshest telemetry snapshot the transport holds. Implementations
    /// return a snapshot stamped with its acquisition time; the core judges
    /// staleness itself.
    fn latest_telemetry(&mut self) -> Result<EngineTelemetry, TransportError>;

    /// Send a throttle command pair (gas, air) in controller units.
    fn send_command(&mut self, gas: i32, air: i32) -> Result<(), TransportError>;

    /// Whether the link is currently believed up.
    fn is_connected(&self) -> bool;
}

/// Outbound event sink. Emission is fire-and-forget; a sink that cannot
/// deliver must swallow the event, not stall the tick.
pub trait EventSink {
    fn emit(&mut self, event: &RunnerEvent);
}

/// Configuration storage.
pub trait ConfigPort {
    fn load(&self) -> Result<crate::config::RunnerConfig, ConfigError>;
    fn save(&self, config: &crate::config::RunnerConfig) -> Result<(), ConfigError>;
}
