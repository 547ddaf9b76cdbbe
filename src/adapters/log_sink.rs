//! Event sink that renders runner events as log lines.
//!
//! The production deployment publishes events to the message-bus relay;
//! this sink is the fallback and the bench default. Heartbeats go out at
//! tick rate, so they log at debug to keep info-level output readable.

use log::{debug, info, warn};

use crate::app::events::RunnerEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &RunnerEvent) {
        match event {
            RunnerEvent::Heartbeat(state) => debug!("heartbeat: {state:?}"),
            RunnerEvent::Status(snapshot) => match serde_json::to_string(snapshot) {
                Ok(json) => info!("status: {json}"),
                Err(err) => warn!("status not serializable: {err}"),
            },
            RunnerEvent::StopReason(reason) => warn!("stop reason: {reason}"),
            RunnerEvent::LogBundle(files) => info!("log bundle: {}", files.join(", ")),
            RunnerEvent::ConfigEcho(config) => match serde_json::to_string(config) {
                Ok(json) => info!("config now: {json}"),
                Err(err) => warn!("config not serializable: {err}"),
            },
        }
    }
}
