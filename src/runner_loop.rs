//! The blocking tick loop around [`RunnerService`].
//!
//! Policy: the loop never dies. A panic inside a tick is caught, logged,
//! and followed by the next tick; a disconnected engine stretches the
//! pacing to the backoff interval instead of spinning. The loop only
//! returns when the shutdown flag is raised or, if configured, once a
//! run has been observed and the runner is back in `Stopped`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{error, info};

use crate::app::ports::{EventSink, TransportPort};
use crate::app::service::{RunnerService, TickOutcome};
use crate::fsm::RunnerState;
use crate::mailbox::CommandMailbox;

/// Pacing knobs for the loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    /// Nominal tick period while connected.
    pub tick_period: Duration,
    /// Pause between retries while the engine link is down.
    pub disconnect_backoff: Duration,
    /// Return once a run has happened and the runner settles in `Stopped`.
    /// Off for service deployments, on for one-shot invocations.
    pub exit_when_stopped: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(200),
            disconnect_backoff: Duration::from_secs(1),
            exit_when_stopped: false,
        }
    }
}

pub struct RunnerLoop {
    service: RunnerService,
    options: LoopOptions,
}

impl RunnerLoop {
    pub fn new(service: RunnerService, options: LoopOptions) -> Self {
        Self { service, options }
    }

    /// Run until shutdown, ticking on the wall clock.
    pub fn run(
        &mut self,
        mailbox: &CommandMailbox,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
        shutdown: &AtomicBool,
    ) {
        self.run_with_clock(&mut epoch_secs, mailbox, transport, sink, shutdown);
    }

    /// Same loop with an injectable clock (epoch seconds).
    pub fn run_with_clock(
        &mut self,
        clock: &mut impl FnMut() -> u64,
        mailbox: &CommandMailbox,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
        shutdown: &AtomicBool,
    ) {
        let mut saw_run = false;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("shutdown requested");
                break;
            }

            let now = clock();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.service.tick(now, mailbox, transport, sink)
            }));

            let pause = match outcome {
                Ok(TickOutcome::Normal) => self.options.tick_period,
                Ok(TickOutcome::Disconnected) => self.options.disconnect_backoff,
                Err(payload) => {
                    error!("tick panicked: {}", panic_message(&payload));
                    self.options.tick_period
                }
            };

            if self.service.state().is_active() {
                saw_run = true;
            }
            if self.options.exit_when_stopped
                && saw_run
                && self.service.state() == RunnerState::Stopped
            {
                info!("run complete");
                break;
            }

            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        // Exit path always leaves the engine commanded down and the run
        // bookkeeping flushed, whatever state the loop stopped in.
        self.service.stop(clock(), sink);
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
