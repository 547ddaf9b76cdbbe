//! Engine break-in runner control core.
//!
//! Supervises automated break-in runs of a small combustion engine over
//! a telemetry/command link: a debounced state machine tracks what the
//! engine is actually doing, an exceedance monitor aborts runs that
//! leave their safety envelope, and per-mode command strategies decide
//! the throttle pair sent each tick.
//!
//! The crate is built hexagonally. Everything under [`app`], [`fsm`],
//! [`safety`] and [`control`] is pure logic driven by a single
//! [`app::service::RunnerService::tick`] call; the outside world comes
//! in through the port traits in [`app::ports`], with host-side
//! implementations under [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod fsm;
pub mod mailbox;
pub mod runner_loop;
pub mod safety;
pub mod telemetry;
