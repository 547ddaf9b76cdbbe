//! Bench entry point: runs the control core against the simulated
//! engine. Pass a config file path as the first argument to use a stored
//! configuration; otherwise defaults are used and written next to the
//! binary for editing.

use std::sync::atomic::AtomicBool;

use anyhow::Context;
use log::info;

use engine_runner::adapters::file_config::FileConfigAdapter;
use engine_runner::adapters::log_sink::LogEventSink;
use engine_runner::adapters::sim::SimEngineTransport;
use engine_runner::app::commands::RunnerCommand;
use engine_runner::app::ports::{ConfigError, ConfigPort};
use engine_runner::app::service::RunnerService;
use engine_runner::config::RunnerConfig;
use engine_runner::mailbox::CommandMailbox;
use engine_runner::runner_loop::{LoopOptions, RunnerLoop};

fn main() -> anyhow::Result<()> {
    // The library logs through the `log` facade; the subscriber's log
    // bridge picks those records up.
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    info!("engine break-in runner, simulated bench");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "runner.json".to_string());
    let store = FileConfigAdapter::new(&config_path);
    let config = match store.load() {
        Ok(config) => config,
        Err(ConfigError::NotFound) => {
            let defaults = RunnerConfig::default();
            store
                .save(&defaults)
                .with_context(|| format!("writing default config to {config_path}"))?;
            info!("no stored config, wrote defaults to {config_path}");
            defaults
        }
        Err(err) => return Err(err).context(format!("loading {config_path}")),
    };
    info!("mode: {:?}, run budget: {}s", config.mode, config.time_secs);

    let mailbox = CommandMailbox::new();
    if let Err(command) = mailbox.post(RunnerCommand::Start) {
        anyhow::bail!("mailbox rejected {command:?}");
    }

    let service =
        RunnerService::new(config).with_log_bundle(vec!["runner.log".to_string()]);
    let mut transport = SimEngineTransport::with_catch_after(1);
    let mut sink = LogEventSink::new();

    // The bench run ends on its own when the runner settles back in
    // Stopped, so no external shutdown signal is wired here.
    let shutdown = AtomicBool::new(false);
    let options = LoopOptions {
        exit_when_stopped: true,
        ..LoopOptions::default()
    };
    RunnerLoop::new(service, options).run(&mailbox, &mut transport, &mut sink, &shutdown);

    info!("bench run finished");
    Ok(())
}
