// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use clap::Parser;
use r3bl_fanout::{CLIArg, CompletionData, CompletionSnapshot, ConfigError, Console,
                  FanoutState, InputBridge, LaunchConfig, LogFile, PtyShellSpawner, Reactor,
                  RuntimeOptions, SavedStdinAttributes, SessionRegistry, TracingConfig,
                  get_terminal_size, setup_default_miette_global_report_handler,
                  try_initialize_logging_global};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const ISSUES_URL: &str = "https://github.com/r3bl-org/r3bl-open-core/issues/new";

const HISTORY_FILE_NAME: &str = ".fanout_history";

fn main() -> miette::Result<()> {
    setup_default_miette_global_report_handler(ISSUES_URL);

    let cli_arg = CLIArg::parse();
    let config = LaunchConfig::try_from_cli(cli_arg)?;
    try_initialize_logging_global(&TracingConfig::new(config.trace_log.clone()))?;
    tracing::debug!(
        message = "Start logging...",
        nr_hosts = config.hosts.len(),
        interactive = config.interactive
    );

    let saved_attributes = SavedStdinAttributes::capture();
    let result = run(&config);
    saved_attributes.restore()?;
    let code = result?;

    tracing::debug!(message = "Stop logging...", code);
    std::process::exit(code);
}

/// Starts a shell per host and runs the reactor until it exits. Returns the exit code.
fn run(config: &LaunchConfig) -> miette::Result<i32> {
    let mut console = Console::stdout(config.interactive);
    if let Some(path) = &config.log_file {
        let log_file = LogFile::open_append(path).map_err(|source| ConfigError::LogFile {
            path: path.clone(),
            source,
        })?;
        console.set_log_file(Some(log_file));
    }

    let spawner = PtyShellSpawner::new(config.ssh_builder.clone());
    let registry = SessionRegistry::new(Box::new(spawner), get_terminal_size());
    let options = RuntimeOptions::from_launch_config(config);
    let mut state = FanoutState::new(registry, console, options);

    let mut reactor = Reactor::setup()?;
    state
        .registry
        .create(&config.hosts, &mut state.console, &mut state.options);

    if config.interactive {
        let completion = CompletionSnapshot::new(CompletionData::with_path_commands());
        let history_path = dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME));
        let bridge = InputBridge::spawn(reactor.waker(), completion, history_path)?;
        state.console.attach_input_bridge(bridge);
    }

    let code = reactor.run(&mut state);

    state.registry.kill_all();
    if let Some(bridge) = state.console.take_input_bridge() {
        bridge.shutdown();
    }
    Ok(code)
}
