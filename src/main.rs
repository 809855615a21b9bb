// proc-power-sampler - version 0.1.0
// Per-process power usage sampler with tracing logging
use clap::{CommandFactory, Parser, ValueEnum};
use proc_power_sampler::config::{
    load_or_heal, validate_effective_config, Config, ConfigFormat, DEFAULT_CONFIG_FILE,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

mod cli;
mod commands;
mod handlers;
mod metrics;
mod state;

use cli::{Args, Commands, LogLevel};
use commands::top::TopOptions;

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(level: &LogLevel) {
    let log_level = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    // stdout is reserved for command output (tables, JSON).
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Logging initialized with level: {:?}", level);
}

fn config_path(args: &Args) -> PathBuf {
    args.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Log level: --log-level > `log_level` in the settings file > info.
/// The file is only peeked here; healing happens later with logging active.
fn effective_log_level(args: &Args) -> LogLevel {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    if args.no_config {
        return LogLevel::Info;
    }
    let path = config_path(args);
    fs::read_to_string(&path)
        .ok()
        .and_then(|content| Config::from_str_as(&content, ConfigFormat::from_path(&path)).ok())
        .and_then(|config| config.log_level)
        .and_then(|name| LogLevel::from_str(&name, true).ok())
        .unwrap_or(LogLevel::Info)
}

/// Resolves configuration: CLI (if provided) > config file > default.
fn resolve_config(args: &Args) -> Config {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_or_heal(&config_path(args))
    };

    if let Some(Commands::Run {
        bind,
        port,
        max_records,
        interval_secs,
        source,
        source_file,
    }) = &args.command
    {
        if let Some(bind_ip) = bind {
            config.bind = Some(bind_ip.to_string());
        }
        if port.is_some() {
            config.port = *port;
        }
        if max_records.is_some() {
            config.max_records = *max_records;
        }
        if interval_secs.is_some() {
            config.interval_secs = *interval_secs;
        }
        if source.is_some() {
            config.source = *source;
        }
        if source_file.is_some() {
            config.source_file = source_file.clone();
        }
    }

    config
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&effective_log_level(&args));

    // Commands that don't need a settings file
    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => return commands::command_config(output.clone(), *format, *commented),
        Some(Commands::GenerateTestdata {
            output,
            processes,
            format,
        }) => return commands::command_generate_testdata(output.clone(), *processes, *format),
        _ => {}
    }

    let config = resolve_config(&args);

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {:#}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        println!("{}", config.to_string_as(args.config_format)?);
        return Ok(());
    }

    let Some(command) = args.command else {
        eprintln!("{}", Args::command().render_help());
        std::process::exit(1);
    };

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }

    match command {
        Commands::Run { .. } => commands::command_run(config).await,
        Commands::Top {
            duration,
            limit,
            server,
            json,
            no_color,
        } => {
            let opts = TopOptions {
                window: duration,
                limit,
                server,
                json,
                no_color,
            };
            commands::command_top(&config, opts).await
        }
        Commands::Check { verbose } => commands::command_check(&config, verbose).await,
        Commands::Config { .. } | Commands::GenerateTestdata { .. } => Ok(()),
    }
}
