//! `turboevents` binary: replays timestamped events in real time.
//!
//! Loads configuration, registers the configured inputs and output, and
//! runs the generator until the inputs drain, the run window elapses, or
//! Ctrl-C is pressed.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments and load configuration from `turboevents.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Register inputs (XML files, count-downs, or the demo streams)
//! 4. Register the output (print or NATS)
//! 5. Install the Ctrl-C handler
//! 6. Run
//! 7. Drain the NATS publisher, if any
//!
//! ## Usage
//!
//! ```bash
//! # Two demo count-down streams printed to stdout
//! turboevents
//!
//! # Replay an XML export, shifted to start now, for at most 30 seconds
//! turboevents --time-shift --duration 30 \
//!     --control "patient:id/glucose_level/event:ts:value" data/559-ws-training.xml
//!
//! # Publish to NATS instead of printing
//! NATS_URL=nats://broker:4222 turboevents --output nats --count-down 10:500
//! ```

mod cli;
mod error;

use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use turboevents_core::config::{LogFormat, LoggingConfig};
use turboevents_core::output::{OutputKind, PrintOutput};
use turboevents_core::{EventBatcher, TurboConfig};
use turboevents_nats::{NatsOutput, NatsPublisher};

use crate::cli::Args;
use crate::error::CliError;

/// Configuration file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "turboevents.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, input registration, the output
/// connection, or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments and load configuration.
    let args = Args::parse();
    let (mut config, config_path) = load_config(args.config.as_deref())?;
    args.apply_to(&mut config)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging, args.verbosity_filter());
    info!("turboevents starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Register inputs.
    if cli::ensure_inputs(&mut config) {
        info!("No inputs configured, replaying demo count-downs");
    }
    let mut batcher = EventBatcher::new(config.run.time_shift);
    for file in &config.inputs.xml_files {
        batcher
            .create_xml_file_input(&file.path, &file.control)
            .map_err(CliError::from)?;
    }
    for count_down in &config.inputs.count_down {
        batcher.create_count_down_input(count_down.count, count_down.interval());
    }
    info!(
        inputs = ?batcher.input_names(),
        time_shift = config.run.time_shift,
        window_secs = config.run.window_secs,
        "Inputs registered"
    );

    // 4. Register the output.
    let publisher = register_output(&mut batcher, &config).await?;
    info!(output = %config.output.kind, "Output registered");

    // 5. Stop cleanly on Ctrl-C.
    let control = batcher.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping run");
            control.request_stop();
        }
    });

    // 6. Run.
    let window = config.run.window().map_err(CliError::from)?;
    let summary = match window {
        Some(window) => batcher.run(window).await,
        None => batcher.run_to_completion().await,
    }
    .map_err(CliError::from)?;

    // 7. Drain the NATS publisher; it stops once the batcher drops its output.
    drop(batcher);
    if let Some(publisher) = publisher {
        let stats = publisher.shutdown().await.map_err(CliError::from)?;
        if stats.failed > 0 {
            warn!(failed = stats.failed, "some events were not published");
        }
    }

    info!(
        run_id = %summary.run_id,
        end_reason = ?summary.end_reason,
        triggered = summary.triggered,
        "turboevents shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, or from `turboevents.yaml` if it exists.
///
/// Returns the configuration and the file it was read from.
fn load_config(path: Option<&Path>) -> Result<(TurboConfig, Option<PathBuf>), CliError> {
    if let Some(path) = path {
        return Ok((TurboConfig::from_file(path)?, Some(path.to_path_buf())));
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        Ok((TurboConfig::from_file(default_path)?, Some(default_path.to_path_buf())))
    } else {
        let mut config = TurboConfig::default();
        config.nats.apply_env_overrides(|key| std::env::var(key).ok());
        Ok((config, None))
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `-v` wins over both.
fn init_logging(logging: &LoggingConfig, verbosity: Option<&str>) {
    let filter = match verbosity {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str())),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Register the configured output on `batcher`.
///
/// Returns the NATS publisher handle when the output is NATS.
async fn register_output(
    batcher: &mut EventBatcher,
    config: &TurboConfig,
) -> Result<Option<NatsPublisher>, CliError> {
    match config.output.kind {
        OutputKind::Print => {
            batcher.add_output(Box::new(PrintOutput::new(
                io::stdout(),
                config.output.print_format,
            )));
            Ok(None)
        }
        OutputKind::Nats => {
            let (output, publisher) = NatsOutput::connect(&config.nats).await?;
            batcher.add_output(Box::new(output));
            Ok(Some(publisher))
        }
    }
}
