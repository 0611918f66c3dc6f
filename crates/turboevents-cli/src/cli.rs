//! Command-line arguments and how they override the configuration file.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use turboevents_core::TurboConfig;
use turboevents_core::config::{CountDownConfig, XmlFileConfig};
use turboevents_core::output::{OutputKind, PrintFormat};

use crate::error::CliError;

/// Inputs used when neither the configuration nor the command line names
/// any.
pub const DEMO_COUNT_DOWNS: [CountDownConfig; 2] = [
    CountDownConfig {
        count: 5,
        interval_ms: 1000,
    },
    CountDownConfig {
        count: 2,
        interval_ms: 1500,
    },
];

/// Replay timestamped events in real time.
#[derive(Debug, Parser)]
#[command(name = "turboevents")]
#[command(version)]
#[command(about = "Replay timestamped events in real time")]
pub struct Args {
    /// XML files to replay, each read with the `--control` string
    #[arg(value_name = "XML_FILES")]
    pub xml_files: Vec<PathBuf>,

    /// Configuration file (default: turboevents.yaml if present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where events go: print or nats
    #[arg(short, long, value_name = "KIND")]
    pub output: Option<OutputKind>,

    /// Print output line format: plain or timestamped
    #[arg(long, value_name = "FORMAT")]
    pub print_format: Option<PrintFormat>,

    /// Control string selecting the streams of every XML file
    #[arg(long, value_name = "STRING")]
    pub control: Option<String>,

    /// Move recorded timestamps so each input starts now
    #[arg(long)]
    pub time_shift: bool,

    /// Stop after this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Add a count-down input (repeatable)
    #[arg(long = "count-down", value_name = "COUNT[:INTERVAL_MS]", value_parser = parse_count_down)]
    pub count_down: Vec<CountDownConfig>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Apply command-line overrides on top of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingControl`] if XML files are given without a
    /// control string, or [`CliError::Config`] if the result is invalid.
    pub fn apply_to(&self, config: &mut TurboConfig) -> Result<(), CliError> {
        if let Some(kind) = self.output {
            config.output.kind = kind;
        }
        if let Some(format) = self.print_format {
            config.output.print_format = format;
        }
        if self.time_shift {
            config.run.time_shift = true;
        }
        if let Some(secs) = self.duration {
            config.run.window_secs = Some(secs);
        }
        if !self.xml_files.is_empty() {
            let control = self
                .control
                .clone()
                .or_else(|| config.inputs.default_control.clone())
                .ok_or(CliError::MissingControl)?;
            config
                .inputs
                .xml_files
                .extend(self.xml_files.iter().map(|path| XmlFileConfig {
                    path: path.clone(),
                    control: control.clone(),
                }));
        }
        config.inputs.count_down.extend(self.count_down.iter().copied());
        config.validate()?;
        Ok(())
    }

    /// The log filter implied by `-v`, if any.
    pub const fn verbosity_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

/// Add the demo inputs when no input is configured. Returns whether it did.
pub fn ensure_inputs(config: &mut TurboConfig) -> bool {
    if config.inputs.is_empty() {
        config.inputs.count_down.extend(DEMO_COUNT_DOWNS);
        true
    } else {
        false
    }
}

/// Parse `COUNT` or `COUNT:INTERVAL_MS`.
fn parse_count_down(value: &str) -> Result<CountDownConfig, String> {
    let (count, interval) = match value.split_once(':') {
        Some((count, interval)) => (count, Some(interval)),
        None => (value, None),
    };
    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid count '{count}': {e}"))?;
    let Some(interval) = interval else {
        return Ok(CountDownConfig::new(count));
    };
    let interval_ms = interval
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid interval '{interval}': {e}"))?;
    if interval_ms == 0 {
        return Err("interval must be positive".to_owned());
    }
    Ok(CountDownConfig { count, interval_ms })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use clap::CommandFactory;
    use turboevents_core::input::DEFAULT_COUNT_DOWN_INTERVAL;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("turboevents").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_defaults() {
        let args = parse(&[]);
        let mut config = TurboConfig::default();
        args.apply_to(&mut config).unwrap();
        assert_eq!(config, TurboConfig::default());
        assert!(args.verbosity_filter().is_none());
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "--output",
            "nats",
            "--print-format",
            "timestamped",
            "--time-shift",
            "--duration",
            "2.5",
            "-vv",
        ]);
        let mut config = TurboConfig::default();
        args.apply_to(&mut config).unwrap();
        assert_eq!(config.output.kind, OutputKind::Nats);
        assert_eq!(config.output.print_format, PrintFormat::Timestamped);
        assert!(config.run.time_shift);
        assert_eq!(config.run.window_secs, Some(2.5));
        assert_eq!(args.verbosity_filter(), Some("trace"));
    }

    #[test]
    fn count_down_is_repeatable() {
        let args = parse(&["--count-down", "5", "--count-down", "2:1500"]);
        assert_eq!(
            args.count_down,
            vec![
                CountDownConfig::new(5),
                CountDownConfig {
                    count: 2,
                    interval_ms: 1500
                },
            ]
        );
        assert_eq!(args.count_down[0].interval(), DEFAULT_COUNT_DOWN_INTERVAL);
    }

    #[test]
    fn bad_count_down_is_rejected() {
        for bad in ["x", "5:", "5:0", "5:-1"] {
            let result = Args::try_parse_from(["turboevents", "--count-down", bad]);
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn unknown_output_is_rejected() {
        assert!(Args::try_parse_from(["turboevents", "--output", "kafka"]).is_err());
    }

    #[test]
    fn xml_files_take_control_string() {
        let args = parse(&["a.xml", "b.xml", "--control", "event:ts:value"]);
        let mut config = TurboConfig::default();
        args.apply_to(&mut config).unwrap();
        assert_eq!(config.inputs.xml_files.len(), 2);
        assert_eq!(config.inputs.xml_files[1].path, PathBuf::from("b.xml"));
        assert_eq!(config.inputs.xml_files[1].control, "event:ts:value");
    }

    #[test]
    fn xml_files_fall_back_to_default_control() {
        let args = parse(&["a.xml"]);
        let mut config = TurboConfig::default();
        config.inputs.default_control = Some("event:ts".to_owned());
        args.apply_to(&mut config).unwrap();
        assert_eq!(config.inputs.xml_files[0].control, "event:ts");
    }

    #[test]
    fn xml_files_without_control_fail() {
        let args = parse(&["a.xml"]);
        let mut config = TurboConfig::default();
        let err = args.apply_to(&mut config).unwrap_err();
        assert!(matches!(err, CliError::MissingControl));
    }

    #[test]
    fn negative_duration_is_invalid() {
        let args = parse(&["--duration=-1"]);
        let mut config = TurboConfig::default();
        assert!(matches!(
            args.apply_to(&mut config).unwrap_err(),
            CliError::Config { .. }
        ));
    }

    #[test]
    fn demo_inputs_only_when_nothing_configured() {
        let mut config = TurboConfig::default();
        assert!(ensure_inputs(&mut config));
        assert_eq!(config.inputs.count_down, DEMO_COUNT_DOWNS.to_vec());
        assert!(!ensure_inputs(&mut config));
        assert_eq!(config.inputs.count_down.len(), 2);
    }
}
