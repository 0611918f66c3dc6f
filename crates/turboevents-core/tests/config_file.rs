//! Loading `turboevents.yaml` from disk.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use turboevents_core::config::LogFormat;
use turboevents_core::output::PrintFormat;
use turboevents_core::{ConfigError, OutputKind, TurboConfig};

#[test]
fn loads_yaml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "output:\n  kind: print\n  print_format: timestamped\nlogging:\n  format: json\ninputs:\n  count_down:\n    - count: 3\n      interval_ms: 250\n"
    )
    .unwrap();

    let config = TurboConfig::from_file(file.path()).unwrap();
    assert_eq!(config.output.kind, OutputKind::Print);
    assert_eq!(config.output.print_format, PrintFormat::Timestamped);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.inputs.count_down.len(), 1);
}

#[test]
fn missing_file_is_io_error() {
    let err = TurboConfig::from_file(Path::new("/nonexistent/turboevents.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_yaml_is_yaml_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "run: [unterminated").unwrap();
    let err = TurboConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));
}
