//! Wall-clock helpers for scheduling and recorded timestamps.
//!
//! The generator works in UTC internally. Recorded sources (XML exports)
//! carry local timestamps in the `%d-%m-%Y %H:%M:%S` layout, so this module
//! also owns the conversion between that layout and [`DateTime<Utc>`].
//!
//! # Design Principles
//!
//! - Delays are never negative: an event whose time has passed is due now.
//! - Time arithmetic is checked. Shifts that overflow surface as
//!   [`ClockError::Overflow`]; run deadlines saturate instead.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Layout of timestamps in recorded sources and in XML event payloads.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A recorded timestamp did not match [`TIMESTAMP_FORMAT`].
    #[error("could not parse time: '{input}'")]
    Unparseable {
        /// The offending input.
        input: String,
        /// The underlying parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// The timestamp falls in a local-time gap (e.g. a DST transition).
    #[error("local time '{input}' does not exist in the current time zone")]
    NonexistentLocalTime {
        /// The offending input.
        input: String,
    },

    /// A run window was negative, NaN, infinite, or too large.
    #[error("invalid run window: {reason}")]
    InvalidWindow {
        /// Explanation of what is wrong with the window.
        reason: String,
    },

    /// Adding a duration to a timestamp overflowed.
    #[error("time arithmetic overflow")]
    Overflow,
}

/// Parse a recorded local timestamp into UTC.
///
/// Runs of whitespace are collapsed first, so `12-01-2022  9:38:00` and
/// `12-01-2022 09:38:00` denote the same instant. When a local time is
/// ambiguous (clocks turned back), the earlier instant is used.
///
/// # Errors
///
/// Returns [`ClockError::Unparseable`] if the input does not match
/// [`TIMESTAMP_FORMAT`], or [`ClockError::NonexistentLocalTime`] if it falls
/// in a local-time gap.
pub fn parse_local_timestamp(input: &str) -> Result<DateTime<Utc>, ClockError> {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive = NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).map_err(|source| {
        ClockError::Unparseable {
            input: input.to_owned(),
            source,
        }
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ClockError::NonexistentLocalTime {
            input: input.to_owned(),
        })
}

/// Format a UTC instant as a local timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_local_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

/// Return how long to wait from `now` until `target`.
///
/// Targets in the past yield [`Duration::ZERO`].
pub fn delay_until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    target
        .signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Return the shift that moves `first` onto `start`.
pub fn shift_to(start: DateTime<Utc>, first: DateTime<Utc>) -> TimeDelta {
    start.signed_duration_since(first)
}

/// Return `start + window`, or the latest representable instant if the
/// sum does not fit.
pub fn window_deadline(start: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Convert a window expressed in (fractional) seconds into a [`Duration`].
///
/// # Errors
///
/// Returns [`ClockError::InvalidWindow`] for negative, NaN, infinite, or
/// out-of-range values.
pub fn window_from_secs(secs: f64) -> Result<Duration, ClockError> {
    if !secs.is_finite() {
        return Err(ClockError::InvalidWindow {
            reason: format!("{secs} is not a finite number of seconds"),
        });
    }
    if secs < 0.0 {
        return Err(ClockError::InvalidWindow {
            reason: format!("{secs} is negative"),
        });
    }
    Duration::try_from_secs_f64(secs.abs()).map_err(|err| ClockError::InvalidWindow {
        reason: err.to_string(),
    })
}
