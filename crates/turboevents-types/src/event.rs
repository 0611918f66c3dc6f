//! Timestamped events and their payloads.
//!
//! An [`Event`] is a point in wall-clock time plus a [`Payload`]. Inputs
//! create events, the generator orders them, and outputs trigger them when
//! their time comes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The data an event carries.
///
/// Text payloads come from recorded sources (XML files, in-memory
/// containers); integer payloads come from synthetic count-down streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// A text value, printed or published verbatim.
    Text(String),
    /// An integer value.
    Int(i64),
}

impl Payload {
    /// Return the payload as bytes suitable for a raw message body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::Int(value) => value.to_string().into_bytes(),
        }
    }
}

impl core::fmt::Display for Payload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// A payload scheduled for a point in wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the event should be triggered.
    pub time: DateTime<Utc>,
    /// What the event carries.
    pub payload: Payload,
}

impl Event {
    /// Create a new event.
    pub fn new(time: DateTime<Utc>, payload: impl Into<Payload>) -> Self {
        Self {
            time,
            payload: payload.into(),
        }
    }

    /// Return a copy of this event moved in time by `shift`.
    #[must_use]
    pub fn shifted(mut self, shift: chrono::TimeDelta) -> Self {
        self.time = self
            .time
            .checked_add_signed(shift)
            .unwrap_or(self.time);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn payload_display_is_raw_value() {
        assert_eq!(Payload::from("Hello,").to_string(), "Hello,");
        assert_eq!(Payload::from(42_i64).to_string(), "42");
    }

    #[test]
    fn payload_bytes() {
        assert_eq!(Payload::from("abc").to_bytes(), b"abc".to_vec());
        assert_eq!(Payload::Int(-7).to_bytes(), b"-7".to_vec());
    }

    #[test]
    fn event_json_shape() {
        let time = Utc.with_ymd_and_hms(2022, 1, 12, 9, 38, 0).unwrap();
        let event = Event::new(time, "World!");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["type"], "text");
        assert_eq!(json["payload"]["value"], "World!");
        assert_eq!(json["time"], "2022-01-12T09:38:00Z");
    }

    #[test]
    fn shifted_moves_time_only() {
        let time = Utc.with_ymd_and_hms(2022, 1, 12, 9, 38, 0).unwrap();
        let event = Event::new(time, 3_i64).shifted(chrono::TimeDelta::seconds(90));
        assert_eq!(event.time, Utc.with_ymd_and_hms(2022, 1, 12, 9, 39, 30).unwrap());
        assert_eq!(event.payload, Payload::Int(3));
    }
}
