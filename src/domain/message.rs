use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::clock::timestamp_format;

/// One simulated household consumption sample, in watts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<FixedOffset>,
    pub value: u32,
}

/// Marker carried in the `value` field of the end-of-stream message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopMarker {
    #[serde(rename = "STOP")]
    Stop,
}

/// A message on the meter queue.
///
/// Readings travel as `{"timestamp": "...", "value": 1234}`; the producer ends
/// the stream with the sentinel `{"value": "STOP"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueMessage {
    Reading(Reading),
    Stop { value: StopMarker },
}

impl QueueMessage {
    pub fn stop() -> Self {
        QueueMessage::Stop {
            value: StopMarker::Stop,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, QueueMessage::Stop { .. })
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

impl From<Reading> for QueueMessage {
    fn from(reading: Reading) -> Self {
        QueueMessage::Reading(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_timestamp;

    #[test]
    fn test_reading_wire_format() {
        let msg = QueueMessage::from(Reading {
            timestamp: parse_timestamp("2017-04-22 00:00:03+02:00").unwrap(),
            value: 4521,
        });
        assert_eq!(
            msg.encode().unwrap(),
            r#"{"timestamp":"2017-04-22 00:00:03+02:00","value":4521}"#
        );
    }

    #[test]
    fn test_stop_wire_format() {
        assert_eq!(QueueMessage::stop().encode().unwrap(), r#"{"value":"STOP"}"#);
    }

    #[test]
    fn test_decode_sentinel() {
        let msg = QueueMessage::decode(r#"{"value": "STOP"}"#).unwrap();
        assert!(msg.is_stop());
    }

    #[test]
    fn test_decode_reading() {
        let msg =
            QueueMessage::decode(r#"{"timestamp": "2017-04-22 10:00:00+02:00", "value": 17}"#)
                .unwrap();
        match msg {
            QueueMessage::Reading(r) => {
                assert_eq!(r.value, 17);
                assert_eq!(r.timestamp, parse_timestamp("2017-04-22 10:00:00+02:00").unwrap());
            }
            other => panic!("expected reading, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(QueueMessage::decode(r#"{"value": "HALT"}"#).is_err());
        assert!(QueueMessage::decode(r#"{"timestamp": "yesterday", "value": 1}"#).is_err());
        assert!(QueueMessage::decode("not json").is_err());
    }
}
