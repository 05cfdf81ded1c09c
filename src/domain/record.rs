use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::clock::{format_timestamp, timestamp_format};

/// A consumption reading joined with the PV output for the same instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<FixedOffset>,
    pub consumption_w: u32,
    pub pv_w: f64,
    pub total_w: f64,
}

impl CombinedRecord {
    pub fn new(timestamp: DateTime<FixedOffset>, consumption_w: u32, pv_w: f64) -> Self {
        Self {
            timestamp,
            consumption_w,
            pv_w,
            total_w: f64::from(consumption_w) + pv_w,
        }
    }
}

/// `<timestamp> <consumption> <pv> <total>`, the result file's text layout
impl fmt::Display for CombinedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {:.2}",
            format_timestamp(&self.timestamp),
            self.consumption_w,
            self.pv_w,
            self.total_w
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_timestamp;

    #[test]
    fn test_total_is_consumption_plus_pv() {
        let rec = CombinedRecord::new(
            parse_timestamp("2017-04-22 12:00:00+02:00").unwrap(),
            2500,
            3120.456,
        );
        assert!((rec.total_w - 5620.456).abs() < 1e-9);
    }

    #[test]
    fn test_text_line() {
        let rec = CombinedRecord::new(
            parse_timestamp("2017-04-22 00:00:00+02:00").unwrap(),
            8123,
            0.0,
        );
        assert_eq!(rec.to_string(), "2017-04-22 00:00:00+02:00 8123 0.00 8123.00");
    }
}
