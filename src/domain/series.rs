use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

/// Simulated PV output for one day, in watts, keyed by sample instant.
///
/// Keys are stored in UTC so lookups match regardless of the offset a
/// timestamp was rendered with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PvSeries {
    points: BTreeMap<DateTime<Utc>, f64>,
}

impl PvSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: TimeZone>(&mut self, at: DateTime<T>, watts: f64) {
        self.points.insert(at.with_timezone(&Utc), watts);
    }

    pub fn get<T: TimeZone>(&self, at: &DateTime<T>) -> Option<f64> {
        self.points.get(&at.with_timezone(&Utc)).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &f64)> {
        self.points.iter()
    }

    /// Highest sample and when it occurred
    pub fn peak(&self) -> Option<(DateTime<Utc>, f64)> {
        self.points
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(t, w)| (*t, *w))
    }

    /// Energy over the day in Wh, treating each sample as constant until the next
    pub fn energy_wh(&self, frequency_seconds: u32) -> f64 {
        let hours = f64::from(frequency_seconds) / 3600.0;
        self.points.values().sum::<f64>() * hours
    }
}

impl<T: TimeZone> FromIterator<(DateTime<T>, f64)> for PvSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<T>, f64)>>(iter: I) -> Self {
        let mut series = PvSeries::new();
        for (at, watts) in iter {
            series.insert(at, watts);
        }
        series
    }
}
