use chrono::{DateTime, Utc};

use crate::engine::LinearScale;
use crate::error::DiagramError;

/// Scrubbable "show the last N%" window over the buffered orders.
///
/// The percentage maps linearly onto the timestamps held: 100 keeps every
/// order since the stream started, 0 keeps only the most recent one.
/// Orders at or before the cutoff are skipped for the tick; nothing is
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    percentage: f64,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self { percentage: 100.0 }
    }
}

impl HistoryWindow {
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Finite values are clamped into 0..=100. Returns the value stored.
    pub fn set_percentage(&mut self, percentage: f64) -> Result<f64, DiagramError> {
        if !percentage.is_finite() {
            return Err(DiagramError::InvalidHistoryPercentage(percentage));
        }
        self.percentage = percentage.clamp(0.0, 100.0);
        Ok(self.percentage)
    }

    /// Cutoff in epoch milliseconds for the given oldest/newest timestamps.
    pub fn cutoff_millis(&self, oldest: DateTime<Utc>, newest: DateTime<Utc>) -> i64 {
        let scale = LinearScale::percent((
            (newest.timestamp_millis() - 1) as f64,
            (oldest.timestamp_millis() - 1) as f64,
        ));
        scale.apply(self.percentage).floor() as i64
    }

    pub fn cutoff_for<I>(&self, timestamps: I) -> Option<i64>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        for ts in timestamps {
            bounds = Some(match bounds {
                None => (ts, ts),
                Some((oldest, newest)) => (oldest.min(ts), newest.max(ts)),
            });
        }
        bounds.map(|(oldest, newest)| self.cutoff_millis(oldest, newest))
    }

    pub fn includes(cutoff: i64, timestamp: DateTime<Utc>) -> bool {
        timestamp.timestamp_millis() > cutoff
    }
}
