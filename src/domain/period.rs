//! Replay Period
//!
//! Inclusive time bounds on the bars a backtest replays. Either bound may
//! be open.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::instrument::BarEvent;

#[derive(Debug, Error, PartialEq)]
#[error("Replay start {start} is after end {end}")]
pub struct InvalidPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReplayPeriod {
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, InvalidPeriod> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(InvalidPeriod { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// No bound on either side
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }

    /// Keep the events inside the period, in their original order
    pub fn filter(&self, events: Vec<BarEvent>) -> Vec<BarEvent> {
        if self.is_unbounded() {
            return events;
        }
        events
            .into_iter()
            .filter(|e| self.contains(e.timestamp))
            .collect()
    }
}
