use chrono::{DateTime, Local, NaiveDate, Utc};
use hoenn_core::DayBoundary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar day partitioning the condition cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's key under the given boundary
    pub fn today(boundary: DayBoundary) -> Self {
        Self::at(Utc::now(), boundary)
    }

    /// Key for an arbitrary instant
    pub fn at(instant: DateTime<Utc>, boundary: DayBoundary) -> Self {
        match boundary {
            DayBoundary::Utc => Self(instant.date_naive()),
            DayBoundary::Local => Self(instant.with_timezone(&Local).date_naive()),
        }
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following calendar day
    pub fn next(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
