use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Budget accounting bucket keyed as `year * 100 + month` (e.g. `202503`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId(pub i64);

impl PeriodId {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.year() as i64 * 100 + date.month() as i64)
    }

    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Parses `YYYYMM` or `YYYY-MM`.
    pub fn parse(s: &str) -> Option<Self> {
        let digits: String = s.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let value: i64 = digits.parse().ok()?;
        let month = value % 100;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(value))
    }

    pub fn year(&self) -> i64 {
        self.0 / 100
    }

    pub fn month(&self) -> u32 {
        (self.0 % 100) as u32
    }

    /// Ledger rows dated at or before this period count toward the budget.
    pub fn includes(&self, ledger_period: i64) -> bool {
        ledger_period <= self.0
    }

    pub fn path_segment(&self) -> String {
        format!("period={}", self)
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year(), self.month())
    }
}
