use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::reservation::Reservation;

/// Why a calendar date can or cannot be picked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
pub enum DateStatus {
    Available,
    /// Occupied by an existing reservation.
    Booked,
    /// Strictly before today. Wins over `Booked`.
    PastDate,
}

impl std::fmt::Display for DateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Booked => write!(f, "Booked"),
            Self::PastDate => write!(f, "Past date"),
        }
    }
}

/// Every occupied night of one rental unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableDateSet {
    pub unit_id: String,
    dates: BTreeSet<NaiveDate>,
}

impl UnavailableDateSet {
    /// Union of `[check_in, check_out)` over the unit's reservations.
    ///
    /// Reservations for other units are ignored, as are empty ranges.
    pub fn from_reservations(unit_id: &str, reservations: &[Reservation]) -> Self {
        let mut dates = BTreeSet::new();
        for r in reservations.iter().filter(|r| r.unit_id == unit_id) {
            if r.is_empty() {
                warn!(
                    unit_id,
                    check_in = %r.check_in,
                    check_out = %r.check_out,
                    "Ignoring reservation with empty date range"
                );
                continue;
            }
            dates.extend(r.occupied_dates());
        }
        Self {
            unit_id: unit_id.to_string(),
            dates,
        }
    }

    pub fn is_booked(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn status(&self, date: NaiveDate, today: NaiveDate) -> DateStatus {
        if date < today {
            DateStatus::PastDate
        } else if self.is_booked(date) {
            DateStatus::Booked
        } else {
            DateStatus::Available
        }
    }

    pub fn is_available(&self, date: NaiveDate, today: NaiveDate) -> bool {
        self.status(date, today) == DateStatus::Available
    }

    /// First date in the closed range that is not available.
    pub fn first_unavailable_in(
        &self,
        range: RangeInclusive<NaiveDate>,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        let (start, end) = range.into_inner();
        if start > end {
            return None;
        }
        if start < today {
            return Some(start);
        }
        self.dates.range(start..=end).next().copied()
    }

    /// Whether any night of a `[check_in, check_out)` stay is booked.
    pub fn conflicts_with_stay(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        check_in < check_out && self.dates.range(check_in..check_out).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    /// Booked dates collapsed into contiguous inclusive runs.
    pub fn booked_runs(&self) -> Vec<(NaiveDate, NaiveDate)> {
        let mut runs: Vec<(NaiveDate, NaiveDate)> = Vec::new();
        for date in &self.dates {
            match runs.last_mut() {
                Some((_, end)) if end.succ_opt() == Some(*date) => *end = *date,
                _ => runs.push((*date, *date)),
            }
        }
        runs
    }
}

impl std::fmt::Display for UnavailableDateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Availability for unit {}", self.unit_id)?;
        if self.dates.is_empty() {
            return writeln!(f, "No booked nights.");
        }
        writeln!(f, "Booked nights: {}", self.dates.len())?;
        writeln!(f, "{}", "-".repeat(30))?;
        for (start, end) in self.booked_runs() {
            if start == end {
                writeln!(f, "{start}")?;
            } else {
                writeln!(f, "{start} -> {end}")?;
            }
        }
        Ok(())
    }
}
