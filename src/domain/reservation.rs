use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// A confirmed stay: `check_in` inclusive, `check_out` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub unit_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Reservation {
    pub fn new(unit_id: impl Into<String>, check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_out <= check_in {
            return Err(BookingError::InvalidInput {
                reason: format!("check-out {check_out} must be after check-in {check_in}"),
            });
        }
        Ok(Self {
            unit_id: unit_id.into(),
            check_in,
            check_out,
        })
    }

    /// Occupied nights, i.e. every date in `[check_in, check_out)`.
    pub fn occupied_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in
            .iter_days()
            .take_while(move |d| *d < self.check_out)
    }

    pub fn is_empty(&self) -> bool {
        self.check_out <= self.check_in
    }
}

/// Calendar-day difference between check-out and check-in.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<u32> {
    let days = (check_out - check_in).num_days();
    if days <= 0 {
        return Err(BookingError::InvalidInput {
            reason: format!("stay must be at least one night, got {days}"),
        });
    }
    u32::try_from(days).map_err(|_| BookingError::InvalidInput {
        reason: format!("stay of {days} nights is too long"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_rejects_inverted_range() {
        assert!(Reservation::new("a", date("2025-06-04"), date("2025-06-01")).is_err());
        assert!(Reservation::new("a", date("2025-06-01"), date("2025-06-01")).is_err());
    }

    #[test]
    fn occupied_dates_exclude_check_out() {
        let r = Reservation::new("a", date("2025-06-01"), date("2025-06-04")).unwrap();
        let dates: Vec<_> = r.occupied_dates().collect();
        assert_eq!(
            dates,
            vec![date("2025-06-01"), date("2025-06-02"), date("2025-06-03")]
        );
    }

    #[test]
    fn occupied_dates_cross_month_boundary() {
        let r = Reservation::new("a", date("2025-01-30"), date("2025-02-02")).unwrap();
        assert_eq!(r.occupied_dates().count(), 3);
        assert_eq!(r.occupied_dates().last(), Some(date("2025-02-01")));
    }

    #[test]
    fn empty_reservation_yields_no_dates() {
        let r = Reservation {
            unit_id: "a".into(),
            check_in: date("2025-06-04"),
            check_out: date("2025-06-04"),
        };
        assert!(r.is_empty());
        assert_eq!(r.occupied_dates().count(), 0);
    }

    #[test]
    fn nights_between_counts_calendar_days() {
        assert_eq!(nights_between(date("2025-06-01"), date("2025-06-04")).unwrap(), 3);
        assert_eq!(nights_between(date("2025-02-28"), date("2025-03-01")).unwrap(), 1);
    }

    #[test]
    fn nights_between_rejects_zero_and_negative() {
        assert!(nights_between(date("2025-06-01"), date("2025-06-01")).is_err());
        assert!(nights_between(date("2025-06-04"), date("2025-06-01")).is_err());
    }
}
