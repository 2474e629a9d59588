//! Check-in / check-out range selection as a pure reducer.
//!
//! Each pick consumes the current [`SelectionState`] and either returns the
//! next state or a selection error. On error the caller keeps the state it
//! already had, so a rejected pick never changes anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::availability::{DateStatus, UnavailableDateSet};
use super::reservation::nights_between;
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Empty,
    CheckInOnly {
        check_in: NaiveDate,
    },
    /// `check_out > check_in` and every date in `[check_in, check_out]`
    /// was available when the pair was formed.
    Complete {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

/// What a pick is validated against.
#[derive(Debug, Clone, Copy)]
pub struct PickContext<'a> {
    pub unavailable: &'a UnavailableDateSet,
    pub today: NaiveDate,
    pub rules_accepted: bool,
}

impl SelectionState {
    pub fn pick_date(self, date: NaiveDate, ctx: &PickContext<'_>) -> Result<Self> {
        if !ctx.rules_accepted {
            return Err(BookingError::RulesNotAccepted);
        }

        match self {
            Self::Empty | Self::Complete { .. } => start_at(date, ctx),
            Self::CheckInOnly { check_in } if date > check_in => {
                if let Some(first) = ctx
                    .unavailable
                    .first_unavailable_in(check_in..=date, ctx.today)
                {
                    return Err(BookingError::RangeContainsUnavailableDates { first });
                }
                Ok(Self::Complete {
                    check_in,
                    check_out: date,
                })
            }
            // A pick on or before the current check-in restarts the range.
            Self::CheckInOnly { .. } => start_at(date, ctx),
        }
    }

    /// Select a whole range at once: two picks starting from `Empty`.
    pub fn pick_range(
        check_in: NaiveDate,
        check_out: NaiveDate,
        ctx: &PickContext<'_>,
    ) -> Result<Self> {
        let state = Self::Empty.pick_date(check_in, ctx)?;
        let state = state.pick_date(check_out, ctx)?;
        if state.is_complete() {
            Ok(state)
        } else {
            Err(BookingError::InvalidInput {
                reason: format!("check-out {check_out} must be after check-in {check_in}"),
            })
        }
    }

    pub fn check_in(&self) -> Option<NaiveDate> {
        match self {
            Self::Empty => None,
            Self::CheckInOnly { check_in } | Self::Complete { check_in, .. } => Some(*check_in),
        }
    }

    pub fn check_out(&self) -> Option<NaiveDate> {
        match self {
            Self::Complete { check_out, .. } => Some(*check_out),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn nights(&self) -> Option<u32> {
        match self {
            Self::Complete {
                check_in,
                check_out,
            } => nights_between(*check_in, *check_out).ok(),
            _ => None,
        }
    }
}

fn start_at(date: NaiveDate, ctx: &PickContext<'_>) -> Result<SelectionState> {
    match ctx.unavailable.status(date, ctx.today) {
        DateStatus::Available => Ok(SelectionState::CheckInOnly { check_in: date }),
        reason => Err(BookingError::DateUnavailable { date, reason }),
    }
}

impl std::fmt::Display for SelectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "No dates selected"),
            Self::CheckInOnly { check_in } => {
                write!(f, "Check-in: {check_in} (pick a check-out date)")
            }
            Self::Complete {
                check_in,
                check_out,
            } => {
                write!(f, "Check-in: {check_in}, check-out: {check_out}")?;
                if let Some(n) = self.nights() {
                    write!(f, " ({n} night{})", if n == 1 { "" } else { "s" })?;
                }
                Ok(())
            }
        }
    }
}
