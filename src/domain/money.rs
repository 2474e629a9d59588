#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Monetary amount stored as integer minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    const SCALE: i64 = 100;

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Self(major * Self::SCALE)
    }

    /// Convert a decimal amount (as stored in the record store) to cents,
    /// rounding half away from zero. Negative or non-finite values are rejected.
    pub fn from_decimal(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(BookingError::InvalidInput {
                reason: format!("amount must be a non-negative number, got {value}"),
            });
        }
        Ok(Self((value * Self::SCALE as f64).round() as i64))
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| BookingError::InvalidInput {
                reason: format!("{self} + {rhs} is out of range"),
            })
    }

    pub fn times(self, count: u32) -> Result<Self> {
        self.0
            .checked_mul(i64::from(count))
            .map(Self)
            .ok_or_else(|| BookingError::InvalidInput {
                reason: format!("{self} x {count} is out of range"),
            })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / Self::SCALE, abs % Self::SCALE)
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Discount percentage held in basis points (1/100 of a percent), 0..=100 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountPercent(u32);

impl DiscountPercent {
    const FULL: u32 = 10_000;

    pub fn from_basis_points(bp: u32) -> Result<Self> {
        if bp > Self::FULL {
            return Err(BookingError::InvalidInput {
                reason: format!("discount cannot exceed 100%, got {}", Self(bp)),
            });
        }
        Ok(Self(bp))
    }

    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(BookingError::InvalidInput {
                reason: format!("discount percent must be between 0 and 100, got {percent}"),
            });
        }
        Ok(Self((percent * 100.0).round() as u32))
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Split `subtotal` into `(discount, discounted_total)`.
    ///
    /// The discounted total is rounded half-up to the nearest minor unit and
    /// the discount is whatever remains, so the two always add up exactly.
    pub fn apply(self, subtotal: Money) -> Result<(Money, Money)> {
        let keep = i64::from(Self::FULL - self.0);
        let full = i64::from(Self::FULL);
        let total = subtotal
            .minor()
            .checked_mul(keep)
            .and_then(|scaled| scaled.checked_add(full / 2))
            .ok_or_else(|| BookingError::InvalidInput {
                reason: format!("cannot apply {self} to {subtotal}"),
            })?
            / full;
        let total = Money::from_minor(total);
        Ok((subtotal - total, total))
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}%", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}
