use serde::{Deserialize, Serialize};

use super::coupon::AppliedCoupon;
use super::money::Money;
use super::unit::RentalUnit;
use crate::error::{BookingError, Result};

pub const DEFAULT_GUESTS: u32 = 2;

/// Optional extras picked alongside the dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnSelection {
    pub has_pets: bool,
    pub extra_bed: bool,
    pub guests: u32,
}

impl Default for AddOnSelection {
    fn default() -> Self {
        Self {
            has_pets: false,
            extra_bed: false,
            guests: DEFAULT_GUESTS,
        }
    }
}

/// Flat fees and bounds applied by [`price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub pet_fee: Money,
    pub extra_bed_fee: Money,
    pub max_guests: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            pet_fee: Money::from_major(10),
            extra_bed_fee: Money::from_major(15),
            max_guests: 12,
        }
    }
}

impl PricingPolicy {
    pub fn validate_guests(&self, guests: u32) -> Result<()> {
        if guests == 0 || guests > self.max_guests {
            return Err(BookingError::InvalidInput {
                reason: format!(
                    "guest count must be between 1 and {}, got {guests}",
                    self.max_guests
                ),
            });
        }
        Ok(())
    }
}

/// Itemised price of one stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub unit_id: String,
    pub nights: u32,
    pub nightly_rate: Money,
    pub base: Money,
    pub pet_fee: Money,
    pub extra_bed_fee: Money,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
}

impl Quote {
    /// Amount for the payment gateway, in minor units.
    pub fn total_minor(&self) -> i64 {
        self.total.minor()
    }
}

/// Price a stay: `nights × rate`, plus one-off add-on fees, minus the
/// coupon percentage of that whole subtotal.
pub fn price(
    unit: &RentalUnit,
    nights: u32,
    add_ons: &AddOnSelection,
    coupon: Option<&AppliedCoupon>,
    policy: &PricingPolicy,
) -> Result<Quote> {
    if nights == 0 {
        return Err(BookingError::InvalidInput {
            reason: "stay must be at least one night".into(),
        });
    }
    policy.validate_guests(add_ons.guests)?;

    let base = unit.nightly_rate.times(nights)?;
    let pet_fee = if add_ons.has_pets {
        policy.pet_fee
    } else {
        Money::ZERO
    };
    let extra_bed_fee = if add_ons.extra_bed && unit.extra_bed_allowed {
        policy.extra_bed_fee
    } else {
        Money::ZERO
    };
    let subtotal = base.checked_add(pet_fee)?.checked_add(extra_bed_fee)?;

    let (discount, total) = match coupon {
        Some(c) => c.discount.apply(subtotal)?,
        None => (Money::ZERO, subtotal),
    };

    Ok(Quote {
        unit_id: unit.id.clone(),
        nights,
        nightly_rate: unit.nightly_rate,
        base,
        pet_fee,
        extra_bed_fee,
        subtotal,
        discount,
        total,
        coupon: coupon.cloned(),
    })
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Price for unit {}", self.unit_id)?;
        writeln!(
            f,
            "{:<24} {:>10}",
            format!("{} x {} nights", self.nightly_rate, self.nights),
            self.base.to_string()
        )?;
        if self.pet_fee > Money::ZERO {
            writeln!(f, "{:<24} {:>10}", "Pet fee", self.pet_fee.to_string())?;
        }
        if self.extra_bed_fee > Money::ZERO {
            writeln!(f, "{:<24} {:>10}", "Extra bed", self.extra_bed_fee.to_string())?;
        }
        if let Some(ref coupon) = self.coupon {
            writeln!(
                f,
                "{:<24} {:>10}",
                format!("Coupon {coupon}"),
                format!("-{}", self.discount)
            )?;
        }
        writeln!(f, "{}", "-".repeat(35))?;
        writeln!(f, "{:<24} {:>10}", "Total", self.total.to_string())
    }
}
