use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::coupon::AppliedCoupon;
use super::pricing::{AddOnSelection, PricingPolicy};
use super::reservation::nights_between;
use super::selection::SelectionState;
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
}

/// Raw booking form input. Anything may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub unit_id: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub guests: Option<u32>,
    #[serde(default)]
    pub has_pets: bool,
    #[serde(default)]
    pub extra_bed: bool,
    #[serde(default)]
    pub rules_accepted: bool,
    #[serde(default)]
    pub coupon: Option<AppliedCoupon>,
    /// Discount code as typed. Takes precedence over `coupon` and is only
    /// checked once the dates have been re-confirmed at submission.
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl BookingDraft {
    /// Take the dates from a selection; incomplete selections leave them unset.
    pub fn with_selection(mut self, selection: &SelectionState) -> Self {
        self.check_in = selection.check_in();
        self.check_out = selection.check_out();
        self
    }

    /// The code to validate at submission: the typed code if any, otherwise
    /// the code of an already applied coupon.
    pub fn pending_coupon_code(&self) -> Option<String> {
        match self.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(code.to_string()),
            _ => self.coupon.as_ref().map(|c| c.code.clone()),
        }
    }

    /// Both stay dates, or the first one that is missing.
    pub fn stay_dates(&self) -> Result<(NaiveDate, NaiveDate)> {
        let check_in = self
            .check_in
            .ok_or(BookingError::MissingRequiredField { field: "check_in" })?;
        let check_out = self
            .check_out
            .ok_or(BookingError::MissingRequiredField { field: "check_out" })?;
        Ok((check_in, check_out))
    }

    /// Validate every field and produce an immutable [`BookingRequest`].
    pub fn finalize(&self, policy: &PricingPolicy) -> Result<BookingRequest> {
        if self.unit_id.trim().is_empty() {
            return Err(BookingError::MissingRequiredField { field: "unit_id" });
        }
        let (check_in, check_out) = self.stay_dates()?;
        let name = required(self.guest_name.as_deref(), "guest_name")?;
        let email = required(self.guest_email.as_deref(), "guest_email")?;
        let phone = required(self.phone.as_deref(), "phone")?;
        let country = required(self.country.as_deref(), "country")?;
        let guests = self
            .guests
            .ok_or(BookingError::MissingRequiredField { field: "guests" })?;

        if !self.rules_accepted {
            return Err(BookingError::RulesNotAccepted);
        }

        nights_between(check_in, check_out)?;
        policy.validate_guests(guests)?;

        Ok(BookingRequest {
            unit_id: self.unit_id.trim().to_string(),
            check_in,
            check_out,
            add_ons: AddOnSelection {
                has_pets: self.has_pets,
                extra_bed: self.extra_bed,
                guests,
            },
            guest: GuestContact {
                name,
                email,
                phone,
                country,
            },
            coupon: self.coupon.clone(),
        })
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BookingError::MissingRequiredField { field }),
    }
}

/// A fully validated checkout attempt. Only [`BookingDraft::finalize`]
/// builds one, so holding it means the dates are ordered, every contact
/// field is filled in and the house rules were accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    unit_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    add_ons: AddOnSelection,
    guest: GuestContact,
    coupon: Option<AppliedCoupon>,
}

impl BookingRequest {
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        // Ordering was checked in finalize().
        nights_between(self.check_in, self.check_out).unwrap_or(1)
    }

    pub fn add_ons(&self) -> &AddOnSelection {
        &self.add_ons
    }

    pub fn guest(&self) -> &GuestContact {
        &self.guest
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }
}
