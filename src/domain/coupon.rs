use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::DiscountPercent;

/// A discount code as stored in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: DiscountPercent,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
}

impl Coupon {
    /// Active and expiring strictly after `now`.
    pub fn is_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    pub fn applied(&self) -> AppliedCoupon {
        AppliedCoupon {
            code: self.code.clone(),
            discount: self.discount,
        }
    }
}

/// A coupon that passed validation and is attached to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: DiscountPercent,
}

impl std::fmt::Display for AppliedCoupon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (-{})", self.code, self.discount)
    }
}
