use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::store_call;
use crate::domain::coupon::AppliedCoupon;
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::record_store::RecordStore;

/// Checks discount codes against the record store.
///
/// Codes are matched case-sensitively after trimming surrounding whitespace.
/// A code that is blank never reaches the store. Lookup failures stay
/// distinct from unknown or expired codes, and validation has no side
/// effects so it may be repeated freely.
pub struct CouponValidator {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl CouponValidator {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
        }
    }

    pub async fn validate(&self, code: &str) -> Result<AppliedCoupon> {
        let code = code.trim();
        if code.is_empty() {
            return Err(BookingError::EmptyCode);
        }

        let now = self.clock.now();
        let found = store_call(
            self.store_timeout,
            "coupon lookup",
            self.store.find_valid_coupon(code, now),
        )
        .await?;

        match found {
            Some(coupon) if coupon.code == code && coupon.is_currently_valid(now) => {
                info!(discount = %coupon.discount, "Coupon accepted");
                Ok(coupon.applied())
            }
            _ => {
                debug!("Coupon rejected");
                Err(BookingError::InvalidOrExpired {
                    code: code.to_string(),
                })
            }
        }
    }
}
