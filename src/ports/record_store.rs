use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::coupon::Coupon;
use crate::domain::reservation::Reservation;
use crate::domain::unit::RentalUnit;
use crate::error::Result;

/// Read-only view of the hosted database holding units, bookings and coupons.
///
/// Transport or availability failures must surface as
/// [`BookingError::LookupFailed`](crate::error::BookingError::LookupFailed).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_unit(&self, unit_id: &str) -> Result<RentalUnit>;

    async fn fetch_reservations(&self, unit: &RentalUnit) -> Result<Vec<Reservation>>;

    /// The coupon with exactly this code that is active and expires after
    /// `now`, if any.
    async fn find_valid_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Coupon>>;
}
