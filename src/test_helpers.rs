use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::checkout::{CheckoutRequest, CheckoutSession};
use crate::domain::coupon::Coupon;
use crate::domain::money::{DiscountPercent, Money};
use crate::domain::reservation::Reservation;
use crate::domain::unit::RentalUnit;
use crate::error::Result;
use crate::ports::clock::Clock;
use crate::ports::payment_gateway::PaymentGateway;
use crate::ports::record_store::RecordStore;

type UnitFn = Box<dyn Fn(&str) -> Result<RentalUnit> + Send + Sync>;
type ReservationsFn = Box<dyn Fn(&RentalUnit) -> Result<Vec<Reservation>> + Send + Sync>;
type CouponFn = Box<dyn Fn(&str, DateTime<Utc>) -> Result<Option<Coupon>> + Send + Sync>;
type SessionFn = Box<dyn Fn(&CheckoutRequest) -> Result<CheckoutSession> + Send + Sync>;

#[allow(clippy::struct_field_names)]
pub struct MockRecordStore {
    unit_fn: Mutex<UnitFn>,
    reservations_fn: Mutex<ReservationsFn>,
    coupon_fn: Mutex<CouponFn>,
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecordStore {
    /// Every unit exists at €150/night with no reservations; no coupons exist.
    pub fn new() -> Self {
        Self {
            unit_fn: Mutex::new(Box::new(|id| Ok(make_unit(id, 150)))),
            reservations_fn: Mutex::new(Box::new(|_| Ok(vec![]))),
            coupon_fn: Mutex::new(Box::new(|_, _| Ok(None))),
        }
    }

    #[must_use]
    pub fn with_unit(self, f: impl Fn(&str) -> Result<RentalUnit> + Send + Sync + 'static) -> Self {
        *self.unit_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_reservations(
        self,
        f: impl Fn(&RentalUnit) -> Result<Vec<Reservation>> + Send + Sync + 'static,
    ) -> Self {
        *self.reservations_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_coupon(
        self,
        f: impl Fn(&str, DateTime<Utc>) -> Result<Option<Coupon>> + Send + Sync + 'static,
    ) -> Self {
        *self.coupon_fn.lock().unwrap() = Box::new(f);
        self
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn fetch_unit(&self, unit_id: &str) -> Result<RentalUnit> {
        let f = self.unit_fn.lock().unwrap();
        f(unit_id)
    }

    async fn fetch_reservations(&self, unit: &RentalUnit) -> Result<Vec<Reservation>> {
        let f = self.reservations_fn.lock().unwrap();
        f(unit)
    }

    async fn find_valid_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Coupon>> {
        let f = self.coupon_fn.lock().unwrap();
        f(code, now)
    }
}

pub struct MockPaymentGateway {
    session_fn: Mutex<SessionFn>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            session_fn: Mutex::new(Box::new(|req| {
                Ok(CheckoutSession {
                    id: format!("cs_test_{}", req.unit_id),
                    url: format!("https://checkout.test/{}", req.unit_id),
                })
            })),
        }
    }

    #[must_use]
    pub fn with_session(
        self,
        f: impl Fn(&CheckoutRequest) -> Result<CheckoutSession> + Send + Sync + 'static,
    ) -> Self {
        *self.session_fn.lock().unwrap() = Box::new(f);
        self
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let f = self.session_fn.lock().unwrap();
        f(request)
    }
}

/// Clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(rfc3339: &str) -> Self {
        Self(instant(rfc3339))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// --- Factory functions ---

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn make_unit(id: &str, rate: i64) -> RentalUnit {
    RentalUnit {
        id: id.to_string(),
        name: format!("Unit \"{id}\""),
        description: Some("A quiet place by the lake".to_string()),
        nightly_rate: Money::from_major(rate),
        image_url: None,
        extra_bed_allowed: false,
    }
}

pub fn make_reservation(unit_id: &str, check_in: &str, check_out: &str) -> Reservation {
    Reservation::new(unit_id, date(check_in), date(check_out)).unwrap()
}

pub fn make_coupon(code: &str, percent: f64, expires_at: &str) -> Coupon {
    Coupon {
        code: code.to_string(),
        discount: DiscountPercent::from_percent(percent).unwrap(),
        is_active: true,
        expires_at: instant(expires_at),
    }
}
