//! End-to-end booking scenarios through the public engine API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use stay_booking::adapters::cache::MemoryUnitCache;
use stay_booking::config::types::Config;
use stay_booking::domain::availability::UnavailableDateSet;
use stay_booking::domain::booking::BookingDraft;
use stay_booking::domain::checkout::{CheckoutRequest, CheckoutSession};
use stay_booking::domain::coupon::Coupon;
use stay_booking::domain::money::{DiscountPercent, Money};
use stay_booking::domain::pricing::{AddOnSelection, PricingPolicy, price};
use stay_booking::domain::reservation::Reservation;
use stay_booking::domain::selection::{PickContext, SelectionState};
use stay_booking::domain::unit::RentalUnit;
use stay_booking::engine::BookingEngine;
use stay_booking::error::{BookingError, Result};
use stay_booking::ports::clock::Clock;
use stay_booking::ports::payment_gateway::PaymentGateway;
use stay_booking::ports::record_store::RecordStore;

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryStore {
    units: HashMap<String, RentalUnit>,
    reservations: Mutex<Vec<Reservation>>,
    coupons: Vec<Coupon>,
}

impl InMemoryStore {
    fn book(&self, unit_id: &str, check_in: &str, check_out: &str) {
        self.reservations
            .lock()
            .unwrap()
            .push(Reservation::new(unit_id, date(check_in), date(check_out)).unwrap());
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch_unit(&self, unit_id: &str) -> Result<RentalUnit> {
        self.units
            .get(unit_id)
            .cloned()
            .ok_or_else(|| BookingError::UnitNotFound {
                id: unit_id.to_string(),
            })
    }

    async fn fetch_reservations(&self, unit: &RentalUnit) -> Result<Vec<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.unit_id == unit.id)
            .cloned()
            .collect())
    }

    async fn find_valid_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Coupon>> {
        Ok(self
            .coupons
            .iter()
            .find(|c| c.code == code && c.is_active && c.expires_at > now)
            .cloned())
    }
}

#[derive(Default)]
struct RecordingGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(CheckoutSession {
            id: format!("cs_{}", requests.len()),
            url: format!("https://pay.example/cs_{}", requests.len()),
        })
    }
}

struct FrozenClock(DateTime<Utc>);

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn gintaras() -> RentalUnit {
    RentalUnit {
        id: "gintaras".into(),
        name: "Senovinis medinis namas \"Gintaras\"".into(),
        description: None,
        nightly_rate: Money::from_major(150),
        image_url: None,
        extra_bed_allowed: false,
    }
}

fn store() -> Arc<InMemoryStore> {
    let mut units = HashMap::new();
    units.insert("gintaras".to_string(), gintaras());
    Arc::new(InMemoryStore {
        units,
        reservations: Mutex::new(vec![]),
        coupons: vec![
            Coupon {
                code: "SUMMER10".into(),
                discount: DiscountPercent::from_percent(10.0).unwrap(),
                is_active: true,
                expires_at: instant("2025-09-01T00:00:00Z"),
            },
            Coupon {
                code: "SPRING25".into(),
                discount: DiscountPercent::from_percent(25.0).unwrap(),
                is_active: true,
                expires_at: instant("2025-05-01T00:00:00Z"),
            },
        ],
    })
}

fn engine(store: Arc<InMemoryStore>, gateway: Arc<RecordingGateway>) -> BookingEngine {
    BookingEngine::new(
        store,
        gateway,
        Arc::new(MemoryUnitCache::new(10)),
        Arc::new(FrozenClock(instant("2025-05-20T10:00:00Z"))),
        &Config::default(),
    )
    .unwrap()
}

fn draft() -> BookingDraft {
    BookingDraft {
        unit_id: "gintaras".into(),
        check_in: Some(date("2025-06-01")),
        check_out: Some(date("2025-06-04")),
        guest_name: Some("Ona Petraitė".into()),
        guest_email: Some("ona@example.com".into()),
        phone: Some("+37060000000".into()),
        country: Some("Lithuania".into()),
        guests: Some(2),
        rules_accepted: true,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_three_nights_no_extras() {
    let quote = price(&gintaras(), 3, &AddOnSelection::default(), None, &PricingPolicy::default())
        .unwrap();
    assert_eq!(quote.total, Money::from_major(450));
}

#[test]
fn scenario_b_pets_add_flat_fee() {
    let add_ons = AddOnSelection {
        has_pets: true,
        ..Default::default()
    };
    let quote = price(&gintaras(), 3, &add_ons, None, &PricingPolicy::default()).unwrap();
    assert_eq!(quote.total, Money::from_major(460));
}

#[tokio::test]
async fn scenario_c_valid_coupon_discounts_base() {
    let engine = engine(store(), Arc::new(RecordingGateway::default()));
    let coupon = engine.coupons.validate("SUMMER10").await.unwrap();
    let quote = price(
        &gintaras(),
        3,
        &AddOnSelection::default(),
        Some(&coupon),
        &engine.policy,
    )
    .unwrap();
    assert_eq!(quote.total, Money::from_major(405));
    assert_eq!(quote.discount, Money::from_major(45));
}

#[test]
fn scenario_d_check_out_before_check_in_never_completes() {
    let unavailable = UnavailableDateSet::default();
    let ctx = PickContext {
        unavailable: &unavailable,
        today: date("2025-05-20"),
        rules_accepted: true,
    };
    let state = SelectionState::Empty.pick_date(date("2025-06-04"), &ctx).unwrap();
    let state = state.pick_date(date("2025-06-01"), &ctx).unwrap();
    assert_eq!(
        state,
        SelectionState::CheckInOnly {
            check_in: date("2025-06-01")
        }
    );
    assert!(state.nights().is_none());
    assert!(SelectionState::pick_range(date("2025-06-04"), date("2025-06-01"), &ctx).is_err());
}

#[tokio::test]
async fn scenario_e_dates_taken_while_browsing() {
    let store = store();
    let gateway = Arc::new(RecordingGateway::default());
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway));

    // Browsing: the range is free.
    let (_, unavailable) = engine.units.availability("gintaras").await.unwrap();
    let ctx = PickContext {
        unavailable: &unavailable,
        today: engine.clock.today(),
        rules_accepted: true,
    };
    let selection =
        SelectionState::pick_range(date("2025-06-01"), date("2025-06-04"), &ctx).unwrap();

    // Someone else pays for the same nights.
    store.book("gintaras", "2025-06-01", "2025-06-04");

    let err = engine
        .guard
        .submit(&draft().with_selection(&selection))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::DatesNoLongerAvailable { .. }));
    assert!(err.requires_date_reselection());
    assert!(gateway.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_f_expired_coupon_leaves_price_unchanged() {
    let engine = engine(store(), Arc::new(RecordingGateway::default()));
    let err = engine.coupons.validate("SPRING25").await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidOrExpired { .. }));

    let quote = price(&gintaras(), 3, &AddOnSelection::default(), None, &engine.policy).unwrap();
    assert_eq!(quote.total, Money::from_major(450));
}

#[tokio::test]
async fn full_flow_reaches_gateway_once_with_final_price() {
    let store = store();
    let gateway = Arc::new(RecordingGateway::default());
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway));

    let coupon = engine.coupons.validate("SUMMER10").await.unwrap();
    let mut booking = draft();
    booking.has_pets = true;
    booking.coupon = Some(coupon);

    let handle = engine.guard.submit(&booking).await.unwrap();
    assert_eq!(handle.redirect_url, "https://pay.example/cs_1");
    // (450 + 10) * 0.9
    assert_eq!(handle.quote.total, Money::from_major(414));

    let requests = gateway.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_minor, 41_400);
    assert_eq!(requests[0].metadata.coupon.as_ref().unwrap().code, "SUMMER10");
}

#[test]
fn resubmission_after_failure_rechecks() {
    tokio_test::block_on(async {
        let store = store();
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(Arc::clone(&store), Arc::clone(&gateway));

        store.book("gintaras", "2025-06-03", "2025-06-05");
        assert!(engine.guard.submit(&draft()).await.is_err());

        // New dates after the conflicting stay.
        let mut retry = draft();
        retry.check_in = Some(date("2025-06-05"));
        retry.check_out = Some(date("2025-06-07"));
        let handle = engine.guard.submit(&retry).await.unwrap();
        assert_eq!(handle.quote.nights, 2);
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);
    });
}
