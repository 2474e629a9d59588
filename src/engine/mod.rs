//! Services that compose the ports into the booking workflow.

pub mod coupon_validator;
pub mod submission_guard;
pub mod units;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::types::Config;
use crate::domain::pricing::PricingPolicy;
use crate::error::{BookingError, Result};
use crate::ports::cache::UnitCache;
use crate::ports::clock::Clock;
use crate::ports::payment_gateway::PaymentGateway;
use crate::ports::record_store::RecordStore;

pub use coupon_validator::CouponValidator;
pub use submission_guard::{BookingSubmissionGuard, CheckoutSettings};
pub use units::CachedUnits;

/// Every service the tool surface needs, wired from one set of ports.
#[derive(Clone)]
pub struct BookingEngine {
    pub units: Arc<CachedUnits>,
    pub coupons: Arc<CouponValidator>,
    pub guard: Arc<BookingSubmissionGuard>,
    pub clock: Arc<dyn Clock>,
    pub policy: PricingPolicy,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        cache: Arc<dyn UnitCache>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self> {
        let policy = config.pricing.policy()?;
        for (section, secs) in [
            ("store", config.store.request_timeout_secs),
            ("gateway", config.gateway.request_timeout_secs),
        ] {
            if secs == 0 {
                return Err(BookingError::Config(format!(
                    "{section}.request_timeout_secs must be at least 1"
                )));
            }
        }
        let store_timeout = Duration::from_secs(config.store.request_timeout_secs);
        let units = Arc::new(CachedUnits::new(
            Arc::clone(&store),
            cache,
            Duration::from_secs(config.cache.unit_ttl_secs),
            store_timeout,
        ));
        let coupons = Arc::new(CouponValidator::new(store, Arc::clone(&clock), store_timeout));
        let guard = Arc::new(BookingSubmissionGuard::new(
            Arc::clone(&units),
            Arc::clone(&coupons),
            gateway,
            Arc::clone(&clock),
            policy,
            CheckoutSettings::from(&config.gateway),
        ));
        Ok(Self {
            units,
            coupons,
            guard,
            clock,
            policy,
        })
    }
}

/// Run a store call with a deadline; elapsed deadlines become `LookupFailed`.
pub(crate) async fn store_call<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| {
            Err(BookingError::LookupFailed {
                reason: format!("{what} timed out after {}s", limit.as_secs()),
            })
        })
}

/// Run a gateway call with a deadline; elapsed deadlines become `Gateway`.
pub(crate) async fn gateway_call<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| {
            Err(BookingError::Gateway {
                reason: format!("checkout timed out after {}s", limit.as_secs()),
            })
        })
}
