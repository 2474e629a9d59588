use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{CachedUnits, CouponValidator, gateway_call};
use crate::config::types::GatewayConfig;
use crate::domain::booking::BookingDraft;
use crate::domain::checkout::{CheckoutHandle, CheckoutMetadata, CheckoutRequest};
use crate::domain::pricing::{PricingPolicy, price};
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::payment_gateway::PaymentGateway;

/// Static parts of every checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout: Duration,
}

impl From<&GatewayConfig> for CheckoutSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Last check before money moves.
///
/// `submit` re-reads the unit's reservations, validates the draft, prices it
/// from scratch and only then asks the gateway for a checkout session. Every
/// failure ends the attempt with nothing retained; a resubmission starts over
/// with a fresh availability read. The check narrows the race with other
/// guests but the record store stays the final arbiter of overlaps.
pub struct BookingSubmissionGuard {
    units: Arc<CachedUnits>,
    coupons: Arc<CouponValidator>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    policy: PricingPolicy,
    settings: CheckoutSettings,
}

impl BookingSubmissionGuard {
    pub fn new(
        units: Arc<CachedUnits>,
        coupons: Arc<CouponValidator>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        policy: PricingPolicy,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            units,
            coupons,
            gateway,
            clock,
            policy,
            settings,
        }
    }

    pub async fn submit(&self, draft: &BookingDraft) -> Result<CheckoutHandle> {
        let unit_id = draft.unit_id.trim();
        if unit_id.is_empty() {
            return Err(BookingError::MissingRequiredField { field: "unit_id" });
        }
        let (check_in, check_out) = draft.stay_dates()?;

        // Re-check against a fresh read, never the browsing snapshot.
        let (unit, unavailable) = self.units.availability(unit_id).await?;
        let today = self.clock.today();
        if check_in < today || unavailable.conflicts_with_stay(check_in, check_out) {
            warn!(unit_id, %check_in, %check_out, "Dates taken since selection");
            return Err(BookingError::DatesNoLongerAvailable {
                check_in,
                check_out,
            });
        }

        let mut draft = draft.clone();
        // The discount is re-read; a code may have expired since it was applied.
        draft.coupon = match draft.pending_coupon_code() {
            Some(code) => Some(self.coupons.validate(&code).await?),
            None => None,
        };
        let request = draft.finalize(&self.policy)?;

        let quote = price(
            &unit,
            request.nights(),
            request.add_ons(),
            request.coupon(),
            &self.policy,
        )?;

        let checkout = CheckoutRequest {
            unit_id: unit.id.clone(),
            product_name: unit.name.clone(),
            amount_minor: quote.total_minor(),
            currency: self.settings.currency.clone(),
            customer_email: request.guest().email.clone(),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
            metadata: CheckoutMetadata::new(&request, &unit, &quote),
        };

        let session = gateway_call(
            self.settings.timeout,
            self.gateway.create_checkout_session(&checkout),
        )
        .await?;

        info!(
            unit_id,
            session_id = %session.id,
            nights = quote.nights,
            amount_minor = quote.total_minor(),
            "Booking handed to checkout"
        );
        Ok(CheckoutHandle {
            session_id: session.id,
            redirect_url: session.url,
            quote,
        })
    }
}
