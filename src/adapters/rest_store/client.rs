use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::{ReservationKey, StoreConfig};
use crate::domain::coupon::Coupon;
use crate::domain::reservation::Reservation;
use crate::domain::unit::RentalUnit;
use crate::error::{BookingError, Result};
use crate::ports::record_store::RecordStore;

use super::rows;

/// Record store speaking the PostgREST dialect (`/rest/v1/<table>?col=eq.v`).
pub struct RestRecordStore {
    http: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    reservation_key: ReservationKey,
    extra_bed_units: Vec<String>,
}

impl RestRecordStore {
    pub fn new(config: &StoreConfig, api_key: String, extra_bed_units: Vec<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BookingError::Config(format!("failed to build store client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
            reservation_key: config.reservation_key,
            extra_bed_units,
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{table}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            for (column, filter) in filters {
                query.append_pair(column, filter);
            }
        }
        Ok(url)
    }

    async fn fetch_rows(&self, table: &str, url: &Url) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(u64::from(attempt) * 500);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying store request");
                tokio::time::sleep(delay).await;
            }

            debug!(table, "Store GET request");
            let result = self
                .http
                .get(url.as_str())
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
                .header("Accept", "application/json")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|e| BookingError::LookupFailed {
                            reason: format!("reading {table} response: {e}"),
                        })?;
                        trace!(table, body_len = body.len(), "Store response received");
                        return Ok(body);
                    }
                    warn!(table, status = %status, attempt, "Store returned an error status");
                    last_error = Some(BookingError::LookupFailed {
                        reason: format!("{table} query returned HTTP {status}"),
                    });
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(table, error = %e, attempt, "Store request failed");
                    last_error = Some(BookingError::LookupFailed {
                        reason: format!("{table} query failed: {e}"),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BookingError::LookupFailed {
            reason: "all retries exhausted".into(),
        }))
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn fetch_unit(&self, unit_id: &str) -> Result<RentalUnit> {
        let url = self.table_url(
            "apartments",
            &[("select", "*".into()), ("id", format!("eq.{unit_id}"))],
        )?;
        let body = self.fetch_rows("apartments", &url).await?;
        rows::parse_unit_rows(&body, &self.extra_bed_units)?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::UnitNotFound {
                id: unit_id.to_string(),
            })
    }

    async fn fetch_reservations(&self, unit: &RentalUnit) -> Result<Vec<Reservation>> {
        let filter = match self.reservation_key {
            ReservationKey::ApartmentId => ("apartment_id", format!("eq.{}", unit.id)),
            ReservationKey::ApartmentName => {
                ("apartment_name", format!("eq.{}", rows::name_slug(&unit.name)))
            }
        };
        let url = self.table_url("bookings", &[("select", "check_in,check_out".into()), filter])?;
        let body = self.fetch_rows("bookings", &url).await?;
        let reservations = rows::parse_reservation_rows(&body, &unit.id)?;
        debug!(unit_id = %unit.id, count = reservations.len(), "Fetched reservations");
        Ok(reservations)
    }

    async fn find_valid_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Coupon>> {
        let url = self.table_url(
            "coupons",
            &[
                ("select", "*".into()),
                ("code", format!("eq.{code}")),
                ("is_active", "eq.true".into()),
                (
                    "expires_at",
                    format!("gt.{}", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ),
            ],
        )?;
        let body = self.fetch_rows("coupons", &url).await?;
        // Exact code match and validity are re-checked locally.
        Ok(rows::parse_coupon_rows(&body)?
            .into_iter()
            .find(|c| c.code == code && c.is_currently_valid(now)))
    }
}
