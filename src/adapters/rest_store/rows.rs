//! JSON row shapes returned by the record store and their conversion into
//! domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::domain::coupon::Coupon;
use crate::domain::money::{DiscountPercent, Money};
use crate::domain::reservation::Reservation;
use crate::domain::unit::RentalUnit;
use crate::error::{BookingError, Result};

#[derive(Debug, Deserialize)]
struct UnitRow {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    price_per_night: f64,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    extra_bed_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReservationRow {
    check_in: String,
    check_out: String,
}

#[derive(Debug, Deserialize)]
struct CouponRow {
    code: String,
    discount_percent: f64,
    #[serde(default)]
    is_active: bool,
    expires_at: DateTime<Utc>,
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str, table: &str) -> Result<Vec<T>> {
    serde_json::from_str(body).map_err(|e| BookingError::LookupFailed {
        reason: format!("malformed {table} rows: {e}"),
    })
}

/// Parse `apartments` rows. Rows without an `extra_bed_allowed` column fall
/// back to membership in `extra_bed_units`.
pub fn parse_unit_rows(body: &str, extra_bed_units: &[String]) -> Result<Vec<RentalUnit>> {
    decode::<UnitRow>(body, "apartments")?
        .into_iter()
        .map(|row| {
            let nightly_rate =
                Money::from_decimal(row.price_per_night).map_err(|e| BookingError::LookupFailed {
                    reason: format!("unit {} has an invalid rate: {e}", row.id),
                })?;
            let extra_bed_allowed = row
                .extra_bed_allowed
                .unwrap_or_else(|| extra_bed_units.iter().any(|u| u == &row.id));
            Ok(RentalUnit {
                id: row.id,
                name: row.name,
                description: row.description,
                nightly_rate,
                image_url: row.image_url,
                extra_bed_allowed,
            })
        })
        .collect()
}

/// Parse `bookings` rows for one unit. Inverted ranges are passed through
/// unchanged; availability derivation skips them.
pub fn parse_reservation_rows(body: &str, unit_id: &str) -> Result<Vec<Reservation>> {
    decode::<ReservationRow>(body, "bookings")?
        .into_iter()
        .map(|row| {
            Ok(Reservation {
                unit_id: unit_id.to_string(),
                check_in: parse_day(&row.check_in)?,
                check_out: parse_day(&row.check_out)?,
            })
        })
        .collect()
}

pub fn parse_coupon_rows(body: &str) -> Result<Vec<Coupon>> {
    decode::<CouponRow>(body, "coupons")?
        .into_iter()
        .map(|row| {
            let discount = DiscountPercent::from_percent(row.discount_percent).map_err(|e| {
                BookingError::LookupFailed {
                    reason: format!("coupon has an invalid discount: {e}"),
                }
            })?;
            Ok(Coupon {
                code: row.code,
                discount,
                is_active: row.is_active,
                expires_at: row.expires_at,
            })
        })
        .collect()
}

/// Accepts `YYYY-MM-DD` and timestamps that start with one.
fn parse_day(raw: &str) -> Result<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| BookingError::LookupFailed {
        reason: format!("invalid booking date '{raw}': {e}"),
    })
}

/// Lower-case booking key derived from a display name such as
/// `Senovinis medinis namas "Gintaras"`: the quoted part, if any, with
/// diacritics folded.
pub fn name_slug(name: &str) -> String {
    let quoted = name
        .split('"')
        .nth(1)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(name);
    quoted
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ā' | 'ą' | 'á' | 'à' | 'ä' => 'a',
            'č' | 'ć' => 'c',
            'ē' | 'ė' | 'ę' | 'é' | 'è' => 'e',
            'ģ' => 'g',
            'ī' | 'į' | 'í' => 'i',
            'ķ' => 'k',
            'ļ' => 'l',
            'ņ' => 'n',
            'ō' | 'ó' | 'ö' => 'o',
            'š' => 's',
            'ū' | 'ų' | 'ú' | 'ü' => 'u',
            'ž' => 'z',
            other => other,
        })
        .collect()
}
