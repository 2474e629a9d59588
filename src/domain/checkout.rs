//! Payment-gateway checkout payload.
//!
//! The metadata bag is the only record of booking intent until the gateway's
//! confirmation webhook writes the reservation, so its keys are a closed enum
//! and the layout carries a version number.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::BookingRequest;
use super::coupon::AppliedCoupon;
use super::money::{DiscountPercent, Money};
use super::pricing::Quote;
use super::unit::RentalUnit;
use crate::error::{BookingError, Result};

pub const METADATA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    ApartmentId,
    ApartmentName,
    CheckIn,
    CheckOut,
    Email,
    GuestName,
    Country,
    PhoneNumber,
    NumberOfGuests,
    HasPets,
    ExtraBed,
    Price,
    AcceptedRules,
    CouponCode,
    DiscountPercent,
    MetadataVersion,
}

impl MetadataKey {
    pub const ALL: [Self; 16] = [
        Self::ApartmentId,
        Self::ApartmentName,
        Self::CheckIn,
        Self::CheckOut,
        Self::Email,
        Self::GuestName,
        Self::Country,
        Self::PhoneNumber,
        Self::NumberOfGuests,
        Self::HasPets,
        Self::ExtraBed,
        Self::Price,
        Self::AcceptedRules,
        Self::CouponCode,
        Self::DiscountPercent,
        Self::MetadataVersion,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApartmentId => "apartmentId",
            Self::ApartmentName => "apartmentName",
            Self::CheckIn => "checkIn",
            Self::CheckOut => "checkOut",
            Self::Email => "email",
            Self::GuestName => "guestName",
            Self::Country => "country",
            Self::PhoneNumber => "phoneNumber",
            Self::NumberOfGuests => "numberOfGuests",
            Self::HasPets => "hasPets",
            Self::ExtraBed => "extraBed",
            Self::Price => "price",
            Self::AcceptedRules => "acceptedRules",
            Self::CouponCode => "couponCode",
            Self::DiscountPercent => "discountPercent",
            Self::MetadataVersion => "metadataVersion",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every booking field, as replicated into the checkout session metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub version: u32,
    pub unit_id: String,
    pub unit_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub email: String,
    pub guest_name: String,
    pub country: String,
    pub phone: String,
    pub guests: u32,
    pub has_pets: bool,
    pub extra_bed: bool,
    pub price: Money,
    pub accepted_rules: bool,
    pub coupon: Option<AppliedCoupon>,
}

impl CheckoutMetadata {
    pub fn new(request: &BookingRequest, unit: &RentalUnit, quote: &Quote) -> Self {
        let guest = request.guest();
        Self {
            version: METADATA_VERSION,
            unit_id: request.unit_id().to_string(),
            unit_name: unit.name.clone(),
            check_in: request.check_in(),
            check_out: request.check_out(),
            email: guest.email.clone(),
            guest_name: guest.name.clone(),
            country: guest.country.clone(),
            phone: guest.phone.clone(),
            guests: request.add_ons().guests,
            has_pets: request.add_ons().has_pets,
            extra_bed: request.add_ons().extra_bed,
            price: quote.total,
            accepted_rules: true,
            coupon: quote.coupon.clone(),
        }
    }

    pub fn to_pairs(&self) -> Vec<(MetadataKey, String)> {
        let mut pairs = vec![
            (MetadataKey::ApartmentId, self.unit_id.clone()),
            (MetadataKey::ApartmentName, self.unit_name.clone()),
            (
                MetadataKey::CheckIn,
                self.check_in.format(DATE_FORMAT).to_string(),
            ),
            (
                MetadataKey::CheckOut,
                self.check_out.format(DATE_FORMAT).to_string(),
            ),
            (MetadataKey::Email, self.email.clone()),
            (MetadataKey::GuestName, self.guest_name.clone()),
            (MetadataKey::Country, self.country.clone()),
            (MetadataKey::PhoneNumber, self.phone.clone()),
            (MetadataKey::NumberOfGuests, self.guests.to_string()),
            (MetadataKey::HasPets, self.has_pets.to_string()),
            (MetadataKey::ExtraBed, self.extra_bed.to_string()),
            (MetadataKey::Price, self.price.to_string()),
            (MetadataKey::AcceptedRules, self.accepted_rules.to_string()),
        ];
        if let Some(ref coupon) = self.coupon {
            pairs.push((MetadataKey::CouponCode, coupon.code.clone()));
            pairs.push((
                MetadataKey::DiscountPercent,
                percent_string(coupon.discount),
            ));
        }
        pairs.push((MetadataKey::MetadataVersion, self.version.to_string()));
        pairs
    }

    /// Rebuild metadata from raw key/value strings, e.g. as echoed back by
    /// the gateway's webhook. Unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let get = |key: MetadataKey| lookup(pairs, key);
        let require = |key: MetadataKey| {
            lookup(pairs, key).ok_or_else(|| BookingError::InvalidInput {
                reason: format!("metadata is missing '{key}'"),
            })
        };

        let version = parse_field(MetadataKey::MetadataVersion, require(MetadataKey::MetadataVersion)?)?;
        if version != METADATA_VERSION {
            return Err(BookingError::InvalidInput {
                reason: format!("unsupported metadata version {version}"),
            });
        }

        let price: f64 = parse_field(MetadataKey::Price, require(MetadataKey::Price)?)?;
        let coupon = match (get(MetadataKey::CouponCode), get(MetadataKey::DiscountPercent)) {
            (Some(code), Some(pct)) => Some(AppliedCoupon {
                code: code.to_string(),
                discount: DiscountPercent::from_percent(parse_field(
                    MetadataKey::DiscountPercent,
                    pct,
                )?)?,
            }),
            (None, None) => None,
            _ => {
                return Err(BookingError::InvalidInput {
                    reason: "metadata has only one of couponCode / discountPercent".into(),
                });
            }
        };

        Ok(Self {
            version,
            unit_id: require(MetadataKey::ApartmentId)?.to_string(),
            unit_name: require(MetadataKey::ApartmentName)?.to_string(),
            check_in: parse_date(MetadataKey::CheckIn, require(MetadataKey::CheckIn)?)?,
            check_out: parse_date(MetadataKey::CheckOut, require(MetadataKey::CheckOut)?)?,
            email: require(MetadataKey::Email)?.to_string(),
            guest_name: require(MetadataKey::GuestName)?.to_string(),
            country: require(MetadataKey::Country)?.to_string(),
            phone: require(MetadataKey::PhoneNumber)?.to_string(),
            guests: parse_field(MetadataKey::NumberOfGuests, require(MetadataKey::NumberOfGuests)?)?,
            has_pets: parse_field(MetadataKey::HasPets, require(MetadataKey::HasPets)?)?,
            extra_bed: parse_field(MetadataKey::ExtraBed, require(MetadataKey::ExtraBed)?)?,
            price: Money::from_decimal(price)?,
            accepted_rules: parse_field(
                MetadataKey::AcceptedRules,
                require(MetadataKey::AcceptedRules)?,
            )?,
            coupon,
        })
    }
}

fn lookup<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)], key: MetadataKey) -> Option<&str> {
    pairs
        .iter()
        .find(|(k, _)| k.as_ref() == key.as_str())
        .map(|(_, v)| v.as_ref())
}

fn percent_string(discount: DiscountPercent) -> String {
    discount.to_string().trim_end_matches('%').to_string()
}

fn parse_field<T: std::str::FromStr>(key: MetadataKey, value: &str) -> Result<T> {
    value.parse().map_err(|_| BookingError::InvalidInput {
        reason: format!("metadata '{key}' has invalid value '{value}'"),
    })
}

fn parse_date(key: MetadataKey, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| BookingError::InvalidInput {
        reason: format!("metadata '{key}' is not a YYYY-MM-DD date: '{value}'"),
    })
}

/// Request to open a checkout session with the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub unit_id: String,
    pub product_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

impl CheckoutRequest {
    /// Flat form-encoded parameter set for the gateway.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
            ("customer_email".into(), self.customer_email.clone()),
            (
                "line_items[0][price_data][currency]".into(),
                self.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                self.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                self.amount_minor.to_string(),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
        ];
        pairs.extend(
            self.metadata
                .to_pairs()
                .into_iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value)),
        );
        pairs
    }
}

/// Session created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// What a successful submission hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutHandle {
    pub session_id: String,
    pub redirect_url: String,
    pub quote: Quote,
}

impl std::fmt::Display for CheckoutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Checkout session {} created.", self.session_id)?;
        writeln!(f, "Total to pay: {}", self.quote.total)?;
        writeln!(f, "Complete payment at: {}", self.redirect_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::BookingDraft;
    use crate::domain::pricing::{PricingPolicy, price};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn unit() -> RentalUnit {
        RentalUnit {
            id: "pikulas".into(),
            name: "Pikulas".into(),
            description: None,
            nightly_rate: Money::from_major(120),
            image_url: None,
            extra_bed_allowed: true,
        }
    }

    fn request(coupon: Option<AppliedCoupon>) -> BookingRequest {
        BookingDraft {
            unit_id: "pikulas".into(),
            check_in: Some(date("2025-06-01")),
            check_out: Some(date("2025-06-03")),
            guest_name: Some("Jonas".into()),
            guest_email: Some("jonas@example.com".into()),
            phone: Some("+37061111111".into()),
            country: Some("Lithuania".into()),
            guests: Some(3),
            has_pets: false,
            extra_bed: true,
            rules_accepted: true,
            coupon,
            coupon_code: None,
        }
        .finalize(&PricingPolicy::default())
        .unwrap()
    }

    fn metadata(coupon: Option<AppliedCoupon>) -> CheckoutMetadata {
        let req = request(coupon);
        let quote = price(
            &unit(),
            req.nights(),
            req.add_ons(),
            req.coupon(),
            &PricingPolicy::default(),
        )
        .unwrap();
        CheckoutMetadata::new(&req, &unit(), &quote)
    }

    #[test]
    fn keys_roundtrip_through_parse() {
        for key in MetadataKey::ALL {
            assert_eq!(MetadataKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(MetadataKey::parse("apartment_id"), None);
    }

    #[test]
    fn pairs_use_canonical_dates() {
        let pairs = metadata(None).to_pairs();
        let get = |k: MetadataKey| pairs.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get(MetadataKey::CheckIn), Some("2025-06-01"));
        assert_eq!(get(MetadataKey::CheckOut), Some("2025-06-03"));
        assert_eq!(get(MetadataKey::Price), Some("255.00"));
        assert_eq!(get(MetadataKey::ExtraBed), Some("true"));
        assert_eq!(get(MetadataKey::AcceptedRules), Some("true"));
        assert_eq!(get(MetadataKey::CouponCode), None);
        assert_eq!(get(MetadataKey::MetadataVersion), Some("1"));
    }

    #[test]
    fn from_pairs_restores_metadata() {
        let coupon = AppliedCoupon {
            code: "SPRING".into(),
            discount: DiscountPercent::from_percent(12.5).unwrap(),
        };
        let original = metadata(Some(coupon));
        let raw: Vec<(String, String)> = original
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect();
        let restored = CheckoutMetadata::from_pairs(&raw).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn from_pairs_rejects_missing_and_unknown_version() {
        let raw = vec![("metadataVersion", "1"), ("apartmentId", "x")];
        assert!(CheckoutMetadata::from_pairs(&raw).is_err());
        let raw = vec![("metadataVersion", "2")];
        let err = CheckoutMetadata::from_pairs(&raw).unwrap_err();
        assert!(err.to_string().contains("unsupported metadata version"));
    }

    #[test]
    fn form_pairs_flatten_line_item_and_metadata() {
        let req = CheckoutRequest {
            unit_id: "pikulas".into(),
            product_name: "Pikulas".into(),
            amount_minor: 25_500,
            currency: "eur".into(),
            customer_email: "jonas@example.com".into(),
            success_url: "https://example.com/success".into(),
            cancel_url: "https://example.com/cancel".into(),
            metadata: metadata(None),
        };
        let pairs = req.to_form_pairs();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("25500"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[apartmentId]"), Some("pikulas"));
        assert_eq!(get("metadata[numberOfGuests]"), Some("3"));
        assert!(get("metadata[apartment_id]").is_none());
    }

    #[test]
    fn percent_string_drops_sign() {
        assert_eq!(
            percent_string(DiscountPercent::from_percent(10.0).unwrap()),
            "10"
        );
        assert_eq!(
            percent_string(DiscountPercent::from_percent(12.5).unwrap()),
            "12.5"
        );
    }
}
