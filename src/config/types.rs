use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::domain::pricing::PricingPolicy;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Which `bookings` column identifies the unit.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKey {
    #[default]
    ApartmentId,
    /// Lower-case slug of the unit name (older booking rows).
    ApartmentName,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    /// Environment variable holding the store API key.
    #[serde(default = "default_store_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub reservation_key: ReservationKey,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            api_key_env: default_store_key_env(),
            request_timeout_secs: default_timeout(),
            max_retries: 0,
            reservation_key: ReservationKey::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    /// Environment variable holding the gateway secret key. The key itself
    /// never appears in the config file.
    #[serde(default = "default_gateway_key_env")]
    pub secret_key_env: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_success_url")]
    pub success_url: String,
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            secret_key_env: default_gateway_key_env(),
            currency: default_currency(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            request_timeout_secs: default_timeout(),
        }
    }
}

/// Fees are in whole or fractional currency units, e.g. `10` or `12.5`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_pet_fee")]
    pub pet_fee: f64,
    #[serde(default = "default_extra_bed_fee")]
    pub extra_bed_fee: f64,
    #[serde(default = "default_max_guests")]
    pub max_guests: u32,
    /// Units that allow an extra bed when the store row has no flag.
    #[serde(default = "default_extra_bed_units")]
    pub extra_bed_units: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            pet_fee: default_pet_fee(),
            extra_bed_fee: default_extra_bed_fee(),
            max_guests: default_max_guests(),
            extra_bed_units: default_extra_bed_units(),
        }
    }
}

impl PricingConfig {
    pub fn policy(&self) -> crate::error::Result<PricingPolicy> {
        Ok(PricingPolicy {
            pet_fee: Money::from_decimal(self.pet_fee)?,
            extra_bed_fee: Money::from_decimal(self.extra_bed_fee)?,
            max_guests: self.max_guests,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_unit_ttl")]
    pub unit_ttl_secs: u64,
    /// Upper bound on concurrent date-selection sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions untouched for this long are forgotten.
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            unit_ttl_secs: default_unit_ttl(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:54321".into()
}

fn default_store_key_env() -> String {
    "BOOKING_STORE_API_KEY".into()
}

fn default_gateway_url() -> String {
    "https://api.stripe.com".into()
}

fn default_gateway_key_env() -> String {
    "BOOKING_GATEWAY_SECRET_KEY".into()
}

fn default_currency() -> String {
    "eur".into()
}

fn default_success_url() -> String {
    "http://localhost:5173/success".into()
}

fn default_cancel_url() -> String {
    "http://localhost:5173/fail".into()
}

fn default_timeout() -> u64 {
    15
}

fn default_pet_fee() -> f64 {
    10.0
}

fn default_extra_bed_fee() -> f64 {
    15.0
}

fn default_max_guests() -> u32 {
    12
}

fn default_extra_bed_units() -> Vec<String> {
    vec!["pikulas".into()]
}

fn default_max_entries() -> usize {
    100
}

fn default_unit_ttl() -> u64 {
    600
}

fn default_max_sessions() -> usize {
    1_000
}

fn default_session_idle() -> u64 {
    3_600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.store.request_timeout_secs, 15);
        assert_eq!(config.store.max_retries, 0);
        assert_eq!(config.store.reservation_key, ReservationKey::ApartmentId);
        assert_eq!(config.gateway.base_url, "https://api.stripe.com");
        assert_eq!(config.gateway.currency, "eur");
        assert_eq!(config.pricing.max_guests, 12);
        assert_eq!(config.pricing.extra_bed_units, vec!["pikulas".to_string()]);
    }

    #[test]
    fn default_policy_matches_house_fees() {
        let policy = PricingConfig::default().policy().unwrap();
        assert_eq!(policy, PricingPolicy::default());
    }

    #[test]
    fn negative_fee_rejected() {
        let cfg = PricingConfig {
            pet_fee: -5.0,
            ..Default::default()
        };
        assert!(cfg.policy().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let original = Config::default();
        let yaml = serde_yml::to_string(&original).unwrap();
        let restored: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(restored.store.base_url, original.store.base_url);
        assert_eq!(restored.cache.max_entries, original.cache.max_entries);
        assert!((restored.pricing.pet_fee - original.pricing.pet_fee).abs() < f64::EPSILON);
    }

    #[test]
    fn config_deserialize_with_overrides() {
        let yaml = "store:\n  reservation_key: apartment_name\npricing:\n  pet_fee: 12.5";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.store.reservation_key, ReservationKey::ApartmentName);
        assert_eq!(
            config.pricing.policy().unwrap().pet_fee,
            Money::from_minor(1_250)
        );
        // Other fields get defaults
        assert_eq!(config.gateway.request_timeout_secs, 15);
        assert_eq!(config.cache.unit_ttl_secs, 600);
        assert_eq!(config.cache.max_sessions, 1_000);
        assert_eq!(config.cache.session_idle_secs, 3_600);
    }
}
