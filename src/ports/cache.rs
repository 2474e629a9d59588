use std::time::Duration;

use crate::domain::unit::RentalUnit;

/// Cache for unit reference data. Reservations are never cached.
pub trait UnitCache: Send + Sync {
    fn get(&self, unit_id: &str) -> Option<RentalUnit>;
    fn set(&self, unit: &RentalUnit, ttl: Duration);
}
