use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::store_call;
use crate::domain::availability::UnavailableDateSet;
use crate::domain::unit::RentalUnit;
use crate::error::Result;
use crate::ports::cache::UnitCache;
use crate::ports::record_store::RecordStore;

/// Unit lookup through the reference-data cache. Reservations always come
/// straight from the store.
pub struct CachedUnits {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn UnitCache>,
    ttl: Duration,
    store_timeout: Duration,
}

impl CachedUnits {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn UnitCache>,
        ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            store_timeout,
        }
    }

    pub async fn unit(&self, unit_id: &str) -> Result<RentalUnit> {
        if let Some(unit) = self.cache.get(unit_id) {
            debug!(unit_id, "Unit cache hit");
            return Ok(unit);
        }
        let unit = store_call(
            self.store_timeout,
            "unit lookup",
            self.store.fetch_unit(unit_id),
        )
        .await?;
        self.cache.set(&unit, self.ttl);
        Ok(unit)
    }

    /// The unit plus an availability index built from a fresh reservation fetch.
    pub async fn availability(&self, unit_id: &str) -> Result<(RentalUnit, UnavailableDateSet)> {
        let unit = self.unit(unit_id).await?;
        let reservations = store_call(
            self.store_timeout,
            "bookings query",
            self.store.fetch_reservations(&unit),
        )
        .await?;
        let unavailable = UnavailableDateSet::from_reservations(&unit.id, &reservations);
        debug!(unit_id, booked_nights = unavailable.len(), "Availability recomputed");
        Ok((unit, unavailable))
    }
}
