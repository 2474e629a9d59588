pub mod cache;
pub mod clock;
pub mod payment_gateway;
pub mod record_store;
