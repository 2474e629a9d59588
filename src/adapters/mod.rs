pub mod cache;
pub mod clock;
pub mod rest_store;
pub mod stripe;
