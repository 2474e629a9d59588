use async_trait::async_trait;

use crate::domain::checkout::{CheckoutRequest, CheckoutSession};
use crate::error::Result;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Non-success responses surface as
    /// [`BookingError::Gateway`](crate::error::BookingError::Gateway).
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}
