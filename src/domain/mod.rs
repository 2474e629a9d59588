pub mod availability;
pub mod booking;
pub mod checkout;
pub mod coupon;
pub mod money;
pub mod pricing;
pub mod reservation;
pub mod selection;
pub mod unit;
