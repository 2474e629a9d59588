pub mod client;

pub use client::StripeGateway;
