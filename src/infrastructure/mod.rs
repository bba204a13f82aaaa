//! Adapters implementing [`crate::domain::ports::PaymentApi`].

pub mod http;
pub mod sandbox;
