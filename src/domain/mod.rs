//! Domain types and the ports the application layer depends on.

pub mod message;
pub mod payment;
pub mod ports;
pub mod request;
