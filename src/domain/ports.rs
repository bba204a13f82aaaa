use super::message::StatusMessage;
use super::payment::{HealthStatus, InitiateResponse, PaymentId, StatusResponse};
use super::request::PaymentRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// The backend payment API.
///
/// `Err` means the call never produced a usable response (network failure,
/// unreadable body). A backend that answers but refuses a payment returns
/// `Ok` with `success: false`.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateResponse>;
    async fn status(&self, payment_id: &PaymentId) -> Result<StatusResponse>;
    async fn health(&self) -> HealthStatus;
}

/// Receives user-visible status updates.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: StatusMessage);
}

impl StatusSink for UnboundedSender<StatusMessage> {
    fn notify(&self, message: StatusMessage) {
        // The receiver going away just means nobody is watching anymore.
        let _ = self.send(message);
    }
}

pub type PaymentApiRef = Arc<dyn PaymentApi>;
pub type StatusSinkRef = Arc<dyn StatusSink>;
