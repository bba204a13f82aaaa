use crate::domain::payment::{
    HealthStatus, InitiateResponse, PaymentId, PaymentStatus, StatusResponse,
};
use crate::domain::ports::PaymentApi;
use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Test number that the sandbox always confirms.
pub const SANDBOX_PHONE: &str = "254708374149";

/// Largest amount a single mobile-money transaction may carry.
pub const MAX_TRANSACTION_AMOUNT: u64 = 150_000;

#[derive(Debug, Clone)]
struct SandboxPayment {
    remaining_pending: u32,
    settles_as: PaymentStatus,
    status_calls: u32,
}

/// An in-memory stand-in for the payment backend.
///
/// Payments from [`SANDBOX_PHONE`] report `pending` a configurable number of
/// times, then `success`; any other number settles as `failed`. Amounts over
/// [`MAX_TRANSACTION_AMOUNT`] are refused at submission. Clones share state.
#[derive(Debug, Clone)]
pub struct SandboxPaymentApi {
    payments: Arc<RwLock<HashMap<PaymentId, SandboxPayment>>>,
    submissions: Arc<AtomicU64>,
    pending_polls: u32,
}

impl Default for SandboxPaymentApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxPaymentApi {
    pub fn new() -> Self {
        Self {
            payments: Arc::default(),
            submissions: Arc::default(),
            pending_polls: 2,
        }
    }

    /// Number of `pending` answers before a payment settles.
    pub fn with_pending_polls(mut self, pending_polls: u32) -> Self {
        self.pending_polls = pending_polls;
        self
    }

    /// Total submissions received, accepted or not.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Status checks received for `payment_id`.
    pub async fn status_calls(&self, payment_id: &PaymentId) -> u32 {
        let payments = self.payments.read().await;
        payments.get(payment_id).map_or(0, |p| p.status_calls)
    }
}

#[async_trait]
impl PaymentApi for SandboxPaymentApi {
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateResponse> {
        let sequence = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;

        if request.amount().value() > MAX_TRANSACTION_AMOUNT {
            return Ok(InitiateResponse::rejected(format!(
                "Amount exceeds the transaction limit of {MAX_TRANSACTION_AMOUNT}"
            )));
        }

        let settles_as = if request.phone().as_str() == SANDBOX_PHONE {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };
        let payment_id = PaymentId::new(format!("sandbox-{sequence}"));

        let mut payments = self.payments.write().await;
        payments.insert(
            payment_id.clone(),
            SandboxPayment {
                remaining_pending: self.pending_polls,
                settles_as,
                status_calls: 0,
            },
        );
        Ok(InitiateResponse::accepted(payment_id))
    }

    async fn status(&self, payment_id: &PaymentId) -> Result<StatusResponse> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(payment_id)
            .ok_or_else(|| PaymentError::Transport(format!("unknown payment {payment_id}")))?;

        payment.status_calls += 1;
        let status = if payment.remaining_pending > 0 {
            payment.remaining_pending -= 1;
            PaymentStatus::Pending
        } else {
            payment.settles_as
        };
        Ok(StatusResponse { status })
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            success: true,
            message: Some("Sandbox backend".to_string()),
        }
    }
}
