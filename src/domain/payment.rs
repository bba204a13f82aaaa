use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-issued key used to poll a submitted payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment status as reported by the backend.
///
/// Values the client does not recognise deserialize to `Unknown` and are
/// treated as non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Response of `POST /api/payments/initiate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitiateResponse {
    pub fn accepted(payment_id: PaymentId) -> Self {
        Self {
            success: true,
            payment_id: Some(payment_id),
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            payment_id: None,
            error: Some(reason.into()),
        }
    }
}

/// Response of `GET /api/payments/status/{paymentId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: PaymentStatus,
}

/// Response of `GET /api/test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn unreachable() -> Self {
        Self {
            success: false,
            message: Some("Cannot connect to backend".to_string()),
        }
    }
}

/// Where a payment flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Submission in flight.
    Initiated,
    Polling,
    Confirmed,
    Failed,
    TimedOut,
    /// Gave up after too many consecutive status-check errors.
    Unreachable,
    /// Submission was refused or never reached the backend.
    Rejected,
    /// Torn down by the owner before any other terminal state.
    Cancelled,
}

/// Final result of one payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Confirmed {
        payment_id: PaymentId,
    },
    Failed {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
    TimedOut {
        payment_id: PaymentId,
    },
    Unreachable {
        payment_id: PaymentId,
        consecutive_errors: u32,
    },
    Rejected {
        reason: String,
    },
    SubmissionError {
        reason: String,
    },
    Cancelled,
}

impl PaymentOutcome {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Confirmed { .. } => Phase::Confirmed,
            Self::Failed { .. } => Phase::Failed,
            Self::TimedOut { .. } => Phase::TimedOut,
            Self::Unreachable { .. } => Phase::Unreachable,
            Self::Rejected { .. } | Self::SubmissionError { .. } => Phase::Rejected,
            Self::Cancelled => Phase::Cancelled,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn payment_id(&self) -> Option<&PaymentId> {
        match self {
            Self::Confirmed { payment_id }
            | Self::Failed { payment_id, .. }
            | Self::TimedOut { payment_id }
            | Self::Unreachable { payment_id, .. } => Some(payment_id),
            _ => None,
        }
    }
}
