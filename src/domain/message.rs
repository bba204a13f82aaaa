use std::fmt;

const DEFAULT_REJECTION: &str = "Payment failed";

/// The reason shown for a refused submission: the backend's text as sent, or a
/// generic fallback when it is missing or empty.
pub fn rejection_reason(reason: Option<&str>) -> String {
    reason
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REJECTION)
        .to_string()
}

/// How a host should style a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Warning,
    Error,
}

/// A human-readable status update emitted during a payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Initiated,
    Confirmed,
    Failed,
    TimedOut,
    Unreachable,
    Rejected(String),
    SubmissionError(String),
}

impl StatusMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Initiated | Self::Confirmed => MessageKind::Success,
            Self::TimedOut | Self::Unreachable => MessageKind::Warning,
            Self::Failed | Self::Rejected(_) | Self::SubmissionError(_) => MessageKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Initiated)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiated => f.write_str("✅ Payment initiated! Check your phone to complete."),
            Self::Confirmed => f.write_str("🎉 Payment confirmed! Video unlocked."),
            Self::Failed => f.write_str("❌ Payment failed. Please try again."),
            Self::TimedOut => f.write_str(
                "⚠️ Payment taking longer than expected. Please check your M-Pesa messages.",
            ),
            Self::Unreachable => f.write_str(
                "⚠️ Unable to confirm payment status. Please check your M-Pesa messages.",
            ),
            Self::Rejected(reason) => write!(f, "❌ {reason}"),
            Self::SubmissionError(reason) => write!(f, "❌ Error: {reason}"),
        }
    }
}
