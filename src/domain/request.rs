use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::fmt;

/// Prefix carried by internationally formatted Kenyan numbers.
const COUNTRY_PREFIX: &str = "254";

/// A payer's mobile-money number.
///
/// Accepts either the 10-digit local form (`0712345678`) or the 12-digit
/// international form (`254708374149`). The number is kept exactly as entered,
/// minus surrounding whitespace; the backend owns normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let all_digits = !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit());
        let valid = all_digits
            && (trimmed.len() == 10
                || (trimmed.len() == 12 && trimmed.starts_with(COUNTRY_PREFIX)));

        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(PaymentError::Validation(format!(
                "'{raw}' is not a valid phone number (expected 10 digits or 254XXXXXXXXX)"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Price of a video in whole currency units.
///
/// Always positive. Sourced from the video record and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation("Amount must be positive".to_string()))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = PaymentError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the video being unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PaymentError::Validation("Video id must not be empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single submission attempt. Serializes to the body of the initiate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    phone: PhoneNumber,
    amount: Amount,
    video_id: VideoId,
}

impl PaymentRequest {
    pub fn new(phone: PhoneNumber, amount: Amount, video_id: VideoId) -> Self {
        Self {
            phone,
            amount,
            video_id,
        }
    }

    /// Validates raw caller input and builds a request in one step.
    pub fn parse(phone: &str, amount: u64, video_id: &str) -> Result<Self> {
        Ok(Self::new(
            PhoneNumber::parse(phone)?,
            Amount::new(amount)?,
            VideoId::new(video_id)?,
        ))
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }
}
