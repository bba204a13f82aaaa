use crate::domain::payment::{HealthStatus, InitiateResponse, PaymentId, StatusResponse};
use crate::domain::ports::PaymentApi;
use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the backend payment API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    /// Sent as the `user-id` header on submissions when set.
    pub user_id: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// [`PaymentApi`] over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpPaymentApi {
    client: Client,
    base_url: Url,
    user_id: Option<String>,
}

impl HttpPaymentApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                PaymentError::Config(format!(
                    "API URL must start with http:// or https://, got '{}'",
                    config.base_url
                ))
            })?;

        let client = Client::builder()
            .user_agent(concat!("paywall-poller/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            user_id: config.user_id,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PaymentError::Config(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiateResponse> {
        let url = self.url(&["api", "payments", "initiate"])?;
        debug!(%url, "submitting payment");

        let mut builder = self.client.post(url).json(request);
        if let Some(user_id) = &self.user_id {
            builder = builder.header("user-id", user_id);
        }
        let response = builder.send().await?;

        // Rejections arrive with error status codes but still carry the JSON body.
        let status = response.status();
        response.json::<InitiateResponse>().await.map_err(|e| {
            PaymentError::Transport(format!("unexpected response ({status}): {e}"))
        })
    }

    async fn status(&self, payment_id: &PaymentId) -> Result<StatusResponse> {
        let url = self.url(&["api", "payments", "status", payment_id.as_str()])?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Transport(format!(
                "status endpoint returned {status}"
            )));
        }
        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| PaymentError::Transport(format!("failed to parse status: {e}")))
    }

    async fn health(&self) -> HealthStatus {
        let Ok(url) = self.url(&["api", "test"]) else {
            return HealthStatus::unreachable();
        };
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "backend health check failed");
                return HealthStatus::unreachable();
            }
        };
        response
            .json::<HealthStatus>()
            .await
            .unwrap_or_else(|_| HealthStatus::unreachable())
    }
}
