use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use paywall_poller::application::poller::{PaymentPoller, PollerConfig};
use paywall_poller::domain::payment::PaymentOutcome;
use paywall_poller::domain::ports::{PaymentApi, PaymentApiRef};
use paywall_poller::domain::request::PaymentRequest;
use paywall_poller::infrastructure::http::{ApiConfig, DEFAULT_API_URL, HttpPaymentApi};
use paywall_poller::infrastructure::sandbox::SandboxPaymentApi;
use paywall_poller::interfaces::console::MessageWriter;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the payment backend.
    #[arg(long, global = true, env = "PAYWALL_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Sent as the `user-id` header when submitting payments.
    #[arg(long, env = "PAYWALL_USER_ID")]
    user_id: Option<String>,

    /// Timeout for each HTTP request (seconds).
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Use the in-memory sandbox backend instead of the HTTP API.
    #[arg(long, global = true)]
    sandbox: bool,

    /// Pending answers the sandbox gives before settling.
    #[arg(long, global = true, default_value_t = 2)]
    sandbox_pending: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pay for a video and wait for confirmation.
    Pay {
        /// Payer's M-Pesa number (0712345678 or 254712345678).
        #[arg(long)]
        phone: String,

        /// Price of the video.
        #[arg(long)]
        amount: u64,

        /// Video to unlock.
        #[arg(long)]
        video_id: String,

        /// Delay between status checks (milliseconds).
        #[arg(long, default_value_t = 3000)]
        interval_ms: u64,

        /// Stop waiting after this long (seconds).
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,

        /// Consecutive failed status checks tolerated; 0 disables the cap.
        #[arg(long, default_value_t = 10)]
        max_errors: u32,
    },
    /// Check whether the backend is reachable.
    Ping,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let api: PaymentApiRef = if cli.sandbox {
        info!("using sandbox backend");
        Arc::new(SandboxPaymentApi::new().with_pending_polls(cli.sandbox_pending))
    } else {
        Arc::new(
            HttpPaymentApi::new(ApiConfig {
                base_url: cli.api_url.clone(),
                user_id: cli.user_id.clone(),
                request_timeout: Duration::from_secs(cli.request_timeout_secs),
            })
            .into_diagnostic()?,
        )
    };

    let stdout = io::stdout();
    let mut writer = MessageWriter::new(stdout.lock());

    match cli.command {
        Command::Ping => {
            let health = api.health().await;
            writer.write_health(&health).into_diagnostic()?;
            Ok(if health.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Pay {
            phone,
            amount,
            video_id,
            interval_ms,
            timeout_secs,
            max_errors,
        } => {
            let request = PaymentRequest::parse(&phone, amount, &video_id).into_diagnostic()?;
            let poller = PaymentPoller::new(
                api,
                PollerConfig {
                    interval: Duration::from_millis(interval_ms),
                    timeout: Duration::from_secs(timeout_secs),
                    max_consecutive_errors: max_errors,
                },
            );

            let (handle, mut messages) = poller.pay(request, None);
            writer.follow(&mut messages).await.into_diagnostic()?;
            let outcome = handle.wait().await;
            info!(?outcome, "payment flow finished");

            Ok(exit_code(&outcome))
        }
    }
}

fn exit_code(outcome: &PaymentOutcome) -> ExitCode {
    match outcome {
        PaymentOutcome::Confirmed { .. } => ExitCode::SUCCESS,
        PaymentOutcome::TimedOut { .. } | PaymentOutcome::Unreachable { .. } => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
