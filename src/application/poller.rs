use crate::application::guard::ResolutionGuard;
use crate::domain::message::{StatusMessage, rejection_reason};
use crate::domain::payment::{
    InitiateResponse, PaymentId, PaymentOutcome, PaymentStatus, Phase, StatusResponse,
};
use crate::domain::ports::{PaymentApi, PaymentApiRef, StatusSink, StatusSinkRef};
use crate::domain::request::PaymentRequest;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Stand-in for delays too large to add to the current instant (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Timing policy for a payment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Fixed wait before each status check. No backoff.
    pub interval: Duration,
    /// Ceiling measured from the start of polling.
    pub timeout: Duration,
    /// Consecutive failed status checks tolerated before giving up. `0` disables the cap.
    pub max_consecutive_errors: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Invoked once when a payment is confirmed.
pub type SuccessCallback = Box<dyn FnOnce() + Send + 'static>;

/// Starts payment flows against a backend.
///
/// Every call to [`PaymentPoller::start`] spawns an independent task with its
/// own timers and cancellation signal; flows share nothing but the API client.
#[derive(Clone)]
pub struct PaymentPoller {
    api: PaymentApiRef,
    config: PollerConfig,
}

impl PaymentPoller {
    pub fn new(api: PaymentApiRef, config: PollerConfig) -> Self {
        Self { api, config }
    }

    /// Submits `request` and watches it until it resolves.
    ///
    /// Status updates go to `sink`. `on_success` runs at most once, only on
    /// confirmation. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        request: PaymentRequest,
        sink: StatusSinkRef,
        on_success: Option<SuccessCallback>,
    ) -> PaymentHandle {
        let guard = Arc::new(ResolutionGuard::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(Phase::Initiated);

        let flow = PaymentFlow {
            api: self.api.clone(),
            config: self.config,
            sink,
            on_success,
            guard: guard.clone(),
            cancel: cancel_rx,
            phase: phase_tx,
        };

        PaymentHandle {
            task: Some(tokio::spawn(flow.run(request))),
            cancel: cancel_tx,
            guard,
            phase: phase_rx,
        }
    }

    /// Like [`PaymentPoller::start`], but streams status messages through a
    /// channel. The stream ends when the flow does.
    pub fn pay(
        &self,
        request: PaymentRequest,
        on_success: Option<SuccessCallback>,
    ) -> (PaymentHandle, mpsc::UnboundedReceiver<StatusMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.start(request, Arc::new(tx), on_success), rx)
    }
}

/// Owner's handle on a running payment flow.
///
/// Dropping the handle before the flow finishes cancels it: pending timers are
/// released and no further message or callback fires.
pub struct PaymentHandle {
    task: Option<JoinHandle<PaymentOutcome>>,
    cancel: watch::Sender<bool>,
    guard: Arc<ResolutionGuard>,
    phase: watch::Receiver<Phase>,
}

impl PaymentHandle {
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the flow unless it already reached a terminal state.
    ///
    /// Returns `true` if this call was the resolution.
    pub fn cancel(&self) -> bool {
        if self.guard.try_resolve() {
            let _ = self.cancel.send(true);
            true
        } else {
            false
        }
    }

    /// Waits for the flow to end and returns how it ended.
    pub async fn wait(mut self) -> PaymentOutcome {
        let Some(task) = self.task.take() else {
            return PaymentOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "payment flow did not complete");
                PaymentOutcome::Cancelled
            }
        }
    }
}

impl Drop for PaymentHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take()
            && !task.is_finished()
        {
            self.guard.try_resolve();
            task.abort();
        }
    }
}

enum Interrupt {
    Cancelled,
    Deadline,
}

/// Resolves once the owner asks for cancellation or drops its handle.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|requested| *requested).await;
}

/// The instant `delay` from now, or [`FAR_FUTURE`] from now when that overflows.
fn instant_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn interruptible<F: Future>(
    cancel: &mut watch::Receiver<bool>,
    deadline: Instant,
    fut: F,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(Interrupt::Cancelled),
        _ = sleep_until(deadline) => Err(Interrupt::Deadline),
        output = fut => Ok(output),
    }
}

/// State owned by one spawned payment task.
struct PaymentFlow {
    api: PaymentApiRef,
    config: PollerConfig,
    sink: StatusSinkRef,
    on_success: Option<SuccessCallback>,
    guard: Arc<ResolutionGuard>,
    cancel: watch::Receiver<bool>,
    phase: watch::Sender<Phase>,
}

impl PaymentFlow {
    #[tracing::instrument(
        name = "payment",
        skip_all,
        fields(video_id = %request.video_id(), amount = request.amount().value())
    )]
    async fn run(mut self, request: PaymentRequest) -> PaymentOutcome {
        match self.submit(&request).await {
            Ok(payment_id) => self.poll(payment_id).await,
            Err(outcome) => outcome,
        }
    }

    async fn submit(&mut self, request: &PaymentRequest) -> Result<PaymentId, PaymentOutcome> {
        let response = tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => None,
            response = self.api.initiate(request) => Some(response),
        };
        let Some(response) = response else {
            return Err(self.cancelled());
        };

        match response {
            Err(err) => {
                warn!(error = %err, "payment submission failed");
                let reason = err.to_string();
                Err(self.finish(
                    PaymentOutcome::SubmissionError {
                        reason: reason.clone(),
                    },
                    StatusMessage::SubmissionError(reason),
                ))
            }
            Ok(InitiateResponse {
                success: true,
                payment_id: Some(payment_id),
                ..
            }) => {
                if self.guard.is_resolved() {
                    return Err(self.cancelled());
                }
                info!(%payment_id, "payment initiated");
                self.sink.notify(StatusMessage::Initiated);
                self.set_phase(Phase::Polling);
                Ok(payment_id)
            }
            Ok(InitiateResponse { success, error, .. }) => {
                let reason = if success {
                    "Backend did not return a payment id".to_string()
                } else {
                    rejection_reason(error.as_deref())
                };
                info!(%reason, "payment rejected");
                Err(self.finish(
                    PaymentOutcome::Rejected {
                        reason: reason.clone(),
                    },
                    StatusMessage::Rejected(reason),
                ))
            }
        }
    }

    async fn poll(&mut self, payment_id: PaymentId) -> PaymentOutcome {
        let deadline = instant_after(self.config.timeout);
        let cap = self.config.max_consecutive_errors;
        let mut checks: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            let next_check = instant_after(self.config.interval);
            if let Err(interrupt) =
                interruptible(&mut self.cancel, deadline, sleep_until(next_check)).await
            {
                return self.interrupted(interrupt, payment_id, checks);
            }

            checks += 1;
            let checked =
                interruptible(&mut self.cancel, deadline, self.api.status(&payment_id)).await;
            let response = match checked {
                Ok(response) => response,
                Err(interrupt) => return self.interrupted(interrupt, payment_id, checks),
            };

            match response {
                Ok(StatusResponse { status }) => {
                    consecutive_errors = 0;
                    debug!(%payment_id, check = checks, ?status, "status checked");
                    match status {
                        PaymentStatus::Success => {
                            info!(%payment_id, checks, "payment confirmed");
                            return self.finish(
                                PaymentOutcome::Confirmed { payment_id },
                                StatusMessage::Confirmed,
                            );
                        }
                        PaymentStatus::Failed | PaymentStatus::Cancelled => {
                            info!(%payment_id, checks, ?status, "payment failed");
                            return self.finish(
                                PaymentOutcome::Failed { payment_id, status },
                                StatusMessage::Failed,
                            );
                        }
                        PaymentStatus::Pending => {}
                        PaymentStatus::Unknown => {
                            warn!(%payment_id, "unrecognised payment status, still waiting");
                        }
                    }
                }
                Err(err) => {
                    consecutive_errors += 1;
                    warn!(%payment_id, error = %err, consecutive_errors, "status check failed");
                    if cap > 0 && consecutive_errors >= cap {
                        return self.finish(
                            PaymentOutcome::Unreachable {
                                payment_id,
                                consecutive_errors,
                            },
                            StatusMessage::Unreachable,
                        );
                    }
                }
            }
        }
    }

    fn interrupted(
        &mut self,
        interrupt: Interrupt,
        payment_id: PaymentId,
        checks: u32,
    ) -> PaymentOutcome {
        match interrupt {
            Interrupt::Cancelled => self.cancelled(),
            Interrupt::Deadline => {
                info!(%payment_id, checks, "gave up waiting for payment");
                self.finish(
                    PaymentOutcome::TimedOut { payment_id },
                    StatusMessage::TimedOut,
                )
            }
        }
    }

    /// Applies a terminal outcome if no other path got there first.
    fn finish(&mut self, outcome: PaymentOutcome, message: StatusMessage) -> PaymentOutcome {
        if !self.guard.try_resolve() {
            return self.cancelled();
        }
        self.set_phase(outcome.phase());
        self.sink.notify(message);
        if outcome.is_confirmed()
            && let Some(on_success) = self.on_success.take()
        {
            on_success();
        }
        outcome
    }

    fn cancelled(&mut self) -> PaymentOutcome {
        debug!("payment flow cancelled");
        self.set_phase(Phase::Cancelled);
        PaymentOutcome::Cancelled
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}
