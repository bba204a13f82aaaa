#![allow(dead_code)]

use async_trait::async_trait;
use paywall_poller::application::poller::SuccessCallback;
use paywall_poller::domain::message::StatusMessage;
use paywall_poller::domain::payment::{
    HealthStatus, InitiateResponse, PaymentId, PaymentStatus, StatusResponse,
};
use paywall_poller::domain::ports::{PaymentApi, StatusSink};
use paywall_poller::domain::request::PaymentRequest;
use paywall_poller::error::{PaymentError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How the fake backend answers the submission.
#[derive(Debug, Clone)]
pub enum Submit {
    Accept(&'static str),
    AcceptWithoutId,
    Reject(Option<&'static str>),
    TransportError(&'static str),
}

/// One scripted answer to a status check.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Status(PaymentStatus),
    TransportError,
}

pub fn pending() -> Step {
    Step::Status(PaymentStatus::Pending)
}

pub fn success() -> Step {
    Step::Status(PaymentStatus::Success)
}

/// A backend that replays a script and counts calls.
pub struct ScriptedApi {
    submit: Submit,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    status_delay: Duration,
    initiate_calls: AtomicU32,
    status_calls: AtomicU32,
}

impl ScriptedApi {
    pub fn new(submit: Submit, steps: Vec<Step>) -> Self {
        Self {
            submit,
            steps: Mutex::new(steps.into()),
            fallback: pending(),
            status_delay: Duration::ZERO,
            initiate_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
        }
    }

    /// Answer used once the script runs out.
    pub fn with_fallback(mut self, fallback: Step) -> Self {
        self.fallback = fallback;
        self
    }

    /// Time each status check takes to answer.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn initiate_calls(&self) -> u32 {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentApi for ScriptedApi {
    async fn initiate(&self, _request: &PaymentRequest) -> Result<InitiateResponse> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.submit {
            Submit::Accept(id) => Ok(InitiateResponse::accepted(PaymentId::new(*id))),
            Submit::AcceptWithoutId => Ok(InitiateResponse {
                success: true,
                payment_id: None,
                error: None,
            }),
            Submit::Reject(Some(reason)) => Ok(InitiateResponse::rejected(*reason)),
            Submit::Reject(None) => Ok(InitiateResponse {
                success: false,
                payment_id: None,
                error: None,
            }),
            Submit::TransportError(reason) => Err(PaymentError::Transport(reason.to_string())),
        }
    }

    async fn status(&self, _payment_id: &PaymentId) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match step {
            Step::Status(status) => Ok(StatusResponse { status }),
            Step::TransportError => Err(PaymentError::Transport("network down".to_string())),
        }
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            success: true,
            message: None,
        }
    }
}

/// Sink that keeps every message it receives.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<StatusMessage>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn terminal_messages(&self) -> Vec<StatusMessage> {
        self.messages()
            .into_iter()
            .filter(StatusMessage::is_terminal)
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn notify(&self, message: StatusMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

pub fn counting_callback(counter: &Arc<AtomicUsize>) -> Option<SuccessCallback> {
    let counter = counter.clone();
    Some(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

pub fn sandbox_request() -> PaymentRequest {
    PaymentRequest::parse("254708374149", 1, "v1").unwrap()
}

/// A request as seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync>;

/// Minimal HTTP/1.1 server answering one request per connection.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn spawn(
        handler: impl Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move { serve(socket, handler, recorded).await });
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .count()
    }
}

async fn serve(
    mut socket: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let (status, body) = handler(&request);
    recorded.lock().unwrap().push(request);

    let reason = if status == 200 { "OK" } else { "Stub" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}
