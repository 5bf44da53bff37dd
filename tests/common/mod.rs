//! Shared fixtures: a scripted in-memory transport and client helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use service_request::client::PreparedRequest;
use service_request::transport::{RawResponse, Transport, TransportError};
use service_request::{ClientConfig, FlatRequestClient, RequestClient, RequestClientBuilder};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "http://api.test/api";

/// One scripted attempt outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Respond { status: u16, body: Bytes },
    NetworkError,
    /// The request could not be built.
    RequestError,
    Timeout,
    /// Never completes; only cancellation ends the attempt.
    Hang,
}

pub fn json(status: u16, body: serde_json::Value) -> Step {
    Step::Respond {
        status,
        body: Bytes::from(body.to_string()),
    }
}

pub fn text(status: u16, body: &str) -> Step {
    Step::Respond {
        status,
        body: Bytes::from(body.to_string()),
    }
}

/// Plays steps in order; the last step repeats forever.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        assert!(!steps.is_empty());
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<PreparedRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        }
    }

    /// Poll until at least `n` attempts reached the transport.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..2_000 {
            if self.calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("transport saw {} calls, expected {}", self.calls(), n);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            Step::Respond { status, body } => Ok(RawResponse {
                status,
                headers: HeaderMap::new(),
                url: request.url.to_string(),
                body,
            }),
            Step::NetworkError => Err(TransportError::Other("connection refused".into())),
            Step::RequestError => Err(TransportError::Request("invalid body".into())),
            Step::Timeout => Err(TransportError::Timeout),
            Step::Hang => std::future::pending().await,
        }
    }
}

pub fn builder(transport: Arc<ScriptedTransport>) -> RequestClientBuilder {
    RequestClientBuilder::new()
        .with_config(ClientConfig::new().with_base_url(BASE_URL))
        .with_transport(transport)
}

pub fn flat_client(transport: Arc<ScriptedTransport>) -> FlatRequestClient {
    builder(transport).build_flat().unwrap()
}

pub fn client(transport: Arc<ScriptedTransport>) -> RequestClient {
    builder(transport).build().unwrap()
}
