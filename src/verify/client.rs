//! Verification transports.
//!
//! The dispatcher only sees the [`VerificationTransport`] trait: one open
//! call per fact, a stream of events back, channel close as the end signal.
//! Production talks to the verifier model over streaming REST
//! ([`GeminiTransport`]); tests script a [`MockTransport`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use log::info;
use serde_json::json;
use tokio::sync::mpsc;

use crate::config::VerifyConfig;
use crate::defaults;
use crate::error::{Result, VerifactError};
use crate::verify::prompt::VerificationRequest;
use crate::verify::sse::SseParser;

/// One event on a verification stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Decoded response text. `grounded` notes that the verifier cited
    /// search results alongside this fragment.
    Delta { text: String, grounded: bool },
    /// The stream died mid-flight; no further events follow.
    Failed(String),
}

impl StreamEvent {
    /// Plain delta convenience for scripting.
    pub fn delta(text: &str) -> Self {
        Self::Delta {
            text: text.to_string(),
            grounded: false,
        }
    }
}

/// Opens one streamed verification per request.
///
/// A connect failure or non-2xx status is an `Err` from `open`; once a
/// receiver is handed out, failures arrive as [`StreamEvent::Failed`].
#[async_trait]
pub trait VerificationTransport: Send + Sync {
    async fn open(&self, request: VerificationRequest) -> Result<mpsc::Receiver<StreamEvent>>;
}

/// Streaming REST client for the verifier model.
pub struct GeminiTransport {
    http: reqwest::Client,
    host: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    system_prompt: String,
}

impl GeminiTransport {
    pub fn new(config: &VerifyConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: config.host.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_output_tokens: config.max_output_tokens,
            system_prompt: config.system_prompt.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/v1beta/{}:streamGenerateContent?key={}&alt=sse",
            self.host, self.model, self.api_key
        )
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
            "systemInstruction": { "parts": [{ "text": self.system_prompt }] },
            "tools": [
                { "googleSearch": {} },
                { "codeExecution": {} },
            ],
        })
    }
}

#[async_trait]
impl VerificationTransport for GeminiTransport {
    async fn open(&self, request: VerificationRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        info!(
            "verifying fact {} ({:?}, answer {:?})",
            request.number, request.question, request.answer
        );
        let body = self.request_body(&request.prompt());
        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| VerifactError::VerificationRequest {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerifactError::VerificationStatus {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel(defaults::STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut stream = response.bytes_stream();
            while let Some(next) = stream.next().await {
                match next {
                    Ok(bytes) => {
                        let chunk = String::from_utf8_lossy(&bytes);
                        for delta in parser.push(&chunk) {
                            let event = StreamEvent::Delta {
                                text: delta.text,
                                grounded: delta.grounded,
                            };
                            // Receiver gone means the session abandoned us.
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(StreamEvent::Failed(err.to_string())).await;
                        return;
                    }
                }
            }
            if let Some(delta) = parser.finish() {
                let _ = tx
                    .send(StreamEvent::Delta {
                        text: delta.text,
                        grounded: delta.grounded,
                    })
                    .await;
            }
        });
        Ok(rx)
    }
}

enum MockResponse {
    Stream(Vec<StreamEvent>),
    OpenError(String),
}

/// Scripted transport for tests.
///
/// Responses are consumed in order, one per `open` call; an unscripted call
/// gets an empty stream. Every request is recorded for assertion.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<VerificationRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a stream of plain text deltas for the next call.
    pub fn with_stream(self, deltas: &[&str]) -> Self {
        let events = deltas.iter().map(|d| StreamEvent::delta(d)).collect();
        self.push_response(MockResponse::Stream(events));
        self
    }

    /// Scripts an exact event sequence for the next call.
    pub fn with_events(self, events: Vec<StreamEvent>) -> Self {
        self.push_response(MockResponse::Stream(events));
        self
    }

    /// Scripts a failure of the open call itself.
    pub fn with_open_error(self, message: &str) -> Self {
        self.push_response(MockResponse::OpenError(message.to_string()));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn push_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }
}

#[async_trait]
impl VerificationTransport for MockTransport {
    async fn open(&self, request: VerificationRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(MockResponse::OpenError(message)) => {
                Err(VerifactError::VerificationRequest { message })
            }
            Some(MockResponse::Stream(events)) => {
                let (tx, rx) = mpsc::channel(events.len().max(1));
                for event in events {
                    let _ = tx.send(event).await;
                }
                Ok(rx)
            }
            None => {
                let (_tx, rx) = mpsc::channel(1);
                Ok(rx)
            }
        }
    }
}
