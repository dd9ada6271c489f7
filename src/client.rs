//! Streaming feed client and update decoding


use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Inbound frame stream of an open connection
pub type FeedStream = Pin<Box<dyn Stream<Item = Result<FeedFrame>> + Send>>;

/// Transport-neutral view of an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Remote close, with the close reason if one was sent
    Close(Option<String>),
    /// Ping, pong or raw frames
    Control,
}

/// Opens streaming connections; the seam tests replace with scripted feeds
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Open `url` and return its inbound frames
    async fn connect(&self, url: &str) -> Result<FeedStream>;
}

/// WebSocket connector over `tokio-tungstenite` with rustls
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(crate::defaults::DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl FeedConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<FeedStream> {
        validate_endpoint(url)?;

        let (ws_stream, _) = timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                AppError::connect(format!(
                    "Timed out connecting to {} after {:?}",
                    url, self.connect_timeout
                ))
            })?
            .map_err(|e| AppError::connect(format!("Failed to connect to {}: {}", url, e)))?;

        // Pongs are answered by tungstenite while the stream is polled
        let frames = ws_stream.map(|message| match message {
            Ok(Message::Text(text)) => Ok(FeedFrame::Text(text.as_str().to_owned())),
            Ok(Message::Binary(data)) => Ok(FeedFrame::Binary(data.to_vec())),
            Ok(Message::Close(frame)) => {
                Ok(FeedFrame::Close(frame.map(|f| f.reason.as_str().to_owned())))
            }
            Ok(_) => Ok(FeedFrame::Control),
            Err(e) => Err(AppError::stream(e.to_string())),
        });

        Ok(Box::pin(frames))
    }
}

/// Fields of an inbound update that latency measurement needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUpdate {
    /// Event time in milliseconds since the Unix epoch
    #[serde(rename = "E")]
    pub event_time_ms: i64,
    /// Identifier of the logical update
    #[serde(rename = "u")]
    pub update_id: u64,
}

impl FeedUpdate {
    /// Decode a JSON payload, ignoring unknown fields
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| AppError::message_parse(e.to_string()))
    }

    pub fn parse_bytes(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| AppError::message_parse(e.to_string()))
    }

    /// Seconds between the event time and `now_secs`
    pub fn delay_from(&self, now_secs: f64) -> f64 {
        now_secs - self.event_time_ms as f64 / 1000.0
    }
}

/// Current wall-clock time in fractional seconds since the Unix epoch
pub fn unix_now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Check that `url` is a well-formed ws:// or wss:// URL
pub fn validate_endpoint(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AppError::validation(format!("Invalid endpoint '{}': {}", url, e)))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        scheme => Err(AppError::validation(format!(
            "Endpoint must use ws:// or wss://, got {}:// in '{}'",
            scheme, url
        ))),
    }
}
