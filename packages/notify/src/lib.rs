#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Push notification side channel.
//!
//! Broadcasts are fanned out to citizen devices by a separate delivery
//! service reached over HTTP (`POST /send-broadcast`). Delivery is
//! best-effort: callers record the broadcast first and treat a failed
//! push as a degraded, not fatal, outcome.
//!
//! Devices register the token they obtained after the user granted
//! notification permission; the [`DeviceRegistry`] keeps those tokens for
//! the lifetime of the process, up to [`MAX_DEVICES`] of them.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Default base URL of the delivery service.
pub const DEFAULT_PUSH_ENDPOINT: &str = "http://localhost:5000";

/// Longest device token accepted.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Most device tokens held at once.
pub const MAX_DEVICES: usize = 10_000;

/// Errors from push delivery.
#[derive(Debug, Error)]
pub enum PushError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The delivery service answered with a non-success status.
    #[error("Delivery service returned {status}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
    },
}

/// Body of a `POST /send-broadcast` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

/// Something that can deliver a broadcast to citizen devices.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Attempts delivery of one broadcast.
    async fn deliver(&self, title: &str, message: &str) -> Result<(), PushError>;
}

/// Delivers broadcasts through the HTTP delivery service.
#[derive(Debug, Clone)]
pub struct HttpPushChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushChannel {
    /// Creates a channel posting to `{endpoint}/send-broadcast`.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Full URL of the delivery endpoint.
    #[must_use]
    pub fn send_url(&self) -> String {
        format!("{}/send-broadcast", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    async fn deliver(&self, title: &str, message: &str) -> Result<(), PushError> {
        let resp = self
            .client
            .post(self.send_url())
            .json(&PushMessage { title, message })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PushError::Rejected {
                status: status.as_u16(),
            });
        }

        log::info!("Push delivered: {title}");
        Ok(())
    }
}

/// Why a device token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Device token is required.")]
    Blank,

    #[error("Device token is too long.")]
    TooLong,

    /// The registry already holds its limit of tokens.
    #[error("Device limit reached.")]
    Full,
}

/// Device tokens registered for push delivery.
#[derive(Debug)]
pub struct DeviceRegistry {
    tokens: RwLock<BTreeSet<String>>,
    limit: usize,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::with_limit(MAX_DEVICES)
    }
}

impl DeviceRegistry {
    /// Creates an empty registry holding up to [`MAX_DEVICES`] tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry holding up to `limit` tokens.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            tokens: RwLock::new(BTreeSet::new()),
            limit,
        }
    }

    /// Records a device token. Returns `false` if it was already known.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if the token is blank, longer than
    /// [`MAX_TOKEN_LEN`], or new while the registry is full.
    pub async fn register(&self, token: &str) -> Result<bool, RegistrationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RegistrationError::Blank);
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(RegistrationError::TooLong);
        }

        let mut tokens = self.tokens.write().await;
        if tokens.contains(token) {
            return Ok(false);
        }
        if tokens.len() >= self.limit {
            log::warn!("Device registry full ({} tokens), refusing registration", self.limit);
            return Err(RegistrationError::Full);
        }
        tokens.insert(token.to_string());
        drop(tokens);

        log::info!("Registered push device token");
        Ok(true)
    }

    /// Number of registered devices.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Whether no devices are registered.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}
