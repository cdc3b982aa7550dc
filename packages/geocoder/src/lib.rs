#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location prefill for incident reports.
//!
//! Resolving a reporter's location is a two-stage, best-effort pipeline:
//!
//! 1. **Positioning** via a [`PositionSource`], bounded by a fixed
//!    timeout.
//! 2. **Reverse geocoding** via [`nominatim::ReverseGeocoder`] to replace
//!    the raw coordinates with an address.
//!
//! Neither stage can fail the caller: [`Locator::locate`] always returns
//! some location text, falling back to the coordinate string or to a
//! sentinel message describing why no position is available.

pub mod nominatim;

use std::time::Duration;

use alert_sphere_alert_models::Coordinates;
use async_trait::async_trait;
use thiserror::Error;

use crate::nominatim::ReverseGeocoder;

/// Location text shown while a lookup is in progress.
pub const FETCHING_LOCATION: &str = "Fetching location...";

/// Location text when positioning was attempted but failed or timed out.
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable (auto-detect failed)";

/// Location text when the device cannot provide a position at all.
pub const GEOLOCATION_UNSUPPORTED: &str = "Geolocation not supported on this device";

/// Upper bound on how long positioning may take.
pub const POSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from reverse geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Why no device position could be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// The device has no positioning capability.
    #[error("positioning not supported")]
    Unsupported,

    /// Positioning was attempted but failed (denied, no fix, etc.).
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// No fix arrived within [`POSITION_TIMEOUT`].
    #[error("positioning timed out")]
    Timeout,
}

/// A source of the reporting device's current position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Returns the current position, best-effort.
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// A position already reported by the client device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// A device that cannot report its position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositioning;

#[async_trait]
impl PositionSource for NoPositioning {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Err(PositionError::Unsupported)
    }
}

/// A device that tried to position itself and reported a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPosition(pub String);

#[async_trait]
impl PositionSource for FailedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Err(PositionError::Unavailable(self.0.clone()))
    }
}

/// Result of a location lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// Text for the location field: an address, a `Lat:`/`Lng:` string,
    /// or a sentinel message.
    pub text: String,
    /// The device position, when one was obtained.
    pub coordinates: Option<Coordinates>,
}

impl ResolvedLocation {
    /// Whether the text is still the raw coordinate string rather than a
    /// resolved address.
    #[must_use]
    pub fn is_raw_coordinates(&self) -> bool {
        self.text.starts_with("Lat")
    }
}

/// Resolves the reporter's location: position first, then address.
pub struct Locator<'a> {
    position: &'a dyn PositionSource,
    geocoder: Option<&'a ReverseGeocoder>,
    timeout: Duration,
}

impl<'a> Locator<'a> {
    /// Creates a locator over `position`, optionally reverse-geocoding the
    /// result with `geocoder`.
    #[must_use]
    pub const fn new(position: &'a dyn PositionSource, geocoder: Option<&'a ReverseGeocoder>) -> Self {
        Self {
            position,
            geocoder,
            timeout: POSITION_TIMEOUT,
        }
    }

    /// Overrides the positioning timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Looks up the current location. Never fails.
    pub async fn locate(&self) -> ResolvedLocation {
        let position = tokio::time::timeout(self.timeout, self.position.current_position())
            .await
            .unwrap_or(Err(PositionError::Timeout));

        let coords = match position {
            Ok(coords) => coords,
            Err(PositionError::Unsupported) => {
                return ResolvedLocation {
                    text: GEOLOCATION_UNSUPPORTED.to_string(),
                    coordinates: None,
                };
            }
            Err(e) => {
                log::warn!("Positioning failed: {e}");
                return ResolvedLocation {
                    text: LOCATION_UNAVAILABLE.to_string(),
                    coordinates: None,
                };
            }
        };

        let mut text = coords.to_location_text();

        if let Some(geocoder) = self.geocoder {
            match geocoder.reverse(coords).await {
                Ok(Some(address)) => text = address,
                Ok(None) => log::debug!("No address for {text}"),
                Err(e) => log::warn!("Failed to fetch address, using coordinates only: {e}"),
            }
        }

        ResolvedLocation {
            text,
            coordinates: Some(coords),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolves;

    #[async_trait]
    impl PositionSource for NeverResolves {
        async fn current_position(&self) -> Result<Coordinates, PositionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn coordinates_without_geocoder() {
        let source = FixedPosition(Coordinates::new(12.971_6, 77.594_6));
        let resolved = Locator::new(&source, None).locate().await;
        assert_eq!(resolved.text, "Lat: 12.9716, Lng: 77.5946");
        assert!(resolved.is_raw_coordinates());
        assert_eq!(resolved.coordinates, Some(source.0));
    }

    #[tokio::test]
    async fn unsupported_device_uses_sentinel() {
        let resolved = Locator::new(&NoPositioning, None).locate().await;
        assert_eq!(resolved.text, GEOLOCATION_UNSUPPORTED);
        assert_eq!(resolved.coordinates, None);
    }

    #[tokio::test]
    async fn failed_positioning_uses_sentinel() {
        let source = FailedPosition("permission denied".to_string());
        let resolved = Locator::new(&source, None).locate().await;
        assert_eq!(resolved.text, LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn positioning_times_out() {
        let resolved = Locator::new(&NeverResolves, None)
            .with_timeout(Duration::from_millis(50))
            .locate()
            .await;
        assert_eq!(resolved.text, LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unreachable_geocoder_keeps_coordinates() {
        let geocoder = ReverseGeocoder::new("http://127.0.0.1:9/reverse").unwrap();
        let source = FixedPosition(Coordinates::new(1.0, 2.0));
        let resolved = Locator::new(&source, Some(&geocoder)).locate().await;
        assert_eq!(resolved.text, "Lat: 1.0000, Lng: 2.0000");
    }
}
