//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! Turns a coordinate pair into a human-readable address for display in
//! the incident location field. The public instance is unauthenticated
//! and asks for an identifying `User-Agent`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use alert_sphere_alert_models::Coordinates;

use crate::GeocodeError;

/// Default reverse-lookup endpoint of the public Nominatim instance.
pub const DEFAULT_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Client for a Nominatim `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl ReverseGeocoder {
    /// Creates a client for the reverse endpoint at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("alert-sphere/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Looks up the display address for `coords`.
    ///
    /// No timeout is applied beyond the client's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP request or response parsing
    /// fails.
    pub async fn reverse(&self, coords: Coordinates) -> Result<Option<String>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_reverse_response(&body)
    }
}

/// Parses a Nominatim reverse JSON response into its `display_name`.
///
/// A response without a non-empty `display_name` yields `None`. This
/// includes the `{"error": "Unable to geocode"}` body Nominatim returns
/// for open water.
fn parse_reverse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    if !body.is_object() {
        return Err(GeocodeError::Parse {
            message: "Nominatim reverse response is not an object".to_string(),
        });
    }

    Ok(body["display_name"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_name() {
        let body = serde_json::json!({
            "lat": "12.9716",
            "lon": "77.5946",
            "display_name": "MG Road, Bengaluru, Karnataka, India"
        });
        assert_eq!(
            parse_reverse_response(&body).unwrap().as_deref(),
            Some("MG Road, Bengaluru, Karnataka, India")
        );
    }

    #[test]
    fn unable_to_geocode_is_none() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(parse_reverse_response(&body).unwrap().is_none());
    }

    #[test]
    fn blank_display_name_is_none() {
        let body = serde_json::json!({"display_name": "  "});
        assert!(parse_reverse_response(&body).unwrap().is_none());
    }

    #[test]
    fn non_object_is_parse_error() {
        let body = serde_json::json!([]);
        assert!(matches!(
            parse_reverse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
