//! Map markers derived from incident reports.
//!
//! Markers are recomputed from the current incident list every time they
//! are needed and hold no state of their own. Coordinates prefer the
//! structured pair stored with the report; older reports only carry
//! `Lat: x, Lng: y` inside their location text, so that form is still
//! parsed as a fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Coordinates, DEFAULT_SEVERITY_COLOR, IncidentReport, IncidentType, Severity};

/// Coordinates used when a report carries no usable position.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates::new(12.9716, 77.5946);

static LAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Lat:\s*([-+]?\d*\.\d+)").expect("valid regex"));

static LNG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Lng:\s*([-+]?\d*\.\d+)").expect("valid regex"));

/// A pin on the incident map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub location: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    /// Pin colour for the marker's severity.
    pub color: String,
}

/// Extracts `(lat, lng)` from text containing both `Lat:` and `Lng:`
/// decimal values.
///
/// Returns `None` when either token is missing or its number does not
/// parse.
#[must_use]
pub fn parse_embedded_coordinates(text: &str) -> Option<Coordinates> {
    let lat = capture_decimal(&LAT_PATTERN, text)?;
    let lng = capture_decimal(&LNG_PATTERN, text)?;
    Some(Coordinates::new(lat, lng))
}

fn capture_decimal(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Resolves the map position of a report: structured coordinates first,
/// then the embedded `Lat:`/`Lng:` text, then [`DEFAULT_COORDINATES`].
#[must_use]
pub fn resolve_coordinates(report: &IncidentReport) -> Coordinates {
    report
        .coordinates
        .or_else(|| parse_embedded_coordinates(&report.location))
        .unwrap_or(DEFAULT_COORDINATES)
}

impl From<&IncidentReport> for MapMarker {
    fn from(report: &IncidentReport) -> Self {
        let coords = resolve_coordinates(report);
        Self {
            id: report.id.clone(),
            incident_type: report.incident_type,
            severity: report.severity,
            location: report.location.clone(),
            description: report.description.clone(),
            lat: coords.latitude,
            lng: coords.longitude,
            color: report.severity.color().to_string(),
        }
    }
}

/// Derives one marker per report, preserving order.
#[must_use]
pub fn derive_markers(reports: &[IncidentReport]) -> Vec<MapMarker> {
    reports.iter().map(MapMarker::from).collect()
}

/// Looks up a pin colour by severity name, falling back to grey for
/// unknown values.
#[must_use]
pub fn color_for_severity_name(name: &str) -> &'static str {
    name.parse::<Severity>()
        .map_or(DEFAULT_SEVERITY_COLOR, Severity::color)
}

/// Decorative `(top, left)` percentage offset for the `index`th pin on the
/// placeholder map.
#[must_use]
pub const fn pin_offset(index: usize) -> (usize, usize) {
    (20 + (index * 15) % 60, 20 + (index * 20) % 60)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn report(location: &str) -> IncidentReport {
        IncidentReport {
            id: "r1".to_string(),
            incident_type: IncidentType::Flood,
            severity: Severity::High,
            location: location.to_string(),
            description: "water rising".to_string(),
            coordinates: None,
            created_at: Utc::now(),
            status: None,
        }
    }

    #[test]
    fn extracts_embedded_coordinates() {
        let coords = parse_embedded_coordinates("Lat: 40.7128, Lng: -74.0060").unwrap();
        assert!((coords.latitude - 40.7128).abs() < 1e-9);
        assert!((coords.longitude - -74.006).abs() < 1e-9);
    }

    #[test]
    fn extracts_coordinates_surrounded_by_text() {
        let coords =
            parse_embedded_coordinates("near bridge Lat:+12.5000 and Lng:   .25 east").unwrap();
        assert!((coords.latitude - 12.5).abs() < 1e-9);
        assert!((coords.longitude - 0.25).abs() < 1e-9);
    }

    #[test]
    fn missing_token_falls_back_to_default_pair() {
        for text in [
            "Downtown Area, Sector 5",
            "Lat: 40.7128 only",
            "Lng: -74.0060 only",
            "Lat: abc, Lng: def",
            "",
        ] {
            let marker = MapMarker::from(&report(text));
            assert!((marker.lat - 12.9716).abs() < 1e-9, "lat for {text:?}");
            assert!((marker.lng - 77.5946).abs() < 1e-9, "lng for {text:?}");
        }
    }

    #[test]
    fn structured_coordinates_take_precedence() {
        let mut r = report("Lat: 1.0000, Lng: 2.0000");
        r.coordinates = Some(Coordinates::new(3.5, 4.5));
        let marker = MapMarker::from(&r);
        assert!((marker.lat - 3.5).abs() < 1e-9);
        assert!((marker.lng - 4.5).abs() < 1e-9);
    }

    #[test]
    fn markers_copy_report_fields_in_order() {
        let mut second = report("Lat: 1.5, Lng: 2.5");
        second.id = "r2".to_string();
        second.severity = Severity::Critical;

        let markers = derive_markers(&[report("somewhere"), second]);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, "r1");
        assert_eq!(markers[1].id, "r2");
        assert_eq!(markers[1].color, "#ef4444");
        assert_eq!(markers[0].description, "water rising");
    }

    #[test]
    fn unknown_severity_names_are_grey() {
        assert_eq!(color_for_severity_name("Critical"), "#ef4444");
        assert_eq!(color_for_severity_name("unknown"), DEFAULT_SEVERITY_COLOR);
    }

    #[test]
    fn pin_offsets_stay_inside_the_map() {
        assert_eq!(pin_offset(0), (20, 20));
        assert_eq!(pin_offset(1), (35, 40));
        for i in 0..50 {
            let (top, left) = pin_offset(i);
            assert!((20..80).contains(&top));
            assert!((20..80).contains(&left));
        }
    }
}
