#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Disaster alert record types and their fixed vocabularies.
//!
//! These are the four persisted record kinds (incident reports, rescue
//! teams, resources, broadcasts) plus the closed enumerations used by the
//! reporting and registration forms. Field names serialize in camelCase to
//! match the documents held by the backing store.

pub mod content;
pub mod marker;
pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use status::IncidentStatus;

/// How serious a reported incident is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    /// Immediate danger
    Critical,
    /// Serious situation
    High,
    /// Concerning
    Moderate,
    /// Minor issue
    Low,
}

/// Marker colour used when a severity is missing or unrecognized.
pub const DEFAULT_SEVERITY_COLOR: &str = "#6b7280";

impl Severity {
    /// Hex colour used for this severity's map pin and legend entry.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Critical => "#ef4444",
            Self::High => "#f97316",
            Self::Moderate => "#eab308",
            Self::Low => "#22c55e",
        }
    }

    /// Returns all variants of this enum, most severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Critical, Self::High, Self::Moderate, Self::Low]
    }
}

/// Kind of disaster a citizen can report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IncidentType {
    Flood,
    Fire,
    Earthquake,
    Cyclone,
    Landslide,
    Other,
}

impl IncidentType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Flood,
            Self::Fire,
            Self::Earthquake,
            Self::Cyclone,
            Self::Landslide,
            Self::Other,
        ]
    }
}

/// Availability of a rescue team.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TeamStatus {
    #[default]
    Available,
    Deployed,
    #[serde(rename = "On Standby")]
    #[strum(serialize = "On Standby")]
    OnStandby,
}

/// Availability of a stock of resources.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ResourceStatus {
    #[default]
    Available,
    #[serde(rename = "In Use")]
    #[strum(serialize = "In Use")]
    InUse,
    Depleted,
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Formats the pair the way the location field displays raw
    /// coordinates: `Lat: 12.9716, Lng: 77.5946`.
    #[must_use]
    pub fn to_location_text(&self) -> String {
        format!("Lat: {:.4}, Lng: {:.4}", self.latitude, self.longitude)
    }
}

/// A citizen-submitted incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    /// Store-assigned document ID.
    pub id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    /// Free-text location, either an address or a `Lat:`/`Lng:` string.
    pub location: String,
    pub description: String,
    /// Device coordinates captured when the report was filed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// Triage status. Absent until an authority first acts on the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
}

impl IncidentReport {
    /// The status to display and transition from; an absent status is
    /// [`IncidentStatus::Pending`].
    #[must_use]
    pub fn effective_status(&self) -> IncidentStatus {
        self.status.unwrap_or_default()
    }
}

/// A registered rescue team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueTeam {
    pub id: String,
    pub team_name: String,
    pub team_lead: String,
    pub contact: String,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
}

/// A tracked stock of relief resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub resource_name: String,
    /// Free text such as `"200 kits"`.
    pub quantity: String,
    pub location: String,
    pub status: ResourceStatus,
    pub created_at: DateTime<Utc>,
}

/// An authority broadcast to all citizens. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
