#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the alert sphere server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the stored record types to allow independent evolution of the API
//! contract.

use alert_sphere_alert_models::{
    Broadcast, Coordinates, IncidentReport, IncidentStatus, IncidentType, ResourceStatus,
    Severity, TeamStatus,
    marker::{MapMarker, pin_offset},
};
use alert_sphere_dashboard::{
    board::{DashboardStats, TypeCount},
    broadcast::{BroadcastDispatch, Delivery},
    triage::{TriageAction, triage_action},
    views::{Credentials, Role, View},
};
use alert_sphere_identity::AuthSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// User-facing notice.
    pub error: String,
}

/// An incident report as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncident {
    pub id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    /// Hex colour for the severity badge.
    pub color: &'static str,
    pub location: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    /// Current status; reports never triaged are `Pending`.
    pub status: IncidentStatus,
    /// Next action, absent once resolved.
    pub action: Option<TriageAction>,
}

impl From<&IncidentReport> for ApiIncident {
    fn from(report: &IncidentReport) -> Self {
        Self {
            id: report.id.clone(),
            incident_type: report.incident_type,
            severity: report.severity,
            color: report.severity.color(),
            location: report.location.clone(),
            description: report.description.clone(),
            coordinates: report.coordinates,
            created_at: report.created_at,
            status: report.effective_status(),
            action: triage_action(report),
        }
    }
}

/// Query parameters for the incident list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListParams {
    /// Return every report instead of the newest three.
    pub expanded: Option<bool>,
}

/// Response from the incident list endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncidentList {
    pub incidents: Vec<ApiIncident>,
    /// Number of reports in total, including any not shown.
    pub total: usize,
    pub expanded: bool,
}

/// Body of `POST /api/incidents`.
///
/// Type and severity arrive as the raw selection values; an empty or
/// unknown value counts as not selected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitReportRequest {
    pub incident_type: String,
    pub severity: String,
    /// Location text; the placeholder is used when absent.
    pub location: Option<String>,
    pub description: String,
    /// Position the location text was looked up from, if any.
    pub coordinates: Option<Coordinates>,
}

/// Body of `POST /api/incidents/{id}/advance`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStatusRequest {
    /// Status the authority was looking at when acting.
    pub observed: IncidentStatus,
}

/// Response from a status transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatusChange {
    pub id: String,
    pub status: IncidentStatus,
}

/// A map marker with its pin position on the decorative map, in percent
/// from the top-left corner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarker {
    #[serde(flatten)]
    pub marker: MapMarker,
    pub top: usize,
    pub left: usize,
}

impl ApiMarker {
    /// Places `marker` as the `index`-th pin.
    #[must_use]
    pub const fn placed(marker: MapMarker, index: usize) -> Self {
        let (top, left) = pin_offset(index);
        Self { marker, top, left }
    }
}

/// Body of `POST /api/teams`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamRequest {
    pub team_name: String,
    pub team_lead: String,
    pub contact: String,
    pub status: TeamStatus,
}

/// Body of `POST /api/resources`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceRequest {
    pub resource_name: String,
    pub quantity: String,
    pub location: String,
    pub status: ResourceStatus,
}

/// Body of `POST /api/broadcasts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
}

/// Both outcomes of a broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBroadcastDispatch {
    /// The stored record, absent if storing failed.
    pub record: Option<Broadcast>,
    pub delivery: Delivery,
    /// Failure notice, absent on full success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BroadcastDispatch> for ApiBroadcastDispatch {
    fn from(dispatch: BroadcastDispatch) -> Self {
        let error = dispatch.notice().map(|notice| notice.to_string());
        Self {
            record: dispatch.record,
            delivery: dispatch.delivery,
            error,
        }
    }
}

/// Dashboard figures plus the reports-by-type breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub by_type: Vec<TypeCount>,
}

/// What the reporting device said about its position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReportedPosition {
    /// A position fix.
    Located { latitude: f64, longitude: f64 },
    /// Positioning was attempted and failed.
    Failed,
    /// The device cannot position itself.
    Unsupported,
}

/// Response from location prefill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    /// Text for the location field.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Body of `POST /api/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRequest {
    pub token: String,
}

/// Response from device registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDeviceRegistration {
    /// `false` if the token was already registered.
    pub registered: bool,
    pub devices: usize,
}

/// Body of `POST /api/auth/sign-in`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// Login tab used.
    pub role: Role,
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// Response from a successful sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSignIn {
    #[serde(flatten)]
    pub session: AuthSession,
    /// Screen to show next.
    pub view: View,
    pub claimed_role: Role,
    /// Always `false`: the identity provider does not assign roles.
    pub role_verified: bool,
}
