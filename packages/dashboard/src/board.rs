//! Live boards and the figures derived from them.
//!
//! Each board holds one [`LiveList`] per collection it shows. The lists
//! load and update independently, so a board can be partly loaded; every
//! accessor works on whatever has arrived so far.

use std::sync::Arc;

use alert_sphere_alert_models::{
    Broadcast, IncidentReport, IncidentType, RescueTeam, Resource, Severity,
    marker::{MapMarker, derive_markers},
};
use alert_sphere_database::{DocumentStore, live::LiveList};
use serde::Serialize;

/// Reports shown in the collapsed reports table.
pub const PREVIEW_LEN: usize = 3;

/// The newest [`PREVIEW_LEN`] reports, or all of them when `expanded`.
#[must_use]
pub fn reports_preview<T>(reports: &[T], expanded: bool) -> &[T] {
    if expanded {
        reports
    } else {
        &reports[..reports.len().min(PREVIEW_LEN)]
    }
}

/// Headline figures on the authority dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Critical incidents.
    pub active_alerts: usize,
    pub rescue_teams: usize,
    pub resources: usize,
    pub total_reports: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn compute(incidents: &[IncidentReport], rescue_teams: usize, resources: usize) -> Self {
        Self {
            active_alerts: incidents
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count(),
            rescue_teams,
            resources,
            total_reports: incidents.len(),
        }
    }
}

/// Number of reports of one incident type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub incident_type: IncidentType,
    pub count: usize,
}

/// Reports per incident type, in [`IncidentType::all`] order. Types with
/// no reports are included with a zero count.
#[must_use]
pub fn type_distribution(incidents: &[IncidentReport]) -> Vec<TypeCount> {
    IncidentType::all()
        .iter()
        .map(|&incident_type| TypeCount {
            incident_type,
            count: incidents
                .iter()
                .filter(|i| i.incident_type == incident_type)
                .count(),
        })
        .collect()
}

/// Everything the authority screen subscribes to.
pub struct AuthorityBoard {
    pub incidents: LiveList<IncidentReport>,
    pub teams: LiveList<RescueTeam>,
    pub resources: LiveList<Resource>,
    pub broadcasts: LiveList<Broadcast>,
}

impl AuthorityBoard {
    /// Opens all four subscriptions. Must be called within a Tokio
    /// runtime.
    #[must_use]
    pub fn open(store: &Arc<dyn DocumentStore>) -> Self {
        log::debug!("Opening authority board");
        Self {
            incidents: LiveList::open(store.clone()),
            teams: LiveList::open(store.clone()),
            resources: LiveList::open(store.clone()),
            broadcasts: LiveList::open(store.clone()),
        }
    }

    /// Whether any list is still waiting for its first snapshot.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.incidents.is_loading()
            || self.teams.is_loading()
            || self.resources.is_loading()
            || self.broadcasts.is_loading()
    }

    /// Figures over whatever has loaded. Lists still loading count as
    /// empty.
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        DashboardStats::compute(
            self.incidents.state().items(),
            self.teams.state().len(),
            self.resources.state().len(),
        )
    }

    #[must_use]
    pub fn markers(&self) -> Vec<MapMarker> {
        derive_markers(self.incidents.state().items())
    }

    /// Releases all four subscriptions.
    pub fn close(self) {
        log::debug!("Closing authority board");
        drop(self);
    }
}

/// Everything the citizen screen subscribes to: incidents for the map and
/// broadcasts for the alerts feed.
pub struct CitizenBoard {
    pub incidents: LiveList<IncidentReport>,
    pub alerts: LiveList<Broadcast>,
}

impl CitizenBoard {
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn open(store: &Arc<dyn DocumentStore>) -> Self {
        Self {
            incidents: LiveList::open(store.clone()),
            alerts: LiveList::open(store.clone()),
        }
    }

    #[must_use]
    pub fn markers(&self) -> Vec<MapMarker> {
        derive_markers(self.incidents.state().items())
    }

    pub fn close(self) {
        drop(self);
    }
}
