//! Citizen incident reporting.

use alert_sphere_alert_models::{Coordinates, IncidentReport, IncidentType, Severity};
use alert_sphere_database::DocumentStore;
use alert_sphere_geocoder::{FETCHING_LOCATION, Locator, ResolvedLocation};
use serde::Serialize;

use crate::{Notice, create_record, is_blank};

/// Notice when type, severity or description is missing.
pub const REQUIRED_FIELDS: &str = "Please fill in all required fields before submitting.";

/// Notice when the report could not be stored.
pub const SUBMIT_FAILED: &str = "Failed to submit report. Please try again.";

/// Fields written for a new report. No status is stored, so the report
/// reads as pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewReport<'a> {
    incident_type: IncidentType,
    severity: Severity,
    location: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    coordinates: Option<Coordinates>,
}

/// The incident report form.
///
/// `location` starts as a placeholder and is filled in by
/// [`ReportForm::prefill_location`]. It never blocks submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportForm {
    pub incident_type: Option<IncidentType>,
    pub severity: Option<Severity>,
    pub description: String,
    pub(crate) location: String,
    pub(crate) coordinates: Option<Coordinates>,
}

impl Default for ReportForm {
    fn default() -> Self {
        Self {
            incident_type: None,
            severity: None,
            description: String::new(),
            location: FETCHING_LOCATION.to_string(),
            coordinates: None,
        }
    }
}

impl ReportForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Device position behind the current location text, if the text
    /// came from a lookup.
    #[must_use]
    pub const fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Overwrites the location by hand. Any looked-up position no longer
    /// describes the text and is dropped.
    pub fn set_location(&mut self, text: impl Into<String>) {
        self.location = text.into();
        self.coordinates = None;
    }

    /// Takes the result of a location lookup.
    pub fn apply_location(&mut self, resolved: ResolvedLocation) {
        self.location = resolved.text;
        self.coordinates = resolved.coordinates;
    }

    /// Runs the location lookup and puts its result in the form.
    pub async fn prefill_location(&mut self, locator: &Locator<'_>) {
        self.location = FETCHING_LOCATION.to_string();
        self.coordinates = None;
        self.apply_location(locator.locate().await);
    }

    fn validate(&self) -> Result<NewReport<'_>, Notice> {
        let (Some(incident_type), Some(severity)) = (self.incident_type, self.severity) else {
            return Err(Notice::Validation(REQUIRED_FIELDS));
        };
        if is_blank(&self.description) {
            return Err(Notice::Validation(REQUIRED_FIELDS));
        }

        let location = if is_blank(&self.location) {
            FETCHING_LOCATION
        } else {
            self.location.trim()
        };

        Ok(NewReport {
            incident_type,
            severity,
            location,
            description: self.description.trim(),
            coordinates: self.coordinates,
        })
    }

    /// Stores the report, then clears the form.
    ///
    /// With a `locator`, the location lookup runs again so the form is
    /// ready for the next report. A failed submission leaves the form as
    /// it was.
    ///
    /// # Errors
    ///
    /// * [`Notice::Validation`] if type, severity or description is
    ///   missing; nothing is written.
    /// * [`Notice::Backend`] if the store write fails.
    pub async fn submit(
        &mut self,
        store: &dyn DocumentStore,
        locator: Option<&Locator<'_>>,
    ) -> Result<IncidentReport, Notice> {
        let report = {
            let new = self.validate()?;
            create_record::<IncidentReport>(store, &new, SUBMIT_FAILED).await?
        };

        log::info!(
            "Incident {} reported: {} ({})",
            report.id,
            report.incident_type,
            report.severity
        );

        *self = Self::new();
        if let Some(locator) = locator {
            self.prefill_location(locator).await;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alert_sphere_alert_models::IncidentStatus;
    use alert_sphere_database::{Collection, memory::MemoryStore};
    use alert_sphere_geocoder::{FixedPosition, NoPositioning};

    use super::*;
    use crate::test_support::FailingStore;

    fn filled() -> ReportForm {
        ReportForm {
            incident_type: Some(IncidentType::Flood),
            severity: Some(Severity::High),
            description: "test".to_string(),
            ..ReportForm::new()
        }
    }

    #[tokio::test]
    async fn default_submission_stores_one_pending_report() {
        let store = MemoryStore::new();
        let mut form = filled();

        let report = form.submit(&store, None).await.unwrap();

        assert_eq!(report.incident_type, IncidentType::Flood);
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.description, "test");
        assert_eq!(report.location, FETCHING_LOCATION);
        assert_eq!(report.status, None);
        assert_eq!(report.effective_status(), IncidentStatus::Pending);

        let stored = store.list(Collection::Incidents).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, report.id);
        assert!(!stored[0].fields.contains_key("status"));
    }

    #[tokio::test]
    async fn missing_required_field_writes_nothing() {
        let store = MemoryStore::new();

        for form in [
            ReportForm {
                incident_type: None,
                ..filled()
            },
            ReportForm {
                severity: None,
                ..filled()
            },
            ReportForm {
                description: "   ".to_string(),
                ..filled()
            },
        ] {
            let mut form = form;
            let before = form.clone();
            assert_eq!(
                form.submit(&store, None).await,
                Err(Notice::Validation(REQUIRED_FIELDS))
            );
            assert_eq!(form, before);
        }

        assert!(store.list(Collection::Incidents).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_clears_form_and_relocates() {
        let store = MemoryStore::new();
        let position = FixedPosition(Coordinates::new(13.0, 77.5));
        let locator = Locator::new(&position, None);

        let mut form = filled();
        form.submit(&store, Some(&locator)).await.unwrap();

        assert_eq!(form.incident_type, None);
        assert_eq!(form.severity, None);
        assert!(form.description.is_empty());
        assert_eq!(form.location(), "Lat: 13.0000, Lng: 77.5000");
        assert_eq!(form.coordinates(), Some(position.0));
    }

    #[tokio::test]
    async fn looked_up_coordinates_are_stored_until_overwritten() {
        let store = MemoryStore::new();
        let position = FixedPosition(Coordinates::new(13.0, 77.5));

        let mut form = filled();
        form.prefill_location(&Locator::new(&position, None)).await;
        let report = form.submit(&store, None).await.unwrap();
        assert_eq!(report.coordinates, Some(position.0));

        let mut form = filled();
        form.prefill_location(&Locator::new(&position, None)).await;
        form.set_location("Near the old bridge");
        let report = form.submit(&store, None).await.unwrap();
        assert_eq!(report.location, "Near the old bridge");
        assert_eq!(report.coordinates, None);
    }

    #[tokio::test]
    async fn unsupported_positioning_still_submits() {
        let store = MemoryStore::new();
        let mut form = filled();
        form.prefill_location(&Locator::new(&NoPositioning, None)).await;

        let report = form.submit(&store, None).await.unwrap();
        assert_eq!(
            report.location,
            alert_sphere_geocoder::GEOLOCATION_UNSUPPORTED
        );
    }

    #[tokio::test]
    async fn backend_failure_keeps_form() {
        let store: Arc<dyn DocumentStore> = Arc::new(FailingStore::default());
        let mut form = filled();
        let before = form.clone();

        assert_eq!(
            form.submit(store.as_ref(), None).await,
            Err(Notice::Backend(SUBMIT_FAILED))
        );
        assert_eq!(form, before);
    }
}
