//! Authority triage of incident reports.
//!
//! An authority only ever moves a report one step forward. The write
//! goes straight to the store and the new status shows up once the
//! live incident list re-fires; nothing is updated locally first.

use alert_sphere_alert_models::{IncidentReport, IncidentStatus};
use alert_sphere_database::{Collection, DocumentStore, Fields, Record, StoreError};
use serde::Serialize;

use crate::Notice;

/// Notice when the status write fails.
pub const UPDATE_FAILED: &str = "Failed to update status. Please try again.";

const STATUS_FIELD: &str = "status";

/// The single action offered for a report in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageAction {
    /// Button label.
    pub label: &'static str,
    /// Status the report will move to.
    pub to: IncidentStatus,
}

/// The forward action for `report`, or `None` once resolved.
#[must_use]
pub fn triage_action(report: &IncidentReport) -> Option<TriageAction> {
    let status = report.effective_status();
    Some(TriageAction {
        label: status.action_label()?,
        to: status.next()?,
    })
}

fn update_failed(id: &str, e: &StoreError) -> Notice {
    log::error!("Failed to update status of incident {id}: {e}");
    Notice::Backend(UPDATE_FAILED)
}

/// Reads incident `id`, returning its raw stored status field alongside
/// the status it stands for.
async fn read_status(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<(Option<serde_json::Value>, IncidentStatus), Notice> {
    let doc = store
        .get(Collection::Incidents, id)
        .await
        .map_err(|e| update_failed(id, &e))?
        .ok_or_else(|| Notice::NotFound { id: id.to_string() })?;

    let status = IncidentReport::decode(&doc)
        .map_err(|e| update_failed(id, &e))?
        .effective_status();

    Ok((doc.fields.get(STATUS_FIELD).cloned(), status))
}

/// Advances incident `id` one step from `observed`, the status the
/// caller was looking at.
///
/// The write only lands if the stored status is still the one that was
/// read, so concurrent callers cannot move a report backwards.
///
/// Returns the new status.
///
/// # Errors
///
/// * [`Notice::NotFound`] if there is no such incident.
/// * [`Notice::StaleStatus`] if the stored status is no longer
///   `observed`, including when it changes between the read and the
///   write; nothing is written.
/// * [`Notice::AlreadyResolved`] if the incident is resolved.
/// * [`Notice::Backend`] if the store read or write fails.
pub async fn advance_status(
    store: &dyn DocumentStore,
    id: &str,
    observed: IncidentStatus,
) -> Result<IncidentStatus, Notice> {
    let (raw, current) = read_status(store, id).await?;

    if current != observed {
        return Err(Notice::StaleStatus { observed, current });
    }
    let next = current.next().ok_or(Notice::AlreadyResolved)?;

    let mut fields = Fields::new();
    fields.insert(
        STATUS_FIELD.to_string(),
        serde_json::Value::String(next.as_ref().to_string()),
    );
    let applied = store
        .update_if(Collection::Incidents, id, STATUS_FIELD, raw.as_ref(), fields)
        .await
        .map_err(|e| update_failed(id, &e))?;

    if !applied {
        let (_, current) = read_status(store, id).await?;
        log::warn!("Incident {id} moved to {current} while advancing from {observed}");
        return Err(Notice::StaleStatus { observed, current });
    }

    log::info!("Incident {id}: {observed} -> {next}");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use alert_sphere_alert_models::{IncidentType, Severity};
    use alert_sphere_database::{Document, memory::MemoryStore};
    use async_trait::async_trait;
    use tokio::sync::{Notify, broadcast};

    use super::*;
    use crate::{report::ReportForm, test_support::FailingStore};

    async fn reported(store: &MemoryStore) -> IncidentReport {
        ReportForm {
            incident_type: Some(IncidentType::Fire),
            severity: Some(Severity::Critical),
            description: "Warehouse fire".to_string(),
            ..ReportForm::new()
        }
        .submit(store, None)
        .await
        .unwrap()
    }

    async fn stored_status(store: &MemoryStore, id: &str) -> IncidentStatus {
        let doc = store.get(Collection::Incidents, id).await.unwrap().unwrap();
        IncidentReport::decode(&doc).unwrap().effective_status()
    }

    #[tokio::test]
    async fn walks_the_whole_workflow_one_step_at_a_time() {
        let store = MemoryStore::new();
        let report = reported(&store).await;

        let mut seen = vec![stored_status(&store, &report.id).await];
        let mut observed = IncidentStatus::Pending;
        while let Ok(next) = advance_status(&store, &report.id, observed).await {
            assert!(observed.can_transition_to(next));
            seen.push(stored_status(&store, &report.id).await);
            observed = next;
        }

        assert_eq!(seen, IncidentStatus::all());
        assert_eq!(
            advance_status(&store, &report.id, IncidentStatus::Resolved).await,
            Err(Notice::AlreadyResolved)
        );
    }

    #[tokio::test]
    async fn stale_observation_writes_nothing() {
        let store = MemoryStore::new();
        let report = reported(&store).await;
        advance_status(&store, &report.id, IncidentStatus::Pending)
            .await
            .unwrap();

        assert_eq!(
            advance_status(&store, &report.id, IncidentStatus::Pending).await,
            Err(Notice::StaleStatus {
                observed: IncidentStatus::Pending,
                current: IncidentStatus::Verified,
            })
        );
        assert_eq!(stored_status(&store, &report.id).await, IncidentStatus::Verified);
    }

    #[tokio::test]
    async fn skipping_ahead_is_rejected() {
        let store = MemoryStore::new();
        let report = reported(&store).await;

        assert!(matches!(
            advance_status(&store, &report.id, IncidentStatus::Assigned).await,
            Err(Notice::StaleStatus { .. })
        ));
        assert_eq!(stored_status(&store, &report.id).await, IncidentStatus::Pending);
    }

    /// Holds the first guarded write until released, so another caller
    /// can act in between its read and its write.
    struct HeldFirstWrite {
        inner: MemoryStore,
        held: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DocumentStore for HeldFirstWrite {
        async fn create(&self, collection: Collection, fields: Fields) -> Result<Document, StoreError> {
            self.inner.create(collection, fields).await
        }

        async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
            self.inner.list(collection).await
        }

        async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), StoreError> {
            self.inner.update(collection, id, fields).await
        }

        async fn update_if(
            &self,
            collection: Collection,
            id: &str,
            field: &str,
            expected: Option<&serde_json::Value>,
            fields: Fields,
        ) -> Result<bool, StoreError> {
            if !self.held.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner
                .update_if(collection, id, field, expected, fields)
                .await
        }

        fn changes(&self, collection: Collection) -> broadcast::Receiver<()> {
            self.inner.changes(collection)
        }
    }

    #[tokio::test]
    async fn concurrent_advance_never_moves_backwards() {
        let store = Arc::new(HeldFirstWrite {
            inner: MemoryStore::new(),
            held: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let report = reported(&store.inner).await;

        let slow = tokio::spawn({
            let store = store.clone();
            let id = report.id.clone();
            async move { advance_status(store.as_ref(), &id, IncidentStatus::Pending).await }
        });
        store.entered.notified().await;

        assert_eq!(
            advance_status(store.as_ref(), &report.id, IncidentStatus::Pending).await,
            Ok(IncidentStatus::Verified)
        );
        assert_eq!(
            advance_status(store.as_ref(), &report.id, IncidentStatus::Verified).await,
            Ok(IncidentStatus::Assigned)
        );

        store.release.notify_one();
        assert_eq!(
            slow.await.unwrap(),
            Err(Notice::StaleStatus {
                observed: IncidentStatus::Pending,
                current: IncidentStatus::Assigned,
            })
        );
        assert_eq!(stored_status(&store.inner, &report.id).await, IncidentStatus::Assigned);
    }

    #[tokio::test]
    async fn unknown_incident_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            advance_status(&store, "missing", IncidentStatus::Pending).await,
            Err(Notice::NotFound {
                id: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn backend_failure_is_a_notice() {
        assert_eq!(
            advance_status(&FailingStore::default(), "x", IncidentStatus::Pending).await,
            Err(Notice::Backend(UPDATE_FAILED))
        );
    }

    #[tokio::test]
    async fn one_action_per_state() {
        let store = MemoryStore::new();
        let mut report = reported(&store).await;

        assert_eq!(
            triage_action(&report),
            Some(TriageAction {
                label: "Verify",
                to: IncidentStatus::Verified
            })
        );
        report.status = Some(IncidentStatus::Resolved);
        assert_eq!(triage_action(&report), None);
    }
}
