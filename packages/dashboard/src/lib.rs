#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Citizen and authority dashboard operations.
//!
//! Everything here is a thin layer over the document store: forms
//! validate locally and then issue a single write, boards hold live
//! lists, and the only state machine is the incident triage workflow.
//! Failures surface as a [`Notice`] and always leave the caller in a
//! retryable state.

pub mod board;
pub mod broadcast;
pub mod registry;
pub mod report;
pub mod triage;
pub mod views;

use alert_sphere_alert_models::IncidentStatus;
use alert_sphere_database::{DocumentStore, Record, encode_fields};
use serde::Serialize;
use thiserror::Error;

/// A blocking, user-facing failure notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Notice {
    /// A required field was missing. Nothing was written.
    #[error("{0}")]
    Validation(&'static str),

    /// The store or another backend failed.
    #[error("{0}")]
    Backend(&'static str),

    /// The incident does not exist.
    #[error("Incident {id} was not found.")]
    NotFound {
        /// Requested incident ID.
        id: String,
    },

    /// The incident moved on since the caller last saw it.
    #[error("Incident is now {current}, not {observed}. Refresh and try again.")]
    StaleStatus {
        /// Status the caller acted on.
        observed: IncidentStatus,
        /// Status currently stored.
        current: IncidentStatus,
    },

    /// The incident is resolved and has no further action.
    #[error("Incident is already resolved.")]
    AlreadyResolved,

    /// The identity provider rejected the credentials.
    #[error("{0}")]
    SignInFailed(&'static str),

    /// No identity provider is configured.
    #[error("Sign-in is not available.")]
    SignInUnavailable,
}

/// Whether a form field counts as empty.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Writes `fields` as a new `T` and decodes what the store returned.
///
/// Any failure is logged and reported as `Backend(failure)`.
pub(crate) async fn create_record<T: Record>(
    store: &dyn DocumentStore,
    fields: &impl Serialize,
    failure: &'static str,
) -> Result<T, Notice> {
    let result = async {
        let doc = store.create(T::COLLECTION, encode_fields(fields)?).await?;
        T::decode(&doc)
    }
    .await;

    result.map_err(|e| {
        log::error!("Failed to create {} record: {e}", T::COLLECTION);
        Notice::Backend(failure)
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use alert_sphere_database::{Collection, Document, Fields, StoreError};
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    /// A store whose every operation fails.
    #[derive(Default)]
    pub struct FailingStore {
        feed: alert_sphere_database::ChangeFeed,
    }

    fn down() -> StoreError {
        StoreError::Database("store unavailable".to_string())
    }

    #[async_trait]
    impl alert_sphere_database::DocumentStore for FailingStore {
        async fn create(&self, _: Collection, _: Fields) -> Result<Document, StoreError> {
            Err(down())
        }

        async fn list(&self, _: Collection) -> Result<Vec<Document>, StoreError> {
            Err(down())
        }

        async fn get(&self, _: Collection, _: &str) -> Result<Option<Document>, StoreError> {
            Err(down())
        }

        async fn update(&self, _: Collection, _: &str, _: Fields) -> Result<(), StoreError> {
            Err(down())
        }

        async fn update_if(
            &self,
            _: Collection,
            _: &str,
            _: &str,
            _: Option<&serde_json::Value>,
            _: Fields,
        ) -> Result<bool, StoreError> {
            Err(down())
        }

        fn changes(&self, collection: Collection) -> broadcast::Receiver<()> {
            self.feed.subscribe(collection)
        }
    }
}
