//! Authority broadcasts.
//!
//! A broadcast is two separate steps with separate outcomes: the record
//! is stored, then a push is attempted through the delivery service.
//! The second step never undoes the first.

use alert_sphere_alert_models::Broadcast;
use alert_sphere_database::DocumentStore;
use alert_sphere_notify::PushChannel;
use serde::Serialize;

use crate::{Notice, create_record, is_blank};

/// Notice when title or message is missing.
pub const BOTH_REQUIRED: &str = "Please enter both title and message.";

/// Notice when either step failed.
pub const BROADCAST_FAILED: &str = "Failed to send broadcast.";

/// Outcome of the push step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Delivery {
    Delivered,
    Failed { reason: String },
    /// Not attempted because the record could not be stored.
    Skipped,
}

/// What happened to one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastDispatch {
    /// The stored record, or `None` if storing failed.
    pub record: Option<Broadcast>,
    pub delivery: Delivery,
}

impl BroadcastDispatch {
    /// Stored and delivered.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.record.is_some() && matches!(self.delivery, Delivery::Delivered)
    }

    /// The notice to show, if any step failed.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        if self.is_complete() {
            None
        } else {
            Some(Notice::Backend(BROADCAST_FAILED))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastForm {
    pub title: String,
    pub message: String,
}

#[derive(Serialize)]
struct NewBroadcast<'a> {
    title: &'a str,
    message: &'a str,
}

impl BroadcastForm {
    /// Stores the broadcast and then pushes it.
    ///
    /// The form is cleared only when both steps succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Notice::Validation`] if title or message is blank.
    /// Failures of either step are reported in the returned
    /// [`BroadcastDispatch`] instead.
    pub async fn dispatch(
        &mut self,
        store: &dyn DocumentStore,
        push: &dyn PushChannel,
    ) -> Result<BroadcastDispatch, Notice> {
        if is_blank(&self.title) || is_blank(&self.message) {
            return Err(Notice::Validation(BOTH_REQUIRED));
        }

        let new = NewBroadcast {
            title: self.title.trim(),
            message: self.message.trim(),
        };

        let record = create_record::<Broadcast>(store, &new, BROADCAST_FAILED)
            .await
            .ok();

        let delivery = if record.is_some() {
            match push.deliver(new.title, new.message).await {
                Ok(()) => Delivery::Delivered,
                Err(e) => {
                    log::warn!("Broadcast stored but push delivery failed: {e}");
                    Delivery::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        } else {
            Delivery::Skipped
        };

        let dispatch = BroadcastDispatch { record, delivery };
        if dispatch.is_complete() {
            *self = Self::default();
        }
        Ok(dispatch)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alert_sphere_database::{Collection, memory::MemoryStore};
    use alert_sphere_notify::PushError;
    use async_trait::async_trait;

    use super::*;
    use crate::test_support::FailingStore;

    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PushChannel for RecordingPush {
        async fn deliver(&self, title: &str, message: &str) -> Result<(), PushError> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            if self.fail {
                Err(PushError::Rejected { status: 503 })
            } else {
                Ok(())
            }
        }
    }

    fn form() -> BroadcastForm {
        BroadcastForm {
            title: "Flood warning".to_string(),
            message: "Move to higher ground".to_string(),
        }
    }

    #[tokio::test]
    async fn full_success_clears_form() {
        let store = MemoryStore::new();
        let push = RecordingPush::default();
        let mut form = form();

        let dispatch = form.dispatch(&store, &push).await.unwrap();

        assert!(dispatch.is_complete());
        assert_eq!(dispatch.notice(), None);
        assert_eq!(form, BroadcastForm::default());
        assert_eq!(
            push.sent.lock().unwrap().as_slice(),
            [("Flood warning".to_string(), "Move to higher ground".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_push_still_records_one_broadcast() {
        let store = MemoryStore::new();
        let push = RecordingPush {
            fail: true,
            ..RecordingPush::default()
        };
        let mut form = form();

        let dispatch = form.dispatch(&store, &push).await.unwrap();

        assert!(dispatch.record.is_some());
        assert!(matches!(dispatch.delivery, Delivery::Failed { .. }));
        assert_eq!(dispatch.notice(), Some(Notice::Backend(BROADCAST_FAILED)));
        assert_eq!(form, self::form());
        assert_eq!(store.list(Collection::Broadcasts).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_store_skips_push() {
        let push = RecordingPush::default();
        let mut form = form();

        let dispatch = form
            .dispatch(&FailingStore::default(), &push)
            .await
            .unwrap();

        assert_eq!(dispatch.record, None);
        assert_eq!(dispatch.delivery, Delivery::Skipped);
        assert!(dispatch.notice().is_some());
        assert!(push.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_fields_write_nothing() {
        let store = MemoryStore::new();
        let push = RecordingPush::default();

        for mut form in [
            BroadcastForm {
                title: String::new(),
                ..form()
            },
            BroadcastForm {
                message: " ".to_string(),
                ..form()
            },
        ] {
            assert_eq!(
                form.dispatch(&store, &push).await,
                Err(Notice::Validation(BOTH_REQUIRED))
            );
        }

        assert!(store.list(Collection::Broadcasts).await.unwrap().is_empty());
        assert!(push.sent.lock().unwrap().is_empty());
    }
}
