//! The event-bus side of the core `OwnerNotifier` seam.
//!
//! Requests become `project.success` events: source = the project, actor =
//! the owner. [`crate::NotificationDispatcher`] turns them back into
//! [`OwnerNotification`]s on the consuming side.

use std::sync::Arc;

use async_trait::async_trait;
use crowdfund_core::error::CoreError;
use crowdfund_core::funding::{NotificationKind, OwnerNotification, OwnerNotifier};

use crate::bus::{EventBus, PlatformEvent};

/// Source entity type used on owner notification events.
const SOURCE_PROJECT: &str = "project";

/// Encode an owner notification request as a platform event.
pub fn to_event(notification: &OwnerNotification) -> PlatformEvent {
    PlatformEvent::new(notification.kind.event_type())
        .with_source(SOURCE_PROJECT, notification.project_id)
        .with_actor(notification.owner_id)
        .with_payload(serde_json::json!({ "kind": notification.kind.as_str() }))
}

/// Decode a platform event back into an owner notification request.
///
/// Returns `None` for unrelated or malformed events.
pub fn from_event(event: &PlatformEvent) -> Option<OwnerNotification> {
    let kind = NotificationKind::from_event_type(&event.event_type)?;
    if event.source_entity_type.as_deref() != Some(SOURCE_PROJECT) {
        return None;
    }
    Some(OwnerNotification {
        project_id: event.source_entity_id?,
        owner_id: event.actor_user_id?,
        kind,
    })
}

/// Publishes owner notification requests on the [`EventBus`].
///
/// Deduplication happens downstream in the notification ledger, so repeated
/// requests for the same project are cheap and safe.
#[derive(Clone)]
pub struct BusOwnerNotifier {
    bus: Arc<EventBus>,
}

impl BusOwnerNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl OwnerNotifier for BusOwnerNotifier {
    async fn request(&self, notification: OwnerNotification) -> Result<(), CoreError> {
        self.bus
            .try_publish(to_event(&notification))
            .map(|_| ())
            .map_err(|_| {
                CoreError::NotificationDispatch(format!(
                    "no dispatcher subscribed for {} of project {}",
                    notification.kind, notification.project_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(project_id: i64) -> OwnerNotification {
        OwnerNotification {
            project_id,
            owner_id: 3,
            kind: NotificationKind::ProjectSuccess,
        }
    }

    #[test]
    fn event_encoding_is_reversible() {
        let event = to_event(&success(12));
        assert_eq!(event.event_type, "project.success");
        assert_eq!(from_event(&event), Some(success(12)));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        assert_eq!(from_event(&PlatformEvent::new("project.created")), None);
        let no_source = PlatformEvent::new("project.success").with_actor(3);
        assert_eq!(from_event(&no_source), None);
    }

    #[tokio::test]
    async fn request_publishes_to_subscribers() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let notifier = BusOwnerNotifier::new(Arc::clone(&bus));

        notifier.request(success(5)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(from_event(&event), Some(success(5)));
    }

    #[tokio::test]
    async fn request_without_dispatcher_is_a_dispatch_failure() {
        let notifier = BusOwnerNotifier::new(Arc::new(EventBus::default()));
        let err = notifier.request(success(5)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotificationDispatch(_)));
    }
}
