//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self { Self { client } }

    /// Publisher that drops every event, used when `NATS_URL` is unset.
    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.client.is_some() }

    /// Failures are logged; the request that raised the event still succeeds.
    pub async fn publish(&self, event: &DomainEvent) {
        let Some(client) = &self.client else {
            tracing::debug!(subject = event.subject(), "Event publishing disabled");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, subject = event.subject(), "Failed to serialize event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(error = %e, subject = event.subject(), "Failed to publish event");
        }
    }

    pub async fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disabled_publisher_swallows_events() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        publisher.publish(&DomainEvent::EnquiryReceived { enquiry_id: Uuid::nil(), subject: "Site visit".into() }).await;
    }
}
