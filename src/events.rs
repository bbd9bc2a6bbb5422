use crate::error::CollinsError;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

pub const TOPIC_READY: &str = "ready";
pub const TOPIC_STARTED: &str = "started";
pub const TOPIC_START_FAILED: &str = "error:start";

/// Lifecycle notifications published by the host
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Every gear is configured and initialized
    Ready {
        at: DateTime<Utc>,
        gears: Vec<String>,
    },
    /// Every initialized gear is connected
    Started {
        at: DateTime<Utc>,
        gears: Vec<String>,
    },
    /// A pipeline stage failed; carries the first error of that stage
    StartFailed {
        at: DateTime<Utc>,
        error: CollinsError,
    },
}

impl LifecycleEvent {
    pub fn ready(gears: Vec<String>) -> Self {
        Self::Ready {
            at: Utc::now(),
            gears,
        }
    }

    pub fn started(gears: Vec<String>) -> Self {
        Self::Started {
            at: Utc::now(),
            gears,
        }
    }

    pub fn start_failed(error: CollinsError) -> Self {
        Self::StartFailed {
            at: Utc::now(),
            error,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Self::Ready { .. } => TOPIC_READY,
            Self::Started { .. } => TOPIC_STARTED,
            Self::StartFailed { .. } => TOPIC_START_FAILED,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Ready { at, .. } | Self::Started { at, .. } | Self::StartFailed { at, .. } => *at,
        }
    }
}

/// Broadcast channel the host emits lifecycle events on
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Publishes `event`; returns how many subscribers received it.
    pub fn emit(&self, event: LifecycleEvent) -> usize {
        let topic = event.topic();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(topic, receivers, "Lifecycle event emitted");
                receivers
            }
            // No subscribers is not an error for the host
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_topics() {
        assert_eq!(LifecycleEvent::ready(vec![]).topic(), "ready");
        assert_eq!(LifecycleEvent::started(vec![]).topic(), "started");
        let err = CollinsError::with_details(ErrorKind::MissingConfig, "missing");
        assert_eq!(LifecycleEvent::start_failed(err).topic(), "error:start");
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(LifecycleEvent::ready(vec!["slack".to_string()])), 1);
        match rx.recv().await.unwrap() {
            LifecycleEvent::Ready { gears, .. } => assert_eq!(gears, vec!["slack"]),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(LifecycleEvent::started(vec![])), 0);
    }
}
