use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

/// Lifecycle phase reported by a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Imported,
    Sending,
    Processing,
    Processed,
    Exported,
    Error,
}

impl StatusKind {
    /// `processed` and `error` end a job.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusKind::Processed | StatusKind::Error)
    }
}

/// A single notification sent to the UI. Field names follow the JSON shape
/// the frontend has always consumed (`processedPath`, `exportedPath`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: StatusKind,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl StatusEvent {
    fn new(status: StatusKind, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            processed_path: None,
            exported_path: None,
            error: None,
            progress: None,
        }
    }

    pub fn imported(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Imported, message)
    }

    pub fn sending(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Sending, message)
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Processing, message)
    }

    /// A `processing` sub-event carrying a completion percentage.
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(percent.min(100)),
            ..Self::new(StatusKind::Processing, message)
        }
    }

    pub fn processed(processed_path: PathBuf) -> Self {
        Self {
            processed_path: Some(processed_path),
            ..Self::new(StatusKind::Processed, "Processing complete")
        }
    }

    pub fn exported(exported_path: PathBuf) -> Self {
        Self {
            message: format!("Exported to {}", exported_path.display()),
            exported_path: Some(exported_path),
            ..Self::new(StatusKind::Exported, "")
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(StatusKind::Error, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == StatusKind::Error
    }

    /// Text shown in the log. Falls back to the JSON form when the event has
    /// no message.
    pub fn display_text(&self) -> String {
        if !self.message.is_empty() {
            return self.message.clone();
        }
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.status))
    }
}

/// Receives status notifications. Backends report through this while a job
/// runs; the orchestrator decides which observer they get.
pub trait StatusObserver: Send + Sync {
    fn notify(&self, event: StatusEvent);
}

struct Listener {
    id: u64,
    sender: async_channel::Sender<StatusEvent>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

/// Ordered one-to-many broadcast of status events.
#[derive(Clone, Default)]
pub struct StatusChannel {
    inner: Arc<Inner>,
}

/// Handle returned by [`StatusChannel::subscribe`].
pub struct Subscription {
    id: u64,
    channel: Weak<Inner>,
}

impl Subscription {
    /// Stop delivery to the receiver paired with this handle.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.listeners.lock().unwrap().retain(|l| l.id != self.id);
            log::debug!("Status listener {} removed", self.id);
        }
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Every event emitted afterwards arrives on the
    /// receiver, in emission order, until the handle is unsubscribed.
    pub fn subscribe(&self) -> (Subscription, async_channel::Receiver<StatusEvent>) {
        let (sender, receiver) = async_channel::unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .push(Listener { id, sender });
        log::debug!("Status listener {id} added");
        let subscription = Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
        };
        (subscription, receiver)
    }

    /// Whether anyone is still listening.
    pub fn has_listeners(&self) -> bool {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .iter()
            .any(|l| !l.sender.is_closed())
    }

    pub fn emit(&self, event: StatusEvent) {
        log::debug!("status: {:?} {}", event.status, event.message);
        let mut listeners = self.inner.listeners.lock().unwrap();
        // Unbounded senders only fail once the receiver is gone.
        listeners.retain(|l| l.sender.try_send(event.clone()).is_ok());
    }
}

impl StatusObserver for StatusChannel {
    fn notify(&self, event: StatusEvent) {
        self.emit(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Collects events in memory for assertions.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub events: Mutex<Vec<StatusEvent>>,
    }

    impl Recorder {
        pub fn statuses(&self) -> Vec<StatusKind> {
            self.events.lock().unwrap().iter().map(|e| e.status).collect()
        }
    }

    impl StatusObserver for Recorder {
        fn notify(&self, event: StatusEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Drain everything currently queued on a receiver.
    pub(crate) fn drain(rx: &async_channel::Receiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn every_subscriber_sees_events_in_order() {
        let channel = StatusChannel::new();
        let (_a, rx_a) = channel.subscribe();
        let (_b, rx_b) = channel.subscribe();

        channel.emit(StatusEvent::imported("one"));
        channel.emit(StatusEvent::sending("two"));
        channel.emit(StatusEvent::processing("three"));

        for rx in [&rx_a, &rx_b] {
            let messages: Vec<String> = drain(rx).into_iter().map(|e| e.message).collect();
            assert_eq!(messages, ["one", "two", "three"]);
        }
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let channel = StatusChannel::new();
        let (sub, rx) = channel.subscribe();
        assert!(channel.has_listeners());

        sub.unsubscribe();
        channel.emit(StatusEvent::imported("ignored"));

        assert!(drain(&rx).is_empty());
        assert!(!channel.has_listeners());
    }

    #[test]
    fn dropped_receiver_counts_as_gone() {
        let channel = StatusChannel::new();
        let (_sub, rx) = channel.subscribe();
        drop(rx);
        assert!(!channel.has_listeners());
        channel.emit(StatusEvent::imported("nobody"));
    }

    #[test]
    fn json_shape_matches_frontend() {
        let event = StatusEvent::processed(PathBuf::from("/tmp/dissonance/a-processed.wav"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": "processed",
                "message": "Processing complete",
                "processedPath": "/tmp/dissonance/a-processed.wav",
            })
        );
    }

    #[test]
    fn display_text_falls_back_to_json() {
        let mut event = StatusEvent::processing("");
        event.progress = Some(40);
        assert_eq!(
            event.display_text(),
            r#"{"status":"processing","message":"","progress":40}"#
        );
        assert_eq!(StatusEvent::sending("hi").display_text(), "hi");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(StatusEvent::progress(150, "x").progress, Some(100));
        assert!(StatusKind::Error.is_terminal());
        assert!(!StatusKind::Processing.is_terminal());
    }
}
