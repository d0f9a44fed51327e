//! Push-channel management.
//!
//! At most one channel per correlation id. A single keep-alive probe is
//! scheduled after a fixed delay; a failed probe write means the client
//! disconnected and the channel registration is dropped without retry,
//! so disconnect detection is bounded by the probe delay, not
//! immediate. Delivery removes the channel first, making a second
//! delivery attempt a silent no-op.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;

use op_protocol::response::RenderedResponse;

/// A named push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushEvent {
    /// Event name on the wire.
    pub name: &'static str,
    /// JSON payload.
    pub data: serde_json::Value,
}

/// Builds the `loggedIn` event for a built response: `{url}` for
/// redirects, `{page}` for rendered pages.
#[must_use]
pub fn logged_in_event(response: &RenderedResponse) -> PushEvent {
    let data = match response {
        RenderedResponse::Redirect(uri) => serde_json::json!({ "url": uri.as_str() }),
        RenderedResponse::Page(html) => serde_json::json!({ "page": html }),
    };
    PushEvent {
        name: "loggedIn",
        data,
    }
}

/// What flows over a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// Keep-alive probe; rendered as an event-stream comment.
    KeepAlive,
    /// A named event.
    Event(PushEvent),
}

/// Per-correlation-id push channels with keep-alive.
#[derive(Debug)]
pub struct NotificationDispatcher {
    channels: Arc<DashMap<String, mpsc::Sender<StreamItem>>>,
    keepalive_delay: Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with the given keep-alive probe delay.
    #[must_use]
    pub fn new(keepalive_delay: Duration) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            keepalive_delay,
        }
    }

    /// Opens a channel for a correlation id, replacing any previous
    /// one, and schedules the keep-alive probe.
    pub fn open(&self, correlation_id: &str) -> mpsc::Receiver<StreamItem> {
        let (tx, rx) = mpsc::channel(8);
        self.channels.insert(correlation_id.to_string(), tx);

        let channels = Arc::clone(&self.channels);
        let id = correlation_id.to_string();
        let delay = self.keepalive_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(tx) = channels.get(&id).map(|e| e.value().clone()) else {
                return;
            };
            if tx.send(StreamItem::KeepAlive).await.is_err() {
                tracing::debug!(correlation_id = %id, "keep-alive probe failed, dropping channel");
                channels.remove(&id);
            }
        });

        rx
    }

    /// Delivers an event to the channel for an id, if one is
    /// registered. The channel is removed before the write, so a
    /// racing second delivery finds nothing and does nothing.
    ///
    /// Returns whether an event was pushed.
    pub async fn notify(&self, correlation_id: &str, event: PushEvent) -> bool {
        let Some((_, tx)) = self.channels.remove(correlation_id) else {
            return false;
        };
        match tx.send(StreamItem::Event(event)).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(%correlation_id, "watcher gone before delivery");
                false
            }
        }
    }

    /// Drops the channel for an id, if any.
    pub fn remove(&self, correlation_id: &str) {
        self.channels.remove(correlation_id);
    }

    /// Whether a channel is currently registered for the id.
    #[must_use]
    pub fn has_channel(&self, correlation_id: &str) -> bool {
        self.channels.contains_key(correlation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u64) -> PushEvent {
        PushEvent {
            name: "loggedIn",
            data: serde_json::json!({ "n": n }),
        }
    }

    #[tokio::test]
    async fn notify_delivers_to_open_channel() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(10));
        let mut rx = dispatcher.open("id-1");
        assert!(dispatcher.notify("id-1", event(1)).await);
        assert_eq!(rx.recv().await, Some(StreamItem::Event(event(1))));
    }

    #[tokio::test]
    async fn second_notify_is_a_no_op() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(10));
        let mut rx = dispatcher.open("id-1");
        assert!(dispatcher.notify("id-1", event(1)).await);
        assert!(!dispatcher.notify("id-1", event(2)).await);

        assert_eq!(rx.recv().await, Some(StreamItem::Event(event(1))));
        // channel closed after delivery, no second event
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn notify_without_channel_reports_undelivered() {
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(10));
        assert!(!dispatcher.notify("nobody", event(1)).await);
    }

    #[tokio::test]
    async fn keepalive_probe_drops_disconnected_channel() {
        let dispatcher = NotificationDispatcher::new(Duration::from_millis(20));
        let rx = dispatcher.open("id-1");
        drop(rx);
        assert!(dispatcher.has_channel("id-1"));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!dispatcher.has_channel("id-1"));
    }

    #[tokio::test]
    async fn keepalive_probe_keeps_live_channel() {
        let dispatcher = NotificationDispatcher::new(Duration::from_millis(20));
        let mut rx = dispatcher.open("id-1");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(dispatcher.has_channel("id-1"));
        assert_eq!(rx.recv().await, Some(StreamItem::KeepAlive));
    }

    #[test]
    fn logged_in_event_payloads() {
        let redirect = RenderedResponse::Redirect(
            url::Url::parse("https://client.example/cb#id_token=x").unwrap(),
        );
        let event = logged_in_event(&redirect);
        assert_eq!(event.name, "loggedIn");
        assert_eq!(event.data["url"], "https://client.example/cb#id_token=x");

        let page = RenderedResponse::Page("<html></html>".to_string());
        assert_eq!(logged_in_event(&page).data["page"], "<html></html>");
    }
}
