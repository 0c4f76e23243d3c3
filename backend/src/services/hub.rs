//! Process-wide registry of live sessions, at most one per user.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::session::{SessionHandle, SessionId};

/// What happened to a frame handed to [`Hub::send_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// No session is registered for the user. Nothing is stored for later.
    Offline,
    /// The session could not take the frame and was torn down.
    Dropped,
}

/// Cheap to clone; every clone shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    inner: Arc<HubInner>,
}

#[derive(Debug, Default)]
struct HubInner {
    sessions: DashMap<Uuid, SessionHandle>,
    last_session_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_session_id(&self) -> SessionId {
        self.inner.last_session_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Last registration wins. The displaced handle is returned and left
    /// running; its own teardown will not remove the newer entry.
    pub fn register(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.inner.sessions.insert(handle.user_id(), handle)
    }

    /// Removes the user's entry only if it still belongs to `session_id`.
    pub fn deregister(&self, user_id: Uuid, session_id: SessionId) -> bool {
        self.inner
            .sessions
            .remove_if(&user_id, |_, handle| handle.id() == session_id)
            .is_some()
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.sessions.contains_key(&user_id)
    }

    pub fn online_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Serializes `event` and enqueues it for the user's session.
    pub fn send_to<E: Serialize>(&self, user_id: Uuid, event: &E) -> Delivery {
        match serde_json::to_string(event) {
            Ok(frame) => self.send_frame(user_id, frame),
            Err(error) => {
                warn!(%user_id, %error, "event failed to serialize");
                Delivery::Dropped
            }
        }
    }

    /// Serializes `event` once and enqueues it for each user in turn.
    /// Deliveries come back in the order of `user_ids`.
    pub fn send_to_many<E: Serialize>(&self, user_ids: &[Uuid], event: &E) -> Vec<Delivery> {
        match serde_json::to_string(event) {
            Ok(frame) => user_ids
                .iter()
                .map(|user_id| self.send_frame(*user_id, frame.clone()))
                .collect(),
            Err(error) => {
                warn!(recipients = user_ids.len(), %error, "event failed to serialize");
                vec![Delivery::Dropped; user_ids.len()]
            }
        }
    }

    /// Never blocks. A session whose queue is full or already closed is
    /// deregistered and closed; other users are unaffected.
    pub fn send_frame(&self, user_id: Uuid, frame: String) -> Delivery {
        let stalled = {
            let Some(handle) = self.inner.sessions.get(&user_id) else {
                return Delivery::Offline;
            };
            match handle.try_enqueue(frame) {
                Ok(()) => return Delivery::Queued,
                Err(TrySendError::Full(_)) => {
                    warn!(%user_id, session_id = handle.id(), "outbound queue full, dropping session");
                    handle.clone()
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%user_id, session_id = handle.id(), "outbound queue closed");
                    handle.clone()
                }
            }
        };

        // the map guard is released above; removal locks the same shard
        self.deregister(user_id, stalled.id());
        stalled.close();
        Delivery::Dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, TypingEvent};

    fn attach(hub: &Hub, user_id: Uuid, capacity: usize) -> (SessionHandle, tokio::sync::mpsc::Receiver<String>) {
        let (handle, queue) = SessionHandle::new(hub.next_session_id(), user_id, capacity);
        hub.register(handle.clone());
        (handle, queue)
    }

    fn typing(user_id: Uuid) -> Event {
        Event::Typing(TypingEvent {
            match_id: Uuid::nil(),
            user_id,
            is_typing: true,
        })
    }

    #[test]
    fn offline_user_is_a_no_op() {
        let hub = Hub::new();
        let user = Uuid::new_v4();
        assert_eq!(hub.send_to(user, &typing(user)), Delivery::Offline);
        assert_eq!(hub.online_count(), 0);
    }

    #[test]
    fn frames_arrive_in_order() {
        let hub = Hub::new();
        let user = Uuid::new_v4();
        let (_handle, mut queue) = attach(&hub, user, 8);

        for frame in ["first", "second", "third"] {
            assert_eq!(hub.send_frame(user, frame.to_string()), Delivery::Queued);
        }
        assert_eq!(queue.try_recv().unwrap(), "first");
        assert_eq!(queue.try_recv().unwrap(), "second");
        assert_eq!(queue.try_recv().unwrap(), "third");
    }

    #[test]
    fn newer_session_displaces_older_one() {
        let hub = Hub::new();
        let user = Uuid::new_v4();
        let (old, mut old_queue) = attach(&hub, user, 4);
        let (new, mut new_queue) = attach(&hub, user, 4);

        hub.send_frame(user, "hello".to_string());
        assert_eq!(new_queue.try_recv().unwrap(), "hello");
        assert!(old_queue.try_recv().is_err());

        // the stale session's teardown must leave the newer entry alone
        assert!(!hub.deregister(user, old.id()));
        assert!(hub.is_online(user));
        assert!(hub.deregister(user, new.id()));
        assert!(!hub.is_online(user));
    }

    #[test]
    fn full_queue_tears_down_only_that_session() {
        let hub = Hub::new();
        let slow = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        let (slow_handle, _slow_queue) = attach(&hub, slow, 1);
        let (_healthy_handle, mut healthy_queue) = attach(&hub, healthy, 4);

        assert_eq!(hub.send_frame(slow, "one".to_string()), Delivery::Queued);
        assert_eq!(hub.send_frame(slow, "two".to_string()), Delivery::Dropped);

        assert!(!hub.is_online(slow));
        assert!(slow_handle.is_closed());
        assert_eq!(hub.send_frame(slow, "three".to_string()), Delivery::Offline);

        assert_eq!(hub.send_frame(healthy, "fine".to_string()), Delivery::Queued);
        assert_eq!(healthy_queue.try_recv().unwrap(), "fine");
    }

    #[test]
    fn closed_queue_is_deregistered() {
        let hub = Hub::new();
        let user = Uuid::new_v4();
        let (_handle, queue) = attach(&hub, user, 4);
        drop(queue);

        assert_eq!(hub.send_frame(user, "gone".to_string()), Delivery::Dropped);
        assert!(!hub.is_online(user));
    }

    #[test]
    fn fan_out_reports_each_recipient() {
        let hub = Hub::new();
        let online = Uuid::new_v4();
        let offline = Uuid::new_v4();
        let (_handle, mut queue) = attach(&hub, online, 4);

        let deliveries = hub.send_to_many(&[offline, online], &typing(online));
        assert_eq!(deliveries, vec![Delivery::Offline, Delivery::Queued]);

        let frame: serde_json::Value = serde_json::from_str(&queue.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "typing");
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn typed_events_are_serialized_as_envelopes() {
        let hub = Hub::new();
        let user = Uuid::new_v4();
        let (_handle, mut queue) = attach(&hub, user, 4);

        hub.send_to(user, &typing(user));
        let frame: serde_json::Value = serde_json::from_str(&queue.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "typing");
        assert_eq!(frame["payload"]["user_id"], user.to_string());
    }
}
