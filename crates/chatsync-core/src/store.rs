//! Ordered, id-indexed message store with commit notifications.

use std::{collections::HashMap, sync::RwLock};

use tokio::sync::broadcast;

use crate::message::{Message, MessageId};

/// Commit notification, published after a mutation has been applied.
///
/// A no-op (removing an absent id) publishes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Upserted(MessageId),
    Removed(MessageId),
}

struct Inner {
    order: Vec<MessageId>,
    by_id: HashMap<MessageId, Message>,
}

/// Authoritative local chat state.
///
/// Holds at most one message per id. The insertion sequence defines render
/// order and is never reordered by updates; lookup and membership go through
/// the id index. All mutation happens through [`upsert`](Self::upsert) and
/// [`remove`](Self::remove) - both the push path and the command path
/// converge here.
pub struct MessageStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            inner: RwLock::new(Inner {
                order: Vec::new(),
                by_id: HashMap::new(),
            }),
            events,
        }
    }

    /// Insert a new message at the tail, or update an existing one in place.
    ///
    /// An update replaces `content` and `attachment` only; position, `author`
    /// and `created_at` stay as first seen. Used both for freshly pushed
    /// messages and for confirmed edits.
    pub fn upsert(&self, message: Message) {
        let id = message.id;
        {
            let mut inner = self.inner.write().unwrap();
            if let Some(existing) = inner.by_id.get_mut(&id) {
                existing.content = message.content;
                existing.attachment = message.attachment;
            } else {
                inner.order.push(id);
                inner.by_id.insert(id, message);
            }
        }
        let _ = self.events.send(StoreEvent::Upserted(id));
    }

    /// Remove a message. Absent ids are a no-op, not an error: a delete may
    /// race with a message that already vanished.
    pub fn remove(&self, id: MessageId) -> bool {
        let removed = {
            let mut inner = self.inner.write().unwrap();
            if inner.by_id.remove(&id).is_some() {
                inner.order.retain(|m| *m != id);
                true
            } else {
                false
            }
        };
        if removed {
            let _ = self.events.send(StoreEvent::Removed(id));
        }
        removed
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.inner.read().unwrap().by_id.get(&id).cloned()
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, id: MessageId) -> bool {
        self.inner.read().unwrap().by_id.contains_key(&id)
    }

    /// Snapshot of the messages in render order.
    #[must_use]
    pub fn list(&self) -> Vec<Message> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to commit notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn msg(id: MessageId, content: &str, author: &str) -> Message {
        Message {
            id,
            content: content.to_string(),
            author: author.to_string(),
            created_at: Utc::now(),
            attachment: None,
        }
    }

    #[test]
    fn upsert_never_duplicates_an_id() {
        let store = MessageStore::new();
        store.upsert(msg(1, "hi", "alice"));
        store.upsert(msg(1, "hi again", "alice"));
        store.upsert(msg(2, "yo", "bob"));
        store.upsert(msg(1, "third", "alice"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().content, "third");
    }

    #[test]
    fn update_keeps_position_author_and_created_at() {
        let store = MessageStore::new();
        let first = msg(1, "hi", "alice");
        let created = first.created_at;
        store.upsert(first);
        store.upsert(msg(2, "yo", "bob"));

        store.upsert(msg(1, "edited", "someone-else"));

        let list = store.list();
        assert_eq!(list[0].id, 1);
        assert_eq!(list[0].content, "edited");
        assert_eq!(list[0].author, "alice");
        assert_eq!(list[0].created_at, created);
        assert_eq!(list[1].id, 2);
    }

    #[test]
    fn remove_absent_id_is_a_silent_no_op() {
        let store = MessageStore::new();
        store.upsert(msg(1, "hi", "alice"));
        let mut events = store.subscribe();

        assert!(!store.remove(42));
        assert!(events.try_recv().is_err());

        assert!(store.remove(1));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Removed(1));
        assert!(store.is_empty());
    }

    #[test]
    fn list_preserves_first_seen_order() {
        let store = MessageStore::new();
        for id in [5, 3, 9, 1] {
            store.upsert(msg(id, "m", "a"));
        }
        store.remove(9);
        let ids: Vec<MessageId> = store.list().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 3, 1]);
    }
}
