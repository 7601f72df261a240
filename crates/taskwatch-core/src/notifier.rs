//! Event fan-out: one notification per current watcher per event.
//!
//! Producers (item updates, comment creation) call [`EventNotifier::notify`]
//! explicitly after their own write commits. Delivery is at-least-once
//! per call: events carry no identity, so a retried call creates
//! duplicate rows. The fan-out is not wrapped in a transaction — a
//! failure aborts the remaining inserts, but rows written earlier in the
//! same call stay durable. Callers that retry accept duplicates; callers
//! that drop the event accept losing the remainder.

use crate::db::now_us;
use crate::error::WatchResult;
use crate::model::{EventType, Priority, Status};
use crate::registry::WatchRegistry;
use rusqlite::{Connection, params};
use serde_json::json;
use uuid::Uuid;

/// Comment excerpts carried in notification payloads are truncated to
/// this many characters.
pub const COMMENT_EXCERPT_CHARS: usize = 100;

/// A change on an item, with the display payload watchers will see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEvent {
    StatusChange {
        old: Status,
        new: Status,
    },
    PriorityChange {
        old: Priority,
        new: Priority,
    },
    Comment {
        comment_id: String,
        excerpt: String,
        author_id: String,
    },
    Assignment {
        old: Option<String>,
        new: Option<String>,
    },
    DueDateChange {
        old_us: Option<i64>,
        new_us: Option<i64>,
    },
    TitleChange {
        old: String,
        new: String,
    },
}

impl ItemEvent {
    /// Build a comment event, truncating the body to
    /// [`COMMENT_EXCERPT_CHARS`] on a character boundary.
    #[must_use]
    pub fn comment(comment_id: &str, body: &str, author_id: &str) -> Self {
        Self::Comment {
            comment_id: comment_id.to_string(),
            excerpt: body.chars().take(COMMENT_EXCERPT_CHARS).collect(),
            author_id: author_id.to_string(),
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::StatusChange { .. } => EventType::StatusChange,
            Self::PriorityChange { .. } => EventType::PriorityChange,
            Self::Comment { .. } => EventType::Comment,
            Self::Assignment { .. } => EventType::Assignment,
            Self::DueDateChange { .. } => EventType::DueDateChange,
            Self::TitleChange { .. } => EventType::TitleChange,
        }
    }

    /// The opaque display payload stored alongside the notification.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::StatusChange { old, new } => json!({
                "old_status": old.as_str(),
                "new_status": new.as_str(),
            }),
            Self::PriorityChange { old, new } => json!({
                "old_priority": old.as_str(),
                "new_priority": new.as_str(),
            }),
            Self::Comment {
                comment_id,
                excerpt,
                author_id,
            } => json!({
                "comment_id": comment_id,
                "excerpt": excerpt,
                "author_id": author_id,
            }),
            Self::Assignment { old, new } => json!({
                "old_assignee_id": old,
                "new_assignee_id": new,
            }),
            Self::DueDateChange { old_us, new_us } => json!({
                "old_due_at": old_us,
                "new_due_at": new_us,
            }),
            Self::TitleChange { old, new } => json!({
                "old_title": old,
                "new_title": new,
            }),
        }
    }
}

pub struct EventNotifier<'a> {
    conn: &'a Connection,
}

impl<'a> EventNotifier<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fan the event out to every current watcher of `item_id`, skipping
    /// `exclude_user_id` (the actor is not notified of their own
    /// change). Returns the number of notifications created; zero
    /// watchers is not an error.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any insert fails; callers must not
    /// assume anything about which watchers were notified after an
    /// error (see module docs).
    pub fn notify(
        &self,
        registry: &WatchRegistry<'_>,
        item_id: &str,
        event: &ItemEvent,
        exclude_user_id: Option<&str>,
    ) -> WatchResult<usize> {
        let subscriptions = registry.subscriptions(item_id)?;

        let payload = event.payload().to_string();
        let event_type = event.event_type();
        let mut created = 0usize;

        for subscription in subscriptions {
            if exclude_user_id == Some(subscription.user_id.as_str()) {
                continue;
            }

            self.conn.execute(
                "INSERT INTO notifications
                   (notification_id, subscription_id, user_id, item_id,
                    event_type, payload, read_at_us, created_at_us)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
                params![
                    Uuid::new_v4().to_string(),
                    subscription.subscription_id,
                    subscription.user_id,
                    item_id,
                    event_type.as_str(),
                    payload,
                    now_us()
                ],
            )?;
            created += 1;
        }

        tracing::debug!(item_id, event_type = %event_type, created, "fanned out event");
        Ok(created)
    }
}
