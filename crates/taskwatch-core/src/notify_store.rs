//! Read/unread notification state.
//!
//! A notification is unread until `read_at_us` is set; the transition
//! happens once, via a single UPDATE statement, and is never reversed.
//! Notifications created after that statement's snapshot stay unread —
//! there is no "read up to event X" guarantee.

use crate::config::WatchConfig;
use crate::db::now_us;
use crate::error::WatchResult;
use crate::model::{EventType, NotificationDetail};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::str::FromStr;

/// Unread summary for one item: exact count, newest-first details up to
/// the configured cap, and how many more exist beyond the cap.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ItemUnread {
    pub unread: u64,
    pub details: Vec<NotificationDetail>,
    pub overflow: u64,
}

pub struct NotificationStore<'a> {
    conn: &'a Connection,
    config: WatchConfig,
}

impl<'a> NotificationStore<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection, config: WatchConfig) -> Self {
        Self { conn, config }
    }

    /// Count of all unread notifications for the user, across all items.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn count_unread(&self, user_id: &str) -> WatchResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications
             WHERE user_id = ?1 AND read_at_us IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Mark every unread notification for `(item, user)` as read now.
    /// Returns the number of rows affected; idempotent — a second
    /// immediate call returns 0.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn mark_item_read(&self, item_id: &str, user_id: &str) -> WatchResult<u64> {
        let affected = self.conn.execute(
            "UPDATE notifications SET read_at_us = ?1
             WHERE item_id = ?2 AND user_id = ?3 AND read_at_us IS NULL",
            params![now_us(), item_id, user_id],
        )?;
        tracing::debug!(item_id, user_id, affected, "marked notifications read");
        Ok(u64::try_from(affected).unwrap_or(0))
    }

    /// Unread summaries for the given items, keyed by item id. Details
    /// are newest-first and capped at `config.detail_limit`; the unread
    /// count stays exact and the remainder is reported as `overflow`.
    /// Items without unread notifications are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure, or a payload error if a
    /// stored payload is not valid JSON.
    pub fn unread_detail_for_items(
        &self,
        item_ids: &[String],
        user_id: &str,
    ) -> WatchResult<HashMap<String, ItemUnread>> {
        let mut result = HashMap::new();
        if item_ids.is_empty() {
            return Ok(result);
        }

        let mut count_stmt = self.conn.prepare(
            "SELECT COUNT(*) FROM notifications
             WHERE item_id = ?1 AND user_id = ?2 AND read_at_us IS NULL",
        )?;
        let mut detail_stmt = self.conn.prepare(
            "SELECT event_type, payload, created_at_us
             FROM notifications
             WHERE item_id = ?1 AND user_id = ?2 AND read_at_us IS NULL
             ORDER BY created_at_us DESC, notification_id ASC
             LIMIT ?3",
        )?;

        for item_id in item_ids {
            let unread: i64 =
                count_stmt.query_row(params![item_id, user_id], |row| row.get(0))?;
            if unread == 0 {
                continue;
            }

            let rows = detail_stmt.query_map(
                params![item_id, user_id, i64::from(self.config.detail_limit)],
                |row| {
                    let event_type: String = row.get(0)?;
                    let payload: Option<String> = row.get(1)?;
                    Ok((event_type, payload, row.get::<_, i64>(2)?))
                },
            )?;

            let mut details = Vec::new();
            for row in rows {
                let (event_type, payload, created_at_us) = row?;
                let payload = match payload {
                    Some(raw) => Some(serde_json::from_str(&raw)?),
                    None => None,
                };
                details.push(NotificationDetail {
                    event_type: EventType::from_str(&event_type)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    payload,
                    created_at_us,
                });
            }

            let unread = u64::try_from(unread).unwrap_or(0);
            let overflow = unread.saturating_sub(u64::try_from(details.len()).unwrap_or(0));
            result.insert(
                item_id.clone(),
                ItemUnread {
                    unread,
                    details,
                    overflow,
                },
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationStore;
    use crate::activity::RecordingActivityLog;
    use crate::config::WatchConfig;
    use crate::db::{directory, items, open_in_memory};
    use crate::model::{EventType, Priority, Status};
    use crate::notifier::{EventNotifier, ItemEvent};
    use crate::registry::WatchRegistry;
    use rusqlite::Connection;

    struct Fixture {
        conn: Connection,
        item_id: String,
        actor_id: String,
        watcher_id: String,
    }

    fn fixture() -> Fixture {
        let conn = open_in_memory().expect("open store");
        let actor = directory::create_user(&conn, "Ana", "ana@example.com", None).expect("user");
        let watcher = directory::create_user(&conn, "Bob", "bob@example.com", None).expect("user");
        let team = directory::create_team(&conn, "Platform", None).expect("team");
        directory::add_member(&conn, &team.team_id, &actor.user_id).expect("member");
        directory::add_member(&conn, &team.team_id, &watcher.user_id).expect("member");
        let item = items::create_item(
            &conn,
            &items::NewItem {
                team_id: &team.team_id,
                title: "Fix login flow",
                description: None,
                priority: Priority::Medium,
                due_at_us: None,
                created_by: &actor.user_id,
                assignee_id: None,
            },
        )
        .expect("item");
        Fixture {
            conn,
            item_id: item.item_id,
            actor_id: actor.user_id,
            watcher_id: watcher.user_id,
        }
    }

    fn notify_status_change(fx: &Fixture, times: usize) {
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);
        let notifier = EventNotifier::new(&fx.conn);
        let event = ItemEvent::StatusChange {
            old: Status::Pending,
            new: Status::InProgress,
        };
        for _ in 0..times {
            notifier
                .notify(&registry, &fx.item_id, &event, Some(fx.actor_id.as_str()))
                .expect("notify");
        }
    }

    fn subscribe_watcher(fx: &Fixture) {
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);
        registry
            .subscribe(&fx.watcher_id, &fx.item_id)
            .expect("subscribe");
    }

    #[test]
    fn mark_read_is_idempotent() {
        let fx = fixture();
        subscribe_watcher(&fx);
        notify_status_change(&fx, 3);

        let store = NotificationStore::new(&fx.conn, WatchConfig::default());
        assert_eq!(store.count_unread(&fx.watcher_id).expect("count"), 3);

        assert_eq!(
            store
                .mark_item_read(&fx.item_id, &fx.watcher_id)
                .expect("mark"),
            3
        );
        assert_eq!(store.count_unread(&fx.watcher_id).expect("count"), 0);
        assert_eq!(
            store
                .mark_item_read(&fx.item_id, &fx.watcher_id)
                .expect("mark again"),
            0
        );
    }

    #[test]
    fn read_at_is_not_reset_by_later_marks() {
        let fx = fixture();
        subscribe_watcher(&fx);
        notify_status_change(&fx, 1);

        let store = NotificationStore::new(&fx.conn, WatchConfig::default());
        store
            .mark_item_read(&fx.item_id, &fx.watcher_id)
            .expect("mark");
        let first_read_at: i64 = fx
            .conn
            .query_row(
                "SELECT read_at_us FROM notifications WHERE user_id = ?1",
                [fx.watcher_id.as_str()],
                |row| row.get(0),
            )
            .expect("read_at");

        store
            .mark_item_read(&fx.item_id, &fx.watcher_id)
            .expect("mark again");
        let second_read_at: i64 = fx
            .conn
            .query_row(
                "SELECT read_at_us FROM notifications WHERE user_id = ?1",
                [fx.watcher_id.as_str()],
                |row| row.get(0),
            )
            .expect("read_at");
        assert_eq!(first_read_at, second_read_at);
    }

    #[test]
    fn detail_list_is_newest_first_and_capped_with_overflow() {
        let fx = fixture();
        subscribe_watcher(&fx);
        notify_status_change(&fx, 5);

        let config = WatchConfig {
            detail_limit: 2,
            ..WatchConfig::default()
        };
        let store = NotificationStore::new(&fx.conn, config);
        let map = store
            .unread_detail_for_items(&[fx.item_id.clone()], &fx.watcher_id)
            .expect("details");

        let summary = map.get(&fx.item_id).expect("summary present");
        assert_eq!(summary.unread, 5);
        assert_eq!(summary.details.len(), 2);
        assert_eq!(summary.overflow, 3);
        assert!(summary.details[0].created_at_us >= summary.details[1].created_at_us);
        assert_eq!(summary.details[0].event_type, EventType::StatusChange);
    }

    #[test]
    fn items_without_unread_are_absent() {
        let fx = fixture();
        subscribe_watcher(&fx);

        let store = NotificationStore::new(&fx.conn, WatchConfig::default());
        let map = store
            .unread_detail_for_items(&[fx.item_id.clone()], &fx.watcher_id)
            .expect("details");
        assert!(map.is_empty());
    }
}
