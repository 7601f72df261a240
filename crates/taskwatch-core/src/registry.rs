//! Watch registry: who watches which item.
//!
//! Owns the `subscriptions` table. Enforces, in order: team membership,
//! uniqueness per `(item, user)`, and the configured per-item watcher
//! ceiling. Concurrent subscribe races are serialized by the storage
//! unique constraint, not by an application lock — the loser surfaces
//! as `AlreadySubscribed`.

use crate::activity::{ActivityEntry, ActivityLog};
use crate::config::WatchConfig;
use crate::db::{directory, items, now_us};
use crate::error::{WatchError, WatchResult};
use crate::model::{Subscription, Watcher};
use rusqlite::{Connection, params};
use uuid::Uuid;

pub struct WatchRegistry<'a> {
    conn: &'a Connection,
    config: WatchConfig,
    activity: &'a dyn ActivityLog,
}

impl<'a> WatchRegistry<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection, config: WatchConfig, activity: &'a dyn ActivityLog) -> Self {
        Self {
            conn,
            config,
            activity,
        }
    }

    /// Subscribe `user_id` to `item_id`.
    ///
    /// Checks run in order, each short-circuiting: the user must be an
    /// active member of the item's owning team (`NotMember`), must not
    /// already be subscribed (`AlreadySubscribed`), and the item must be
    /// below the watcher ceiling (`CapacityExceeded`).
    ///
    /// # Errors
    ///
    /// `ItemNotFound` when the item does not exist, plus the check
    /// failures above or a storage error.
    pub fn subscribe(&self, user_id: &str, item_id: &str) -> WatchResult<Subscription> {
        let item = items::get_item(self.conn, item_id)?;
        let user = directory::get_user(self.conn, user_id)?;

        if !directory::is_active_member(self.conn, &item.team_id, user_id)? {
            return Err(WatchError::NotMember);
        }
        if self.is_watching(user_id, item_id)? {
            return Err(WatchError::AlreadySubscribed);
        }
        if self.watcher_count(item_id)? >= u64::from(self.config.max_watchers_per_item) {
            return Err(WatchError::CapacityExceeded {
                limit: self.config.max_watchers_per_item,
            });
        }

        let subscription = Subscription {
            subscription_id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            created_at_us: now_us(),
        };

        let inserted = self.conn.execute(
            "INSERT INTO subscriptions (subscription_id, item_id, user_id, created_at_us)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                subscription.subscription_id,
                subscription.item_id,
                subscription.user_id,
                subscription.created_at_us
            ],
        );

        match inserted {
            Ok(_) => {}
            // A concurrent subscriber won the race between our existence
            // check and this insert.
            Err(e) if is_unique_violation(&e) => return Err(WatchError::AlreadySubscribed),
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(user_id, item_id, "subscribed");
        self.activity.record(ActivityEntry {
            action: "item_watched",
            description: format!("{} started watching \"{}\"", user.name, item.title),
            user_id: user_id.to_string(),
            team_id: item.team_id,
            item_id: item_id.to_string(),
        });

        Ok(subscription)
    }

    /// Remove the `(item, user)` subscription. Its notifications cascade
    /// away with it.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` when the item does not exist, `NotSubscribed` when
    /// no matching subscription exists.
    pub fn unsubscribe(&self, user_id: &str, item_id: &str) -> WatchResult<()> {
        let item = items::get_item(self.conn, item_id)?;
        let user = directory::get_user(self.conn, user_id)?;

        let affected = self.conn.execute(
            "DELETE FROM subscriptions WHERE item_id = ?1 AND user_id = ?2",
            params![item_id, user_id],
        )?;
        if affected == 0 {
            return Err(WatchError::NotSubscribed);
        }

        tracing::debug!(user_id, item_id, "unsubscribed");
        self.activity.record(ActivityEntry {
            action: "item_unwatched",
            description: format!("{} stopped watching \"{}\"", user.name, item.title),
            user_id: user_id.to_string(),
            team_id: item.team_id,
            item_id: item_id.to_string(),
        });

        Ok(())
    }

    /// All watchers of an item with display fields, oldest subscriber
    /// first. Snapshot at call time.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn list(&self, item_id: &str) -> WatchResult<Vec<Watcher>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.subscription_id, s.user_id, u.name, u.email, u.avatar, s.created_at_us
             FROM subscriptions s
             INNER JOIN users u ON u.user_id = s.user_id
             WHERE s.item_id = ?1
             ORDER BY s.created_at_us ASC, s.subscription_id ASC",
        )?;

        let rows = stmt.query_map(params![item_id], |row| {
            let name: String = row.get(2)?;
            let avatar: Option<String> = row.get(4)?;
            Ok(Watcher {
                subscription_id: row.get(0)?,
                user_id: row.get(1)?,
                email: row.get(3)?,
                avatar: crate::model::user::avatar_or_initial(avatar.as_deref(), &name),
                name,
                subscribed_at_us: row.get(5)?,
            })
        })?;

        let mut watchers = Vec::new();
        for row in rows {
            watchers.push(row?);
        }
        Ok(watchers)
    }

    /// The bare subscriptions for an item, oldest first — the fan-out
    /// input for the notifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn subscriptions(&self, item_id: &str) -> WatchResult<Vec<Subscription>> {
        let mut stmt = self.conn.prepare(
            "SELECT subscription_id, item_id, user_id, created_at_us
             FROM subscriptions
             WHERE item_id = ?1
             ORDER BY created_at_us ASC, subscription_id ASC",
        )?;

        let rows = stmt.query_map(params![item_id], |row| {
            Ok(Subscription {
                subscription_id: row.get(0)?,
                item_id: row.get(1)?,
                user_id: row.get(2)?,
                created_at_us: row.get(3)?,
            })
        })?;

        let mut subscriptions = Vec::new();
        for row in rows {
            subscriptions.push(row?);
        }
        Ok(subscriptions)
    }

    /// Item ids the user currently watches.
    ///
    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn watched_item_ids(&self, user_id: &str) -> WatchResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM subscriptions WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// # Errors
    ///
    /// Returns a storage error on failure.
    pub fn is_watching(&self, user_id: &str, item_id: &str) -> WatchResult<bool> {
        let watching: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM subscriptions WHERE item_id = ?1 AND user_id = ?2
            )",
            params![item_id, user_id],
            |row| row.get(0),
        )?;
        Ok(watching)
    }

    fn watcher_count(&self, item_id: &str) -> WatchResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Only a UNIQUE constraint failure means "someone else holds this
/// (item, user) pair"; other constraint classes (e.g. a foreign key
/// broken by a concurrent item delete) must surface as storage errors.
fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::WatchRegistry;
    use crate::activity::RecordingActivityLog;
    use crate::config::WatchConfig;
    use crate::db::{directory, items, open_in_memory};
    use crate::error::WatchError;
    use crate::model::Priority;
    use rusqlite::Connection;

    struct Fixture {
        conn: Connection,
        team_id: String,
        item_id: String,
        owner_id: String,
    }

    fn fixture() -> Fixture {
        let conn = open_in_memory().expect("open store");
        let owner = directory::create_user(&conn, "Ana", "ana@example.com", None).expect("user");
        let team = directory::create_team(&conn, "Platform", None).expect("team");
        directory::add_member(&conn, &team.team_id, &owner.user_id).expect("member");
        let item = items::create_item(
            &conn,
            &items::NewItem {
                team_id: &team.team_id,
                title: "Fix login flow",
                description: None,
                priority: Priority::Medium,
                due_at_us: None,
                created_by: &owner.user_id,
                assignee_id: None,
            },
        )
        .expect("item");
        Fixture {
            conn,
            team_id: team.team_id,
            item_id: item.item_id,
            owner_id: owner.user_id,
        }
    }

    fn member(fx: &Fixture, name: &str, email: &str) -> String {
        let user = directory::create_user(&fx.conn, name, email, None).expect("user");
        directory::add_member(&fx.conn, &fx.team_id, &user.user_id).expect("member");
        user.user_id
    }

    #[test]
    fn subscribe_then_unsubscribe_round_trip() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        let sub = registry
            .subscribe(&fx.owner_id, &fx.item_id)
            .expect("subscribe");
        assert_eq!(sub.item_id, fx.item_id);
        assert!(registry
            .is_watching(&fx.owner_id, &fx.item_id)
            .expect("query"));

        registry
            .unsubscribe(&fx.owner_id, &fx.item_id)
            .expect("unsubscribe");
        assert!(!registry
            .is_watching(&fx.owner_id, &fx.item_id)
            .expect("query"));

        let actions: Vec<_> = activity.entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["item_watched", "item_unwatched"]);
    }

    #[test]
    fn non_member_cannot_subscribe() {
        let fx = fixture();
        let outsider =
            directory::create_user(&fx.conn, "Eve", "eve@example.com", None).expect("user");
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        let err = registry
            .subscribe(&outsider.user_id, &fx.item_id)
            .expect_err("must fail");
        assert!(matches!(err, WatchError::NotMember));
        assert!(activity.entries().is_empty());
    }

    #[test]
    fn inactive_member_cannot_subscribe() {
        let fx = fixture();
        let user_id = member(&fx, "Bob", "bob@example.com");
        directory::deactivate_member(&fx.conn, &fx.team_id, &user_id).expect("deactivate");
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        assert!(matches!(
            registry.subscribe(&user_id, &fx.item_id).expect_err("fail"),
            WatchError::NotMember
        ));
    }

    #[test]
    fn double_subscribe_conflicts() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        registry
            .subscribe(&fx.owner_id, &fx.item_id)
            .expect("first subscribe");
        let err = registry
            .subscribe(&fx.owner_id, &fx.item_id)
            .expect_err("must fail");
        assert!(matches!(err, WatchError::AlreadySubscribed));
    }

    #[test]
    fn capacity_ceiling_is_configurable() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let config = WatchConfig {
            max_watchers_per_item: 2,
            ..WatchConfig::default()
        };
        let registry = WatchRegistry::new(&fx.conn, config, &activity);

        let a = member(&fx, "Bob", "bob@example.com");
        let b = member(&fx, "Cara", "cara@example.com");
        let c = member(&fx, "Dan", "dan@example.com");

        registry.subscribe(&a, &fx.item_id).expect("first");
        registry.subscribe(&b, &fx.item_id).expect("second");
        let err = registry.subscribe(&c, &fx.item_id).expect_err("third");
        assert!(matches!(err, WatchError::CapacityExceeded { limit: 2 }));
    }

    #[test]
    fn unsubscribe_without_subscription_is_not_found() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        assert!(matches!(
            registry
                .unsubscribe(&fx.owner_id, &fx.item_id)
                .expect_err("must fail"),
            WatchError::NotSubscribed
        ));
    }

    #[test]
    fn list_orders_by_subscription_time() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        let first = member(&fx, "Bob", "bob@example.com");
        let second = member(&fx, "Cara", "cara@example.com");
        registry.subscribe(&first, &fx.item_id).expect("first");
        registry.subscribe(&second, &fx.item_id).expect("second");

        let watchers = registry.list(&fx.item_id).expect("list");
        assert_eq!(watchers.len(), 2);
        assert_eq!(watchers[0].user_id, first);
        assert_eq!(watchers[1].user_id, second);
        // No avatar on record: display falls back to the initial.
        assert_eq!(watchers[0].avatar, "B");
    }

    #[test]
    fn only_unique_violations_read_as_already_subscribed() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);
        registry
            .subscribe(&fx.owner_id, &fx.item_id)
            .expect("subscribe");

        let duplicate = fx
            .conn
            .execute(
                "INSERT INTO subscriptions (subscription_id, item_id, user_id, created_at_us)
                 VALUES ('s-dup', ?1, ?2, 0)",
                rusqlite::params![fx.item_id, fx.owner_id],
            )
            .expect_err("duplicate pair must fail");
        assert!(super::is_unique_violation(&duplicate));

        // A foreign-key failure is also a constraint violation, but it
        // must not be mistaken for an existing subscription.
        let broken_fk = fx
            .conn
            .execute(
                "INSERT INTO subscriptions (subscription_id, item_id, user_id, created_at_us)
                 VALUES ('s-fk', 'missing-item', ?1, 0)",
                rusqlite::params![fx.owner_id],
            )
            .expect_err("missing item must fail");
        assert!(!super::is_unique_violation(&broken_fk));
    }

    #[test]
    fn subscribe_to_missing_item_is_not_found() {
        let fx = fixture();
        let activity = RecordingActivityLog::default();
        let registry = WatchRegistry::new(&fx.conn, WatchConfig::default(), &activity);

        assert!(matches!(
            registry
                .subscribe(&fx.owner_id, "missing")
                .expect_err("must fail"),
            WatchError::ItemNotFound
        ));
    }
}
