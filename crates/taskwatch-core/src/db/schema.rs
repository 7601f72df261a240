//! Canonical SQLite schema for the taskwatch store.
//!
//! The schema is normalized for queryability:
//! - `users`, `teams`, `team_members`, `items`, `item_comments` hold the
//!   collaborator state the watch subsystem joins against
//! - `subscriptions` is the watch registry (unique per item/user pair)
//! - `notifications` is the per-watcher notification store
//!
//! Referential integrity is enforced in the schema itself: deleting an
//! item cascades into its subscriptions and notifications, and deleting
//! a subscription cascades into its notifications, so an orphaned
//! notification cannot exist.

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    email TEXT NOT NULL UNIQUE,
    avatar TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    team_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    color TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    joined_at_us INTEGER NOT NULL,
    PRIMARY KEY (team_id, user_id)
);

CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in_progress', 'finished')),
    priority TEXT NOT NULL DEFAULT 'medium'
        CHECK (priority IN ('low', 'medium', 'high')),
    due_at_us INTEGER,
    created_by TEXT NOT NULL REFERENCES users(user_id),
    assignee_id TEXT REFERENCES users(user_id) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_comments (
    comment_id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES users(user_id),
    body TEXT NOT NULL CHECK (length(body) BETWEEN 1 AND 2000),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at_us INTEGER NOT NULL,
    UNIQUE (item_id, user_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    subscription_id TEXT NOT NULL
        REFERENCES subscriptions(subscription_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    event_type TEXT NOT NULL CHECK (event_type IN (
        'status_change', 'priority_change', 'comment',
        'assignment', 'due_date_change', 'title_change'
    )),
    payload TEXT,
    read_at_us INTEGER,
    created_at_us INTEGER NOT NULL
);
"#;

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_team_members_user
    ON team_members(user_id, team_id);

CREATE INDEX IF NOT EXISTS idx_items_team_status
    ON items(team_id, status);

CREATE INDEX IF NOT EXISTS idx_items_updated
    ON items(updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_item_comments_item_created
    ON item_comments(item_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_subscriptions_item_created
    ON subscriptions(item_id, created_at_us ASC);

CREATE INDEX IF NOT EXISTS idx_subscriptions_user
    ON subscriptions(user_id, item_id);

CREATE INDEX IF NOT EXISTS idx_notifications_user_read
    ON notifications(user_id, read_at_us);

CREATE INDEX IF NOT EXISTS idx_notifications_item_user_created
    ON notifications(item_id, user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_notifications_subscription
    ON notifications(subscription_id);
"#;

/// Indexes that must exist after migration, used by schema tests.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_team_members_user",
    "idx_items_team_status",
    "idx_items_updated",
    "idx_item_comments_item_created",
    "idx_subscriptions_item_created",
    "idx_subscriptions_user",
    "idx_notifications_user_read",
    "idx_notifications_item_user_created",
    "idx_notifications_subscription",
];
