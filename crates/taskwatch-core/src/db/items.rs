//! Work-item store collaborator.
//!
//! The watch subsystem treats items as external state it joins against.
//! The field-update helpers here return the previous value so the event
//! producer can build the matching [`crate::notifier::ItemEvent`] and
//! call the notifier explicitly after the write — fan-out is never a
//! storage-layer hook.

use crate::db::now_us;
use crate::error::{WatchError, WatchResult};
use crate::model::{Comment, Item, Priority, Status};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;
use uuid::Uuid;

/// Longest comment body accepted by the store.
pub const MAX_COMMENT_BODY_CHARS: usize = 2_000;

/// Fields for a new work item.
#[derive(Debug, Clone)]
pub struct NewItem<'a> {
    pub team_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: Priority,
    pub due_at_us: Option<i64>,
    pub created_by: &'a str,
    pub assignee_id: Option<&'a str>,
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let status: String = row.get(4)?;
    let priority: String = row.get(5)?;
    Ok(Item {
        item_id: row.get(0)?,
        team_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: Status::from_str(&status).map_err(|_| rusqlite::Error::InvalidQuery)?,
        priority: Priority::from_str(&priority).map_err(|_| rusqlite::Error::InvalidQuery)?,
        due_at_us: row.get(6)?,
        created_by: row.get(7)?,
        assignee_id: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

const ITEM_COLUMNS: &str = "item_id, team_id, title, description, status, priority, \
                            due_at_us, created_by, assignee_id, created_at_us, updated_at_us";

/// Insert a new item in `pending` status and return it.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn create_item(conn: &Connection, new: &NewItem<'_>) -> WatchResult<Item> {
    let now = now_us();
    let item = Item {
        item_id: Uuid::new_v4().to_string(),
        team_id: new.team_id.to_string(),
        title: new.title.to_string(),
        description: new.description.map(ToString::to_string),
        status: Status::Pending,
        priority: new.priority,
        due_at_us: new.due_at_us,
        created_by: new.created_by.to_string(),
        assignee_id: new.assignee_id.map(ToString::to_string),
        created_at_us: now,
        updated_at_us: now,
    };

    conn.execute(
        "INSERT INTO items (item_id, team_id, title, description, status, priority,
                            due_at_us, created_by, assignee_id, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.item_id,
            item.team_id,
            item.title,
            item.description,
            item.status.as_str(),
            item.priority.as_str(),
            item.due_at_us,
            item.created_by,
            item.assignee_id,
            item.created_at_us,
            item.updated_at_us
        ],
    )?;

    tracing::debug!(item_id = %item.item_id, "created item");
    Ok(item)
}

/// Fetch an item by id, `None` when absent.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn find_item(conn: &Connection, item_id: &str) -> WatchResult<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1");
    Ok(conn
        .query_row(&sql, params![item_id], row_to_item)
        .optional()?)
}

/// Fetch an item by id.
///
/// # Errors
///
/// Returns `ItemNotFound` when no such item exists.
pub fn get_item(conn: &Connection, item_id: &str) -> WatchResult<Item> {
    find_item(conn, item_id)?.ok_or(WatchError::ItemNotFound)
}

fn touch(conn: &Connection, item_id: &str) -> WatchResult<()> {
    conn.execute(
        "UPDATE items SET updated_at_us = ?1 WHERE item_id = ?2",
        params![now_us(), item_id],
    )?;
    Ok(())
}

/// Set the item's status, returning `(old, new)`.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist.
pub fn set_status(
    conn: &Connection,
    item_id: &str,
    status: Status,
) -> WatchResult<(Status, Status)> {
    let item = get_item(conn, item_id)?;
    conn.execute(
        "UPDATE items SET status = ?1 WHERE item_id = ?2",
        params![status.as_str(), item_id],
    )?;
    touch(conn, item_id)?;
    Ok((item.status, status))
}

/// Set the item's priority, returning `(old, new)`.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist.
pub fn set_priority(
    conn: &Connection,
    item_id: &str,
    priority: Priority,
) -> WatchResult<(Priority, Priority)> {
    let item = get_item(conn, item_id)?;
    conn.execute(
        "UPDATE items SET priority = ?1 WHERE item_id = ?2",
        params![priority.as_str(), item_id],
    )?;
    touch(conn, item_id)?;
    Ok((item.priority, priority))
}

/// Set the item's title, returning the previous title.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist, `Validation`
/// when the new title is blank.
pub fn set_title(conn: &Connection, item_id: &str, title: &str) -> WatchResult<String> {
    if title.trim().is_empty() {
        return Err(WatchError::Validation("title must not be empty".into()));
    }
    let item = get_item(conn, item_id)?;
    conn.execute(
        "UPDATE items SET title = ?1 WHERE item_id = ?2",
        params![title, item_id],
    )?;
    touch(conn, item_id)?;
    Ok(item.title)
}

/// Set or clear the item's due date, returning the previous value.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist.
pub fn set_due_date(
    conn: &Connection,
    item_id: &str,
    due_at_us: Option<i64>,
) -> WatchResult<Option<i64>> {
    let item = get_item(conn, item_id)?;
    conn.execute(
        "UPDATE items SET due_at_us = ?1 WHERE item_id = ?2",
        params![due_at_us, item_id],
    )?;
    touch(conn, item_id)?;
    Ok(item.due_at_us)
}

/// Set or clear the item's assignee, returning the previous value.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist.
pub fn set_assignee(
    conn: &Connection,
    item_id: &str,
    assignee_id: Option<&str>,
) -> WatchResult<Option<String>> {
    let item = get_item(conn, item_id)?;
    conn.execute(
        "UPDATE items SET assignee_id = ?1 WHERE item_id = ?2",
        params![assignee_id, item_id],
    )?;
    touch(conn, item_id)?;
    Ok(item.assignee_id)
}

/// Append a comment to an item and return it. The caller is responsible
/// for invoking the notifier with the comment event afterwards.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist, `Validation`
/// when the body is empty or too long.
pub fn add_comment(
    conn: &Connection,
    item_id: &str,
    author_id: &str,
    body: &str,
) -> WatchResult<Comment> {
    if body.trim().is_empty() {
        return Err(WatchError::Validation("comment body must not be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_BODY_CHARS {
        return Err(WatchError::Validation(format!(
            "comment body must be <= {MAX_COMMENT_BODY_CHARS} characters"
        )));
    }
    get_item(conn, item_id)?;

    let comment = Comment {
        comment_id: Uuid::new_v4().to_string(),
        item_id: item_id.to_string(),
        author_id: author_id.to_string(),
        body: body.to_string(),
        created_at_us: now_us(),
    };

    conn.execute(
        "INSERT INTO item_comments (comment_id, item_id, author_id, body, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.comment_id,
            comment.item_id,
            comment.author_id,
            comment.body,
            comment.created_at_us
        ],
    )?;
    touch(conn, item_id)?;
    Ok(comment)
}

/// Delete an item. Subscriptions and notifications cascade away with it.
///
/// # Errors
///
/// Returns `ItemNotFound` when the item does not exist.
pub fn delete_item(conn: &Connection, item_id: &str) -> WatchResult<()> {
    let affected = conn.execute("DELETE FROM items WHERE item_id = ?1", params![item_id])?;
    if affected == 0 {
        return Err(WatchError::ItemNotFound);
    }
    tracing::info!(item_id, "deleted item");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NewItem, add_comment, create_item, delete_item, get_item, set_status, set_title};
    use crate::db::{directory, open_in_memory};
    use crate::error::WatchError;
    use crate::model::{Priority, Status};
    use rusqlite::Connection;

    fn seed_item(conn: &Connection) -> (String, String) {
        let user = directory::create_user(conn, "Ana", "ana@example.com", None).expect("user");
        let team = directory::create_team(conn, "Platform", None).expect("team");
        directory::add_member(conn, &team.team_id, &user.user_id).expect("member");
        let item = create_item(
            conn,
            &NewItem {
                team_id: &team.team_id,
                title: "Fix login flow",
                description: None,
                priority: Priority::Medium,
                due_at_us: None,
                created_by: &user.user_id,
                assignee_id: None,
            },
        )
        .expect("item");
        (item.item_id, user.user_id)
    }

    #[test]
    fn status_update_returns_old_and_new_and_bumps_updated() {
        let conn = open_in_memory().expect("open store");
        let (item_id, _) = seed_item(&conn);

        let before = get_item(&conn, &item_id).expect("get");
        let (old, new) = set_status(&conn, &item_id, Status::InProgress).expect("update");
        assert_eq!(old, Status::Pending);
        assert_eq!(new, Status::InProgress);

        let after = get_item(&conn, &item_id).expect("get");
        assert_eq!(after.status, Status::InProgress);
        assert!(after.updated_at_us >= before.updated_at_us);
    }

    #[test]
    fn title_update_rejects_blank() {
        let conn = open_in_memory().expect("open store");
        let (item_id, _) = seed_item(&conn);

        let err = set_title(&conn, &item_id, "   ").expect_err("must fail");
        assert!(matches!(err, WatchError::Validation(_)));
    }

    #[test]
    fn comment_body_bounds_are_enforced() {
        let conn = open_in_memory().expect("open store");
        let (item_id, user_id) = seed_item(&conn);

        assert!(matches!(
            add_comment(&conn, &item_id, &user_id, "").expect_err("empty"),
            WatchError::Validation(_)
        ));
        let long = "x".repeat(super::MAX_COMMENT_BODY_CHARS + 1);
        assert!(matches!(
            add_comment(&conn, &item_id, &user_id, &long).expect_err("too long"),
            WatchError::Validation(_)
        ));
        add_comment(&conn, &item_id, &user_id, "looks good").expect("valid comment");
    }

    #[test]
    fn missing_item_is_not_found() {
        let conn = open_in_memory().expect("open store");
        assert!(matches!(
            get_item(&conn, "missing").expect_err("must fail"),
            WatchError::ItemNotFound
        ));
        assert!(matches!(
            delete_item(&conn, "missing").expect_err("must fail"),
            WatchError::ItemNotFound
        ));
    }
}
