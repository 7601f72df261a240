//! Users, teams, and team membership.
//!
//! This is collaborator state, not core watch state: the registry only
//! consults [`is_active_member`] at subscribe time, and the watchlist
//! joins against user/team display fields. Membership is never
//! re-checked after subscription.

use crate::db::now_us;
use crate::error::{WatchError, WatchResult};
use crate::model::{Team, User};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

/// Insert a new user and return it.
///
/// # Errors
///
/// Returns a storage error on failure (including a duplicate email).
pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    avatar: Option<&str>,
) -> WatchResult<User> {
    let user = User {
        user_id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        avatar: avatar.map(ToString::to_string),
        created_at_us: now_us(),
    };

    conn.execute(
        "INSERT INTO users (user_id, name, email, avatar, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.user_id,
            user.name,
            user.email,
            user.avatar,
            user.created_at_us
        ],
    )?;

    tracing::debug!(user_id = %user.user_id, "created user");
    Ok(user)
}

/// Fetch a user by id.
///
/// # Errors
///
/// Returns `UserNotFound` when no such user exists.
pub fn get_user(conn: &Connection, user_id: &str) -> WatchResult<User> {
    conn.query_row(
        "SELECT user_id, name, email, avatar, created_at_us
         FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(User {
                user_id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                avatar: row.get(3)?,
                created_at_us: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or(WatchError::UserNotFound)
}

/// Insert a new team and return it.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn create_team(conn: &Connection, name: &str, color: Option<&str>) -> WatchResult<Team> {
    let team = Team {
        team_id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        color: color.map(ToString::to_string),
        created_at_us: now_us(),
    };

    conn.execute(
        "INSERT INTO teams (team_id, name, color, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![team.team_id, team.name, team.color, team.created_at_us],
    )?;

    tracing::debug!(team_id = %team.team_id, "created team");
    Ok(team)
}

/// Add (or re-activate) a team membership.
///
/// # Errors
///
/// Returns a storage error on failure, `UserNotFound` when the user does
/// not exist.
pub fn add_member(conn: &Connection, team_id: &str, user_id: &str) -> WatchResult<()> {
    get_user(conn, user_id)?;

    conn.execute(
        "INSERT INTO team_members (team_id, user_id, is_active, joined_at_us)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT (team_id, user_id) DO UPDATE SET is_active = 1",
        params![team_id, user_id, now_us()],
    )?;
    Ok(())
}

/// Mark a membership inactive. Existing subscriptions are untouched;
/// membership is only checked at subscribe time.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn deactivate_member(conn: &Connection, team_id: &str, user_id: &str) -> WatchResult<()> {
    conn.execute(
        "UPDATE team_members SET is_active = 0 WHERE team_id = ?1 AND user_id = ?2",
        params![team_id, user_id],
    )?;
    Ok(())
}

/// Answer "is user X an active member of team Y" — the membership
/// authority the watch registry consults.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn is_active_member(conn: &Connection, team_id: &str, user_id: &str) -> WatchResult<bool> {
    let active: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM team_members
            WHERE team_id = ?1 AND user_id = ?2 AND is_active = 1
        )",
        params![team_id, user_id],
        |row| row.get(0),
    )?;
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::{add_member, create_team, create_user, deactivate_member, is_active_member};
    use crate::db::open_in_memory;
    use crate::error::WatchError;

    #[test]
    fn membership_lifecycle() {
        let conn = open_in_memory().expect("open store");
        let user = create_user(&conn, "Ana", "ana@example.com", None).expect("user");
        let team = create_team(&conn, "Platform", Some("#336699")).expect("team");

        assert!(!is_active_member(&conn, &team.team_id, &user.user_id).expect("query"));

        add_member(&conn, &team.team_id, &user.user_id).expect("add");
        assert!(is_active_member(&conn, &team.team_id, &user.user_id).expect("query"));

        deactivate_member(&conn, &team.team_id, &user.user_id).expect("deactivate");
        assert!(!is_active_member(&conn, &team.team_id, &user.user_id).expect("query"));

        // Re-adding flips the same row back to active.
        add_member(&conn, &team.team_id, &user.user_id).expect("re-add");
        assert!(is_active_member(&conn, &team.team_id, &user.user_id).expect("query"));
    }

    #[test]
    fn add_member_requires_existing_user() {
        let conn = open_in_memory().expect("open store");
        let team = create_team(&conn, "Platform", None).expect("team");

        let err = add_member(&conn, &team.team_id, "missing").expect_err("must fail");
        assert!(matches!(err, WatchError::UserNotFound));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let conn = open_in_memory().expect("open store");
        create_user(&conn, "Ana", "ana@example.com", None).expect("user");
        assert!(create_user(&conn, "Ana B", "ana@example.com", None).is_err());
    }
}
