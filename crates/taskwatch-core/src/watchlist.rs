//! Watchlist query engine.
//!
//! Composes the watch registry (which items does the user watch), the
//! item store (filter/sort/paginate those items), and the notification
//! store (unread summaries for the returned page only) into a single
//! read-optimized result.

use crate::db::now_us;
use crate::error::WatchResult;
use crate::model::{NotificationDetail, Priority, Status, TeamSummary, UserSummary};
use crate::notify_store::NotificationStore;
use crate::registry::WatchRegistry;
use rusqlite::{Connection, Row, params_from_iter};
use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;

/// Default page size when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u64 = 25;
/// Upper bound on page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Sort direction over the one sortable field (last-updated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Resolve a requested direction token. Only `asc`/`desc`
    /// (case-insensitive) are recognized; anything else silently falls
    /// back to descending.
    #[must_use]
    pub fn resolve(token: Option<&str>) -> Self {
        match token.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Self::Asc,
            Some("desc") => Self::Desc,
            _ => Self::Desc,
        }
    }

    const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort specification. Only the last-updated timestamp is sortable; any
/// other requested field name is silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchlistSort {
    pub direction: SortDirection,
}

impl WatchlistSort {
    /// Resolve requested field/direction tokens with silent fallback.
    #[must_use]
    pub fn resolve(field: Option<&str>, direction: Option<&str>) -> Self {
        // `updated_at` is the only allowed field; requests for anything
        // else get the default rather than an error.
        let _ = field;
        Self {
            direction: SortDirection::resolve(direction),
        }
    }

    fn sql_clause(self) -> String {
        format!(
            "ORDER BY i.updated_at_us {}, i.item_id ASC",
            self.direction.sql()
        )
    }
}

/// 1-based page selection with bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: u64,
    page_size: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl PageParams {
    /// Build page parameters, defaulting and clamping out-of-range
    /// values: page is at least 1, page size is clamped to
    /// `1..=MAX_PAGE_SIZE` and defaults to [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub const fn page(self) -> u64 {
        self.page
    }

    #[must_use]
    pub const fn page_size(self) -> u64 {
        self.page_size
    }

    /// Row offset for the selected page. Saturates at SQLite's integer
    /// ceiling, so an absurd page number reads as an empty page.
    fn offset(self) -> i64 {
        i64::try_from((self.page - 1).saturating_mul(self.page_size)).unwrap_or(i64::MAX)
    }
}

/// Optional filters, combined with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct WatchlistFilter {
    /// Exact match on item status.
    pub status: Option<Status>,
    /// Exact match on the owning team.
    pub team_id: Option<String>,
    /// Inclusive lower bound on the item's last-updated timestamp.
    pub updated_since_us: Option<i64>,
    pub sort: WatchlistSort,
}

/// Pagination metadata reported with every watchlist page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// One watched item, annotated with unread notification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistRow {
    pub item_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_at_us: Option<i64>,
    pub team: TeamSummary,
    pub creator: UserSummary,
    pub assignee: Option<UserSummary>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
    pub is_overdue: bool,
    pub unread_notifications: u64,
    pub notifications: Vec<NotificationDetail>,
    /// Unread notifications beyond the configured detail cap.
    pub notifications_overflow: u64,
}

/// A page of watchlist rows plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistPage {
    pub rows: Vec<WatchlistRow>,
    pub pagination: Pagination,
}

/// An item is overdue when its due date is set, strictly in the past,
/// and its status is not terminal.
#[must_use]
pub fn is_overdue(due_at_us: Option<i64>, status: Status, now_us: i64) -> bool {
    due_at_us.is_some_and(|due| due < now_us) && !status.is_terminal()
}

/// Answer "what does this user watch, and what's unread" as one
/// filtered, sorted, paginated result.
///
/// A user with zero subscriptions gets an empty zero-page result
/// immediately, without touching the item store. Unread summaries are
/// fetched for the returned page only.
///
/// # Errors
///
/// Returns a storage error on failure.
pub fn watchlist(
    conn: &Connection,
    registry: &WatchRegistry<'_>,
    store: &NotificationStore<'_>,
    user_id: &str,
    filter: &WatchlistFilter,
    page: PageParams,
) -> WatchResult<WatchlistPage> {
    let watched_ids = registry.watched_item_ids(user_id)?;
    if watched_ids.is_empty() {
        return Ok(WatchlistPage {
            rows: Vec::new(),
            pagination: Pagination {
                page: page.page(),
                page_size: page.page_size(),
                total: 0,
                total_pages: 0,
            },
        });
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    let mut in_clause = String::from("i.item_id IN (");
    for (index, item_id) in watched_ids.iter().enumerate() {
        param_values.push(Box::new(item_id.clone()));
        if index > 0 {
            in_clause.push_str(", ");
        }
        let _ = write!(in_clause, "?{}", param_values.len());
    }
    in_clause.push(')');
    conditions.push(in_clause);

    if let Some(status) = filter.status {
        param_values.push(Box::new(status.as_str().to_string()));
        conditions.push(format!("i.status = ?{}", param_values.len()));
    }

    if let Some(ref team_id) = filter.team_id {
        param_values.push(Box::new(team_id.clone()));
        conditions.push(format!("i.team_id = ?{}", param_values.len()));
    }

    if let Some(updated_since_us) = filter.updated_since_us {
        param_values.push(Box::new(updated_since_us));
        conditions.push(format!("i.updated_at_us >= ?{}", param_values.len()));
    }

    let where_clause = conditions.join(" AND ");
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let count_sql = format!("SELECT COUNT(*) FROM items i WHERE {where_clause}");
    let total: i64 = conn.query_row(&count_sql, params_from_iter(params_ref.clone()), |row| {
        row.get(0)
    })?;
    let total = u64::try_from(total).unwrap_or(0);
    let total_pages = total.div_ceil(page.page_size());

    let sort_clause = filter.sort.sql_clause();
    let data_sql = format!(
        "SELECT i.item_id, i.title, i.description, i.status, i.priority, i.due_at_us, \
                i.created_at_us, i.updated_at_us, \
                t.team_id, t.name, t.color, \
                c.user_id, c.name, c.avatar, \
                a.user_id, a.name, a.avatar \
         FROM items i \
         INNER JOIN teams t ON t.team_id = i.team_id \
         INNER JOIN users c ON c.user_id = i.created_by \
         LEFT JOIN users a ON a.user_id = i.assignee_id \
         WHERE {where_clause} {sort_clause} LIMIT {} OFFSET {}",
        page.page_size(),
        page.offset()
    );

    let mut stmt = conn.prepare(&data_sql)?;
    let now = now_us();
    let rows = stmt.query_map(params_from_iter(params_ref), |row| row_to_entry(row, now))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }

    // Unread summaries for the page only, never the whole watched set.
    let page_ids: Vec<String> = entries.iter().map(|e| e.item_id.clone()).collect();
    let mut unread = store.unread_detail_for_items(&page_ids, user_id)?;

    let rows = entries
        .into_iter()
        .map(|mut entry| {
            if let Some(summary) = unread.remove(&entry.item_id) {
                entry.unread_notifications = summary.unread;
                entry.notifications = summary.details;
                entry.notifications_overflow = summary.overflow;
            }
            entry
        })
        .collect();

    Ok(WatchlistPage {
        rows,
        pagination: Pagination {
            page: page.page(),
            page_size: page.page_size(),
            total,
            total_pages,
        },
    })
}

fn row_to_entry(row: &Row<'_>, now_us: i64) -> rusqlite::Result<WatchlistRow> {
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let status = Status::from_str(&status).map_err(|_| rusqlite::Error::InvalidQuery)?;
    let priority = Priority::from_str(&priority).map_err(|_| rusqlite::Error::InvalidQuery)?;
    let due_at_us: Option<i64> = row.get(5)?;

    let assignee_id: Option<String> = row.get(14)?;
    let assignee = match assignee_id {
        Some(user_id) => Some(UserSummary {
            user_id,
            name: row.get(15)?,
            avatar: row.get(16)?,
        }),
        None => None,
    };

    Ok(WatchlistRow {
        item_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status,
        priority,
        due_at_us,
        team: TeamSummary {
            team_id: row.get(8)?,
            name: row.get(9)?,
            color: row.get(10)?,
        },
        creator: UserSummary {
            user_id: row.get(11)?,
            name: row.get(12)?,
            avatar: row.get(13)?,
        },
        assignee,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
        is_overdue: is_overdue(due_at_us, status, now_us),
        unread_notifications: 0,
        notifications: Vec::new(),
        notifications_overflow: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageParams, SortDirection, WatchlistSort, is_overdue,
    };
    use crate::model::Status;

    #[test]
    fn sort_direction_falls_back_to_desc() {
        assert_eq!(SortDirection::resolve(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::resolve(Some("ASC")), SortDirection::Asc);
        assert_eq!(SortDirection::resolve(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::resolve(Some("sideways")), SortDirection::Desc);
        assert_eq!(SortDirection::resolve(None), SortDirection::Desc);
    }

    #[test]
    fn sort_field_requests_are_silently_ignored() {
        let sort = WatchlistSort::resolve(Some("title"), Some("asc"));
        assert_eq!(sort.direction, SortDirection::Asc);
        assert!(sort.sql_clause().contains("i.updated_at_us ASC"));
    }

    #[test]
    fn page_params_default_and_clamp() {
        let page = PageParams::default();
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), DEFAULT_PAGE_SIZE);

        let page = PageParams::new(Some(0), Some(0));
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), 1);

        let page = PageParams::new(Some(3), Some(10_000));
        assert_eq!(page.page(), 3);
        assert_eq!(page.page_size(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn page_params_offset_saturates_for_huge_pages() {
        let page = PageParams::new(Some(u64::MAX), Some(MAX_PAGE_SIZE));
        assert_eq!(page.page(), u64::MAX);
        assert_eq!(page.offset(), i64::MAX);

        // Largest page that still multiplies cleanly stays exact.
        let page = PageParams::new(Some(2), Some(MAX_PAGE_SIZE));
        assert_eq!(page.offset(), 100);
    }

    #[test]
    fn overdue_requires_past_due_and_non_terminal_status() {
        let now = 1_000;
        assert!(is_overdue(Some(999), Status::Pending, now));
        assert!(is_overdue(Some(999), Status::InProgress, now));
        // Finished items are never overdue, even with a past due date.
        assert!(!is_overdue(Some(999), Status::Finished, now));
        // Due exactly now is not strictly past.
        assert!(!is_overdue(Some(1_000), Status::Pending, now));
        assert!(!is_overdue(None, Status::Pending, now));
    }
}
