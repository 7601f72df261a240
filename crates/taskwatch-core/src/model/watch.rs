use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A user's registration of interest in a specific item.
///
/// Unique per `(item_id, user_id)`; deleting the item (or the user)
/// cascades the subscription away together with its notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub item_id: String,
    pub user_id: String,
    pub created_at_us: i64,
}

/// A subscription joined with the subscriber's display fields, as
/// returned by the watcher listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Watcher {
    pub subscription_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub subscribed_at_us: i64,
}

/// The fixed categories of change that trigger notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StatusChange,
    PriorityChange,
    Comment,
    Assignment,
    DueDateChange,
    TitleChange,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::PriorityChange => "priority_change",
            Self::Comment => "comment",
            Self::Assignment => "assignment",
            Self::DueDateChange => "due_date_change",
            Self::TitleChange => "title_change",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status_change" => Ok(Self::StatusChange),
            "priority_change" => Ok(Self::PriorityChange),
            "comment" => Ok(Self::Comment),
            "assignment" => Ok(Self::Assignment),
            "due_date_change" => Ok(Self::DueDateChange),
            "title_change" => Ok(Self::TitleChange),
            other => bail!(
                "unknown event type '{other}': expected one of status_change, \
                 priority_change, comment, assignment, due_date_change, title_change"
            ),
        }
    }
}

/// A stored notification row.
///
/// `payload` is opaque to the subsystem beyond storage and retrieval;
/// `read_at_us` transitions once from `None` to `Some` and is never
/// reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub notification_id: String,
    pub subscription_id: String,
    pub user_id: String,
    pub item_id: String,
    pub event_type: EventType,
    pub payload: Option<serde_json::Value>,
    pub read_at_us: Option<i64>,
    pub created_at_us: i64,
}

/// The display fields of one unread notification, as embedded in
/// watchlist rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationDetail {
    pub event_type: EventType,
    pub payload: Option<serde_json::Value>,
    pub created_at_us: i64,
}

#[cfg(test)]
mod tests {
    use super::EventType;
    use std::str::FromStr;

    #[test]
    fn event_type_round_trips_through_strings() {
        for event_type in [
            EventType::StatusChange,
            EventType::PriorityChange,
            EventType::Comment,
            EventType::Assignment,
            EventType::DueDateChange,
            EventType::TitleChange,
        ] {
            assert_eq!(
                EventType::from_str(event_type.as_str()).expect("parse"),
                event_type
            );
        }
    }

    #[test]
    fn event_type_rejects_unknown_values() {
        assert!(EventType::from_str("mention").is_err());
    }
}
