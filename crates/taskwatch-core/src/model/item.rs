use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three lifecycle states of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Finished,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
        }
    }

    /// `finished` is the terminal state; a finished item is never overdue.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "finished" => Ok(Self::Finished),
            other => bail!(
                "unknown status '{other}': expected one of pending, in_progress, finished"
            ),
        }
    }
}

/// Item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => bail!("unknown priority '{other}': expected one of low, medium, high"),
        }
    }
}

/// A work item row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub item_id: String,
    pub team_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_at_us: Option<i64>,
    pub created_by: String,
    pub assignee_id: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// A comment attached to a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub comment_id: String,
    pub item_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at_us: i64,
}

#[cfg(test)]
mod tests {
    use super::{Priority, Status};
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [Status::Pending, Status::InProgress, Status::Finished] {
            assert_eq!(Status::from_str(status.as_str()).expect("parse"), status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!(Status::from_str("archived").is_err());
    }

    #[test]
    fn only_finished_is_terminal() {
        assert!(Status::Finished.is_terminal());
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::InProgress.is_terminal());
    }

    #[test]
    fn priority_round_trips_through_strings() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(
                Priority::from_str(priority.as_str()).expect("parse"),
                priority
            );
        }
    }
}
