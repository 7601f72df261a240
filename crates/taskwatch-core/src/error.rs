//! Domain error taxonomy for the watch/notify subsystem.
//!
//! Expected outcomes (not-found, conflicts, validation) carry a specific
//! reason the boundary can surface verbatim; storage failures are logged
//! and surfaced generically. Every variant maps to a stable `E####` code
//! for machine parsing.

use thiserror::Error;

/// All failure modes of the core operations.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("item not found")]
    ItemNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("user is not watching this item")]
    NotSubscribed,

    #[error("user is not an active member of the item's team")]
    NotMember,

    #[error("user is already watching this item")]
    AlreadySubscribed,

    #[error("watcher limit of {limit} reached for this item")]
    CapacityExceeded { limit: u32 },

    #[error("invalid parameter: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("payload serialization error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result alias used throughout the core components.
pub type WatchResult<T> = Result<T, WatchError>;

impl WatchError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ItemNotFound => ErrorCode::ItemNotFound,
            Self::UserNotFound => ErrorCode::UserNotFound,
            Self::NotSubscribed => ErrorCode::NotSubscribed,
            Self::NotMember => ErrorCode::NotMember,
            Self::AlreadySubscribed => ErrorCode::AlreadySubscribed,
            Self::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Self::Validation(_) => ErrorCode::InvalidParameter,
            Self::Storage(_) | Self::Payload(_) => ErrorCode::StorageFailure,
        }
    }

    /// True for expected, recoverable-by-caller outcomes. Storage and
    /// serialization failures are internal and surfaced generically.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Payload(_))
    }
}

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ItemNotFound,
    UserNotFound,
    NotSubscribed,
    NotMember,
    AlreadySubscribed,
    CapacityExceeded,
    InvalidParameter,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ItemNotFound => "E2001",
            Self::UserNotFound => "E2002",
            Self::NotSubscribed => "E2003",
            Self::NotMember => "E3001",
            Self::AlreadySubscribed => "E3002",
            Self::CapacityExceeded => "E3003",
            Self::InvalidParameter => "E4001",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ItemNotFound => "Item not found",
            Self::UserNotFound => "User not found",
            Self::NotSubscribed => "Not watching this item",
            Self::NotMember => "Not an active member of the item's team",
            Self::AlreadySubscribed => "Already watching this item",
            Self::CapacityExceeded => "Watcher limit reached for this item",
            Self::InvalidParameter => "Invalid parameter",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ItemNotFound | Self::UserNotFound => None,
            Self::NotSubscribed => Some("Run `tw watch <item>` to start watching it."),
            Self::NotMember => Some("Ask a team admin to add you to the item's team."),
            Self::AlreadySubscribed => None,
            Self::CapacityExceeded => {
                Some("Raise max_watchers_per_item in taskwatch.toml if this is intended.")
            }
            Self::InvalidParameter => Some("Check the command arguments and retry."),
            Self::StorageFailure => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
