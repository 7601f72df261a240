use serde::Serialize;

/// A registered user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at_us: i64,
}

impl User {
    /// Avatar URL if set, otherwise the uppercased first letter of the
    /// user's name (the display fallback the UI collaborator expects).
    #[must_use]
    pub fn avatar_or_initial(&self) -> String {
        avatar_or_initial(self.avatar.as_deref(), &self.name)
    }
}

/// Compact user fields embedded in watchlist rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// A team row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub team_id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at_us: i64,
}

/// Compact team fields embedded in watchlist rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub team_id: String,
    pub name: String,
    pub color: Option<String>,
}

pub(crate) fn avatar_or_initial(avatar: Option<&str>, name: &str) -> String {
    match avatar {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::avatar_or_initial;

    #[test]
    fn avatar_wins_over_initial() {
        assert_eq!(
            avatar_or_initial(Some("https://cdn/x.png"), "ana"),
            "https://cdn/x.png"
        );
    }

    #[test]
    fn missing_avatar_falls_back_to_uppercased_initial() {
        assert_eq!(avatar_or_initial(None, "ana"), "A");
        assert_eq!(avatar_or_initial(Some(""), "bob"), "B");
    }
}
