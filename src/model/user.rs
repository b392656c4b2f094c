use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full `users` row. Hashes and the facial descriptor never leave the server.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub pin_hash: Option<String>,
    pub role_id: u8,
    #[serde(skip)]
    pub facial_profile: Option<Vec<u8>>,
    pub vacation_days_available: i32,
    pub last_vacation_credit_year: i32,
    pub is_active_employee: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Name shown in lists: full name when present, username otherwise.
pub fn display_name<'a>(full_name: Option<&'a str>, username: &'a str) -> &'a str {
    match full_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(display_name(Some("Ana Silva"), "ana"), "Ana Silva");
        assert_eq!(display_name(Some("  "), "ana"), "ana");
        assert_eq!(display_name(None, "ana"), "ana");
    }
}
