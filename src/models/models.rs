use serde::{Deserialize, Serialize};

/// Account record. `password` holds the argon2 PHC hash, never plaintext.
#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub about_me: Option<String>,
    /// RFC 3339, refreshed on every authenticated request.
    pub last_seen: Option<String>,
}

/// A published message. Immutable once stored; `language` is filled at
/// creation time when detection is reliable.
#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: String,
    pub language: Option<String>,
}

/// Login session stored under `session:{token}`.
#[derive(Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub created_at: String,
}
