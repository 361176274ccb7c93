//! Limits, key-value layout, and environment-driven settings.

/// Posts per feed page.
pub const POSTS_PER_PAGE: usize = 25;

/// Maximum post body length, in characters, measured on the raw input.
pub const MAX_POST_LENGTH: usize = 140;

/// Maximum "about me" length, in characters.
pub const MAX_ABOUT_LENGTH: usize = 140;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_EMAIL_LENGTH: usize = 120;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Index of all user ids.
pub const USERS_KEY: &str = "users";

/// Index of all post ids, newest first.
pub const POSTS_KEY: &str = "posts";

/// Index of all live session tokens.
pub const SESSIONS_KEY: &str = "sessions";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn post_key(post_id: &str) -> String {
    format!("post:{}", post_id)
}

pub fn following_key(user_id: &str) -> String {
    format!("following:{}", user_id)
}

pub fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Hours a login session stays valid.
pub fn session_expiration_hours() -> i64 {
    std::env::var("CHIRP_SESSION_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

/// Seconds a password-reset token stays valid.
pub fn reset_token_ttl_secs() -> i64 {
    std::env::var("CHIRP_RESET_TOKEN_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(600)
}

/// Secret used to sign password-reset tokens.
pub fn secret_key() -> String {
    std::env::var("CHIRP_SECRET_KEY").unwrap_or_else(|_| "you-will-never-guess".to_string())
}

/// Public base URL used when composing links in outgoing email.
pub fn base_url() -> String {
    std::env::var("CHIRP_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}
