use std::collections::HashSet;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use spin_sdk::http::Response;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Strip all HTML, leaving plain text. Applied to usernames and profile
/// text at input time.
pub fn sanitize_text(text: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(text)
        .to_string()
        .trim()
        .to_string()
}

pub fn redirect(location: &str) -> Response {
    Response::builder()
        .status(302)
        .header("Location", location)
        .build()
}
