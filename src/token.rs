use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a password reset token.
///
/// `reset_password` holds the user id the token was issued for, `exp` the
/// unix timestamp after which the token stops verifying.
#[derive(Serialize, Deserialize)]
struct ResetClaims {
    reset_password: String,
    exp: i64,
}

/// Issue a signed password reset token for a user, valid for `ttl_secs`.
pub fn issue(user_id: &str, secret: &str, ttl_secs: i64) -> anyhow::Result<String> {
    let claims = ResetClaims {
        reset_password: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify a reset token and return the user id it was issued for.
///
/// Any failure (bad signature, malformed token, expired) comes back as
/// `None`. Callers never learn why a token was rejected.
pub fn verify(token: &str, secret: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()?;
    Some(data.claims.reset_password)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn round_trip_returns_user_id() {
        let token = issue("user-42", SECRET, 600).unwrap();
        assert_eq!(verify(&token, SECRET), Some("user-42".to_string()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue("user-42", SECRET, -100).unwrap();
        assert_eq!(verify(&token, SECRET), None);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = issue("user-42", SECRET, 600).unwrap();
        token.push('x');
        assert_eq!(verify(&token, SECRET), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("user-42", SECRET, 600).unwrap();
        assert_eq!(verify(&token, "other-secret"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(verify("not-a-token", SECRET), None);
        assert_eq!(verify("", SECRET), None);
    }
}
