use std::sync::Arc;

use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, redirect, verify_password};
use crate::core::store::{Datastore, DatastoreExt};
use crate::mail::{self, LogMailer};
use crate::models::models::{Session, User};
use crate::token;
use crate::users;
use crate::validation;

fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.header("Authorization")?.as_str()?;
    header.strip_prefix("Bearer ")
}

fn create_session(store: &dyn Datastore, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let session = Session {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&config::session_key(&token), &session)?;

    let mut sessions: Vec<String> = store.get_json(config::SESSIONS_KEY)?.unwrap_or_default();
    sessions.push(token.clone());
    store.set_json(config::SESSIONS_KEY, &sessions)?;

    Ok(token)
}

/// Resolve the caller from the Authorization header.
///
/// A valid session also touches the user's `last_seen` timestamp, so the
/// returned `User` is the freshly saved record. Missing, unknown or
/// expired sessions all come back as `None`.
pub fn authenticate(store: &dyn Datastore, req: &Request) -> anyhow::Result<Option<User>> {
    let Some(token) = bearer_token(req) else {
        return Ok(None);
    };
    let Some(session) = store.get_json::<Session>(&config::session_key(token))? else {
        return Ok(None);
    };

    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&session.created_at) {
        let now = chrono::Utc::now();
        let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > config::session_expiration_hours() {
            return Ok(None);
        }
    }

    let Some(mut user) = users::find_by_id(store, &session.user_id)? else {
        return Ok(None);
    };

    user.last_seen = Some(now_iso());
    users::save_user(store, &user)?;

    Ok(Some(user))
}

// === HTTP Handlers ===

pub fn login_user(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let Ok(creds) = serde_json::from_slice::<serde_json::Value>(req.body()) else {
        return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into());
    };
    let username = creds["username"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    let user = match users::find_by_username(store, username)? {
        Some(user) if verify_password(password, &user.password) => user,
        _ => {
            log::warn!("failed login attempt for {:?}", username);
            return Ok(ApiError::Unauthorized.into());
        }
    };

    let token = create_session(store, &user.id)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "token": token,
            "user_id": user.id,
        }))?)
        .build())
}

pub fn logout_user(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let Some(token) = bearer_token(req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    store.delete(&config::session_key(token))?;
    let mut sessions: Vec<String> = store.get_json(config::SESSIONS_KEY)?.unwrap_or_default();
    sessions.retain(|t| t != token);
    store.set_json(config::SESSIONS_KEY, &sessions)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "message": "Logged out successfully"
        }))?)
        .build())
}

/// Delete every session belonging to a user. Runs after a password reset.
fn revoke_sessions(store: &dyn Datastore, user_id: &str) -> anyhow::Result<()> {
    let sessions: Vec<String> = store.get_json(config::SESSIONS_KEY)?.unwrap_or_default();
    let mut kept = Vec::new();
    for token in sessions {
        let key = config::session_key(&token);
        match store.get_json::<Session>(&key)? {
            Some(session) if session.user_id == user_id => store.delete(&key)?,
            _ => kept.push(token),
        }
    }
    store.set_json(config::SESSIONS_KEY, &kept)?;
    Ok(())
}

/// POST /reset_password_request. Replies the same way whether or not the
/// address belongs to an account.
pub fn reset_password_request(
    store: &dyn Datastore,
    auth: Option<&User>,
    req: &Request,
) -> anyhow::Result<Response> {
    if auth.is_some() {
        return Ok(redirect("/"));
    }

    let Ok(value) = serde_json::from_slice::<serde_json::Value>(req.body()) else {
        return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into());
    };
    let email = value["email"].as_str().unwrap_or_default().trim().to_lowercase();

    if let Some(user) = users::find_by_email(store, &email)? {
        let reset_token =
            token::issue(&user.id, &config::secret_key(), config::reset_token_ttl_secs())?;
        let email = mail::password_reset_email(&user, &reset_token, &config::base_url());
        mail::deliver(Arc::new(LogMailer), email);
        log::info!("password reset requested for {}", user.username);
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "message": "Check your email for the instructions to reset your password"
        }))?)
        .build())
}

/// POST /reset_password/{token}. A bad or expired token silently bounces
/// back to the index page.
pub fn reset_password(
    store: &dyn Datastore,
    auth: Option<&User>,
    req: &Request,
) -> anyhow::Result<Response> {
    if auth.is_some() {
        return Ok(redirect("/"));
    }

    let raw = req
        .path()
        .strip_prefix("/reset_password/")
        .unwrap_or_default();
    let reset_token = urlencoding::decode(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string());

    let Some(user_id) = token::verify(&reset_token, &config::secret_key()) else {
        return Ok(redirect("/"));
    };
    let Some(mut user) = users::find_by_id(store, &user_id)? else {
        return Ok(redirect("/"));
    };

    let Ok(value) = serde_json::from_slice::<serde_json::Value>(req.body()) else {
        return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into());
    };
    let password = value["password"].as_str().unwrap_or_default();

    if let Err(errors) = validation::validate_reset_password(password) {
        return Ok(ApiError::Validation(errors).into());
    }

    user.password = hash_password(password)?;
    users::save_user(store, &user)?;
    revoke_sessions(store, &user.id)?;
    log::info!("password reset completed for {}", user.username);

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "message": "Your password has been reset."
        }))?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use spin_sdk::http::Method;

    fn seed_user(store: &MemoryStore, username: &str) -> User {
        let user = User {
            id: format!("id-{}", username),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: hash_password("password123").unwrap(),
            about_me: None,
            last_seen: None,
        };
        users::save_user(store, &user).unwrap();
        let mut ids: Vec<String> = store.get_json(config::USERS_KEY).unwrap().unwrap_or_default();
        ids.push(user.id.clone());
        store.set_json(config::USERS_KEY, &ids).unwrap();
        user
    }

    fn request_with_token(token: &str) -> Request {
        let bearer = format!("Bearer {}", token);
        let mut builder = Request::builder();
        builder
            .method(Method::Get)
            .uri("/profile")
            .header("Authorization", bearer.as_str());
        builder.build()
    }

    #[test]
    fn valid_session_resolves_and_touches_last_seen() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "susan");
        let token = create_session(&store, &user.id).unwrap();

        let resolved = authenticate(&store, &request_with_token(&token))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(resolved.last_seen.is_some());

        let stored = users::find_by_id(&store, &user.id).unwrap().unwrap();
        assert_eq!(stored.last_seen, resolved.last_seen);
    }

    #[test]
    fn expired_session_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "susan");

        let stale = (chrono::Utc::now() - chrono::Duration::hours(25)).to_rfc3339();
        let session = Session {
            user_id: user.id.clone(),
            created_at: stale,
        };
        store.set_json(&config::session_key("old-token"), &session).unwrap();

        let resolved = authenticate(&store, &request_with_token("old-token")).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "susan");
        let resolved = authenticate(&store, &request_with_token("no-such-token")).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn revoking_sessions_only_hits_one_user() {
        let store = MemoryStore::new();
        let susan = seed_user(&store, "susan");
        let david = seed_user(&store, "david");
        let susan_token = create_session(&store, &susan.id).unwrap();
        let david_token = create_session(&store, &david.id).unwrap();

        revoke_sessions(&store, &susan.id).unwrap();

        assert!(authenticate(&store, &request_with_token(&susan_token))
            .unwrap()
            .is_none());
        assert!(authenticate(&store, &request_with_token(&david_token))
            .unwrap()
            .is_some());
    }
}
