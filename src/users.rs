use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, sanitize_text};
use crate::core::store::{Datastore, DatastoreExt};
use crate::follow;
use crate::models::models::{Post, User};
use crate::validation;

pub fn find_by_id(store: &dyn Datastore, id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&config::user_key(id))
}

pub fn find_by_username(store: &dyn Datastore, username: &str) -> anyhow::Result<Option<User>> {
    let ids: Vec<String> = store.get_json(config::USERS_KEY)?.unwrap_or_default();
    for id in &ids {
        if let Some(user) = find_by_id(store, id)? {
            if user.username == username {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

/// Email lookup, case-insensitive. Addresses are stored lowercased but old
/// records are still matched leniently.
pub fn find_by_email(store: &dyn Datastore, email: &str) -> anyhow::Result<Option<User>> {
    let wanted = email.to_lowercase();
    let ids: Vec<String> = store.get_json(config::USERS_KEY)?.unwrap_or_default();
    for id in &ids {
        if let Some(user) = find_by_id(store, id)? {
            if user.email.to_lowercase() == wanted {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

pub fn save_user(store: &dyn Datastore, user: &User) -> anyhow::Result<()> {
    store.set_json(&config::user_key(&user.id), user)
}

fn count_posts(store: &dyn Datastore, user_id: &str) -> anyhow::Result<usize> {
    let index: Vec<String> = store.get_json(config::POSTS_KEY)?.unwrap_or_default();
    let mut count = 0;
    for id in &index {
        if let Some(post) = store.get_json::<Post>(&config::post_key(id))? {
            if post.user_id == user_id {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// The view a user gets of their own account.
fn own_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "about_me": user.about_me.as_deref().unwrap_or(""),
        "last_seen": user.last_seen,
    })
}

/// The view everyone else gets. No email, but follower and post counts.
pub fn public_user_json(store: &dyn Datastore, user: &User) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "about_me": user.about_me.as_deref().unwrap_or(""),
        "last_seen": user.last_seen,
        "follower_count": follow::follower_ids(store, &user.id)?.len(),
        "following_count": follow::following_ids(store, &user.id)?.len(),
        "post_count": count_posts(store, &user.id)?,
    }))
}

// === HTTP Handlers ===

pub fn create_user(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(req.body()) else {
        return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into());
    };
    let username = sanitize_text(value["username"].as_str().unwrap_or_default());
    let email = value["email"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let password = value["password"].as_str().unwrap_or_default();

    if let Err(errors) = validation::validate_registration(store, &username, &email, password)? {
        return Ok(ApiError::Validation(errors).into());
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username,
        email,
        password: hash_password(password)?,
        about_me: None,
        last_seen: None,
    };

    save_user(store, &user)?;

    let mut ids: Vec<String> = store.get_json(config::USERS_KEY)?.unwrap_or_default();
    ids.push(id);
    store.set_json(config::USERS_KEY, &ids)?;

    log::info!("registered user {}", user.username);

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&own_user_json(&user))?)
        .build())
}

pub fn get_profile(auth: Option<&User>) -> anyhow::Result<Response> {
    let Some(user) = auth else {
        return Ok(ApiError::Unauthorized.into());
    };
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&own_user_json(user))?)
        .build())
}

/// GET /users/{username}, the public account card.
pub fn get_user_details(store: &dyn Datastore, path: &str) -> anyhow::Result<Response> {
    let raw = path.strip_prefix("/users/").unwrap_or_default();
    let username = urlencoding::decode(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string());

    let Some(user) = find_by_username(store, &username)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", username)).into());
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&public_user_json(store, &user)?)?)
        .build())
}

pub fn update_profile(
    store: &dyn Datastore,
    auth: Option<&User>,
    req: &Request,
) -> anyhow::Result<Response> {
    let Some(user) = auth else {
        return Ok(ApiError::Unauthorized.into());
    };

    let Ok(value) = serde_json::from_slice::<serde_json::Value>(req.body()) else {
        return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into());
    };

    let new_username = match value.get("username").and_then(|v| v.as_str()) {
        Some(name) => sanitize_text(name),
        None => user.username.clone(),
    };
    // An absent key keeps the current text, an empty string clears it.
    let new_about = match value.get("about_me") {
        Some(v) => sanitize_text(v.as_str().unwrap_or_default()),
        None => user.about_me.clone().unwrap_or_default(),
    };

    if let Err(errors) = validation::validate_profile_edit(store, user, &new_username, &new_about)? {
        return Ok(ApiError::Validation(errors).into());
    }

    let mut updated = user.clone();
    updated.username = new_username;
    updated.about_me = if new_about.is_empty() {
        None
    } else {
        Some(new_about)
    };
    save_user(store, &updated)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "message": "Your changes have been saved",
            "user": own_user_json(&updated),
        }))?)
        .build())
}
