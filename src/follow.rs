use spin_sdk::http::Response;

use crate::config;
use crate::core::errors::ApiError;
use crate::core::store::{Datastore, DatastoreExt};
use crate::models::models::User;
use crate::users;

/// Add a follow edge. Returns `true` when the edge was created, `false`
/// when it already existed or the user tried to follow themselves.
pub fn follow_user(
    store: &dyn Datastore,
    follower_id: &str,
    target_id: &str,
) -> anyhow::Result<bool> {
    if follower_id == target_id {
        return Ok(false);
    }
    let key = config::following_key(follower_id);
    let mut following: Vec<String> = store.get_json(&key)?.unwrap_or_default();
    if following.iter().any(|id| id == target_id) {
        return Ok(false);
    }
    following.push(target_id.to_string());
    store.set_json(&key, &following)?;
    Ok(true)
}

/// Remove a follow edge. Returns `true` when an edge was actually removed.
pub fn unfollow_user(
    store: &dyn Datastore,
    follower_id: &str,
    target_id: &str,
) -> anyhow::Result<bool> {
    let key = config::following_key(follower_id);
    let mut following: Vec<String> = store.get_json(&key)?.unwrap_or_default();
    let before = following.len();
    following.retain(|id| id != target_id);
    if following.len() == before {
        return Ok(false);
    }
    store.set_json(&key, &following)?;
    Ok(true)
}

/// Ids of the users this user follows.
pub fn following_ids(store: &dyn Datastore, user_id: &str) -> anyhow::Result<Vec<String>> {
    let following: Vec<String> = store
        .get_json(&config::following_key(user_id))?
        .unwrap_or_default();
    Ok(following)
}

/// Ids of the users following this user, derived by scanning every
/// follow list. Follower sets are not stored separately.
pub fn follower_ids(store: &dyn Datastore, user_id: &str) -> anyhow::Result<Vec<String>> {
    let users: Vec<String> = store.get_json(config::USERS_KEY)?.unwrap_or_default();
    let mut followers = Vec::new();
    for id in users {
        let following: Vec<String> = store
            .get_json(&config::following_key(&id))?
            .unwrap_or_default();
        if following.iter().any(|f| f == user_id) {
            followers.push(id);
        }
    }
    Ok(followers)
}

// === HTTP Handlers ===

fn target_from_path(path: &str, prefix: &str) -> String {
    let raw = path.strip_prefix(prefix).unwrap_or_default();
    urlencoding::decode(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn handle_follow(
    store: &dyn Datastore,
    auth: Option<&User>,
    path: &str,
) -> anyhow::Result<Response> {
    let Some(user) = auth else {
        return Ok(ApiError::Unauthorized.into());
    };

    let target_name = target_from_path(path, "/follow/");
    if target_name.is_empty() {
        return Ok(ApiError::BadRequest("Username required".to_string()).into());
    }
    let Some(target) = users::find_by_username(store, &target_name)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", target_name)).into());
    };
    if target.id == user.id {
        return Ok(ApiError::BadRequest("You cannot follow yourself".to_string()).into());
    }

    let message = if follow_user(store, &user.id, &target.id)? {
        format!("You are now following {}", target.username)
    } else {
        format!("You are already following {}", target.username)
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "message": message }))?)
        .build())
}

pub fn handle_unfollow(
    store: &dyn Datastore,
    auth: Option<&User>,
    path: &str,
) -> anyhow::Result<Response> {
    let Some(user) = auth else {
        return Ok(ApiError::Unauthorized.into());
    };

    let target_name = target_from_path(path, "/unfollow/");
    if target_name.is_empty() {
        return Ok(ApiError::BadRequest("Username required".to_string()).into());
    }
    let Some(target) = users::find_by_username(store, &target_name)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", target_name)).into());
    };
    if target.id == user.id {
        return Ok(ApiError::BadRequest("You cannot unfollow yourself".to_string()).into());
    }

    let message = if unfollow_user(store, &user.id, &target.id)? {
        format!("You are no longer following {}", target.username)
    } else {
        format!("You are not following {}", target.username)
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "message": message }))?)
        .build())
}

fn usernames_for(store: &dyn Datastore, ids: &[String]) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for id in ids {
        if let Some(user) = users::find_by_id(store, id)? {
            names.push(user.username);
        }
    }
    Ok(names)
}

pub fn handle_followers(store: &dyn Datastore, path: &str) -> anyhow::Result<Response> {
    let username = target_from_path(path, "/followers/");
    let Some(user) = users::find_by_username(store, &username)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", username)).into());
    };
    let ids = follower_ids(store, &user.id)?;
    let names = usernames_for(store, &ids)?;
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&names)?)
        .build())
}

pub fn handle_following(store: &dyn Datastore, path: &str) -> anyhow::Result<Response> {
    let username = target_from_path(path, "/following/");
    let Some(user) = users::find_by_username(store, &username)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", username)).into());
    };
    let ids = following_ids(store, &user.id)?;
    let names = usernames_for(store, &ids)?;
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&names)?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[test]
    fn follow_is_idempotent() {
        let store = MemoryStore::new();
        assert!(follow_user(&store, "a", "b").unwrap());
        assert!(!follow_user(&store, "a", "b").unwrap());
        assert_eq!(following_ids(&store, "a").unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn self_follow_is_refused() {
        let store = MemoryStore::new();
        assert!(!follow_user(&store, "a", "a").unwrap());
        assert!(following_ids(&store, "a").unwrap().is_empty());
    }

    #[test]
    fn unfollow_reports_whether_edge_existed() {
        let store = MemoryStore::new();
        follow_user(&store, "a", "b").unwrap();
        assert!(unfollow_user(&store, "a", "b").unwrap());
        assert!(!unfollow_user(&store, "a", "b").unwrap());
        assert!(following_ids(&store, "a").unwrap().is_empty());
    }

    #[test]
    fn followers_are_derived_from_follow_lists() {
        let store = MemoryStore::new();
        store
            .set_json(config::USERS_KEY, &vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        follow_user(&store, "a", "c").unwrap();
        follow_user(&store, "b", "c").unwrap();
        let mut followers = follower_ids(&store, "c").unwrap();
        followers.sort();
        assert_eq!(followers, vec!["a".to_string(), "b".to_string()]);
        assert!(follower_ids(&store, "a").unwrap().is_empty());
    }
}
