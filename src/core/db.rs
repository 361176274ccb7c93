use uuid::Uuid;

use crate::config;
use crate::core::helpers::{hash_password, now_iso};
use crate::core::store::{Datastore, DatastoreExt};
use crate::lang::detect_language;
use crate::models::models::{Post, User};

/// Seed a couple of demo accounts so a fresh install has something to show.
///
/// Runs at most once per store: if the user index already exists the data is
/// left untouched.
pub fn init_demo_data(store: &dyn Datastore) -> anyhow::Result<()> {
    if store.get(config::USERS_KEY)?.is_some() {
        return Ok(());
    }

    let mut users: Vec<String> = Vec::new();
    let mut posts: Vec<String> = Vec::new();

    let alice_id = seed_user(
        store,
        &mut users,
        "alice",
        "alice@example.com",
        "Remember, always look on the bright side of life!",
    )?;
    let bob_id = seed_user(
        store,
        &mut users,
        "bob",
        "bob@example.com",
        "Just joined, looking forward to meeting everyone here.",
    )?;

    seed_post(store, &mut posts, &alice_id, "The first rule of chirp is: you talk about chirp.")?;
    seed_post(store, &mut posts, &bob_id, "Hello everyone, happy to be here!")?;
    seed_post(store, &mut posts, &alice_id, "Beautiful day over here today.")?;

    // alice follows bob
    store.set_json(&config::following_key(&alice_id), &vec![bob_id])?;

    store.set_json(config::USERS_KEY, &users)?;
    store.set_json(config::POSTS_KEY, &posts)?;

    Ok(())
}

fn seed_user(
    store: &dyn Datastore,
    users: &mut Vec<String>,
    username: &str,
    email: &str,
    about_me: &str,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(&format!("{}-demo-pass", username))?,
        about_me: Some(about_me.to_string()),
        last_seen: Some(now_iso()),
    };
    store.set_json(&config::user_key(&id), &user)?;
    users.push(id.clone());
    Ok(id)
}

fn seed_post(
    store: &dyn Datastore,
    posts: &mut Vec<String>,
    user_id: &str,
    body: &str,
) -> anyhow::Result<()> {
    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        user_id: user_id.to_string(),
        body: body.to_string(),
        created_at: now_iso(),
        language: detect_language(body),
    };
    store.set_json(&config::post_key(&id), &post)?;
    posts.insert(0, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[test]
    fn seeds_once_and_only_once() {
        let store = MemoryStore::new();
        init_demo_data(&store).unwrap();

        let users: Vec<String> = store.get_json(config::USERS_KEY).unwrap().unwrap();
        assert_eq!(users.len(), 2);
        let posts: Vec<String> = store.get_json(config::POSTS_KEY).unwrap().unwrap();
        assert_eq!(posts.len(), 3);

        // A second call must not duplicate anything.
        init_demo_data(&store).unwrap();
        let users_again: Vec<String> = store.get_json(config::USERS_KEY).unwrap().unwrap();
        assert_eq!(users_again, users);
    }
}
