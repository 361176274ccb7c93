use std::collections::BTreeMap;

use serde::Serialize;
use spin_sdk::http::{Request, Response};

use crate::config;
use crate::core::errors::ApiError;
use crate::core::query_params::page_param;
use crate::core::store::{Datastore, DatastoreExt};
use crate::follow;
use crate::models::models::{Post, User};
use crate::users;

/// One page of a timeline, newest posts first.
///
/// `authors` maps the user ids appearing in `items` to usernames so
/// clients can label posts without extra requests.
#[derive(Serialize)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub authors: BTreeMap<String, String>,
    pub page: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

fn collect_posts(
    store: &dyn Datastore,
    mut keep: impl FnMut(&Post) -> bool,
) -> anyhow::Result<Vec<Post>> {
    let index: Vec<String> = store.get_json(config::POSTS_KEY)?.unwrap_or_default();
    let mut posts = Vec::new();
    for id in &index {
        if let Some(post) = store.get_json::<Post>(&config::post_key(id))? {
            if keep(&post) {
                posts.push(post);
            }
        }
    }
    Ok(posts)
}

/// Order newest first and cut out the requested page.
///
/// Timestamps are RFC 3339 strings with a fixed UTC offset, so the string
/// ordering matches the chronological one. Ids break ties to keep the
/// order total.
fn paginate(mut posts: Vec<Post>, page: usize) -> PostPage {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = posts.len();
    let per_page = config::POSTS_PER_PAGE;
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let items: Vec<Post> = posts.into_iter().skip(start).take(per_page).collect();

    PostPage {
        items,
        authors: BTreeMap::new(),
        page,
        per_page,
        has_next: total > start.saturating_add(per_page),
        has_prev: page > 1,
    }
}

fn fill_authors(store: &dyn Datastore, page: &mut PostPage) -> anyhow::Result<()> {
    for post in &page.items {
        if page.authors.contains_key(&post.user_id) {
            continue;
        }
        if let Some(author) = users::find_by_id(store, &post.user_id)? {
            page.authors.insert(post.user_id.clone(), author.username);
        }
    }
    Ok(())
}

/// The home timeline: the user's own posts plus posts of everyone they follow.
pub fn followed_posts(
    store: &dyn Datastore,
    user_id: &str,
    page: usize,
) -> anyhow::Result<PostPage> {
    let mut author_ids = follow::following_ids(store, user_id)?;
    author_ids.push(user_id.to_string());
    let posts = collect_posts(store, |p| author_ids.iter().any(|id| *id == p.user_id))?;
    let mut result = paginate(posts, page);
    fill_authors(store, &mut result)?;
    Ok(result)
}

/// Everything anyone has posted, for the explore view.
pub fn explore_posts(store: &dyn Datastore, page: usize) -> anyhow::Result<PostPage> {
    let posts = collect_posts(store, |_| true)?;
    let mut result = paginate(posts, page);
    fill_authors(store, &mut result)?;
    Ok(result)
}

/// Posts authored by a single user, for profile pages.
pub fn user_posts(store: &dyn Datastore, user_id: &str, page: usize) -> anyhow::Result<PostPage> {
    let posts = collect_posts(store, |p| p.user_id == user_id)?;
    let mut result = paginate(posts, page);
    fill_authors(store, &mut result)?;
    Ok(result)
}

// === HTTP Handlers ===

fn page_response(page: PostPage) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&page)?)
        .build())
}

pub fn handle_home(
    store: &dyn Datastore,
    auth: Option<&User>,
    req: &Request,
) -> anyhow::Result<Response> {
    let Some(user) = auth else {
        return Ok(ApiError::Unauthorized.into());
    };
    let page = page_param(req.uri());
    page_response(followed_posts(store, &user.id, page)?)
}

pub fn handle_explore(
    store: &dyn Datastore,
    auth: Option<&User>,
    req: &Request,
) -> anyhow::Result<Response> {
    if auth.is_none() {
        return Ok(ApiError::Unauthorized.into());
    }
    let page = page_param(req.uri());
    page_response(explore_posts(store, page)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn seed_post(store: &MemoryStore, id: &str, user_id: &str, created_at: &str) {
        let post = Post {
            id: id.to_string(),
            user_id: user_id.to_string(),
            body: format!("post {}", id),
            created_at: created_at.to_string(),
            language: None,
        };
        store.set_json(&config::post_key(id), &post).unwrap();
        let mut index: Vec<String> = store.get_json(config::POSTS_KEY).unwrap().unwrap_or_default();
        index.insert(0, id.to_string());
        store.set_json(config::POSTS_KEY, &index).unwrap();
    }

    #[test]
    fn home_feed_keeps_own_and_followed_posts_only() {
        let store = MemoryStore::new();
        seed_post(&store, "p1", "me", "2026-01-01T10:00:00+00:00");
        seed_post(&store, "p2", "friend", "2026-01-01T11:00:00+00:00");
        seed_post(&store, "p3", "stranger", "2026-01-01T12:00:00+00:00");
        follow::follow_user(&store, "me", "friend").unwrap();

        let page = followed_posts(&store, "me", 1).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[test]
    fn feeds_are_newest_first() {
        let store = MemoryStore::new();
        seed_post(&store, "old", "me", "2026-01-01T10:00:00+00:00");
        seed_post(&store, "new", "me", "2026-02-01T10:00:00+00:00");
        seed_post(&store, "mid", "me", "2026-01-15T10:00:00+00:00");

        let page = explore_posts(&store, 1).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn pages_concatenate_without_gaps_or_duplicates() {
        let store = MemoryStore::new();
        for i in 0..60 {
            seed_post(
                &store,
                &format!("p{:02}", i),
                "me",
                &format!("2026-01-01T10:{:02}:00+00:00", i),
            );
        }

        let mut seen = Vec::new();
        for page_no in 1..=3 {
            let page = explore_posts(&store, page_no).unwrap();
            assert_eq!(page.page, page_no);
            assert_eq!(page.has_prev, page_no > 1);
            assert_eq!(page.has_next, page_no < 3);
            seen.extend(page.items.into_iter().map(|p| p.id));
        }

        assert_eq!(seen.len(), 60);
        let mut expected: Vec<String> = (0..60).map(|i| format!("p{:02}", i)).collect();
        expected.reverse();
        assert_eq!(seen, expected);
    }

    #[test]
    fn page_beyond_the_end_is_empty() {
        let store = MemoryStore::new();
        seed_post(&store, "p1", "me", "2026-01-01T10:00:00+00:00");

        let page = explore_posts(&store, 9).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn empty_store_yields_empty_first_page() {
        let store = MemoryStore::new();
        let page = followed_posts(&store, "me", 1).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn identical_timestamps_keep_a_stable_order() {
        let store = MemoryStore::new();
        seed_post(&store, "a", "me", "2026-01-01T10:00:00+00:00");
        seed_post(&store, "b", "me", "2026-01-01T10:00:00+00:00");

        let first = explore_posts(&store, 1).unwrap();
        let second = explore_posts(&store, 1).unwrap();
        let ids: Vec<&str> = first.items.iter().map(|p| p.id.as_str()).collect();
        let ids_again: Vec<&str> = second.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ids_again);
        assert_eq!(ids, vec!["b", "a"]);
    }
}
