use std::sync::OnceLock;

use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config;
use crate::core::errors::ApiError;
use crate::core::helpers::now_iso;
use crate::core::store::{Datastore, DatastoreExt};
use crate::feed;
use crate::lang::detect_language;
use crate::models::models::{Post, User};
use crate::users;
use crate::validation;

pub fn create_post(
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
    let body = value["body"].as_str().unwrap_or_default();

    if let Err(errors) = validation::validate_post_body(body) {
        return Ok(ApiError::Validation(errors).into());
    }

    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        user_id: user.id.clone(),
        body: filter_post_body(body),
        created_at: now_iso(),
        // Detection runs on the raw text, before markup filtering.
        language: detect_language(body),
    };

    store.set_json(&config::post_key(&id), &post)?;

    let mut index: Vec<String> = store.get_json(config::POSTS_KEY)?.unwrap_or_default();
    index.insert(0, id); // prepend newest
    store.set_json(config::POSTS_KEY, &index)?;

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&post)?)
        .build())
}

/// GET /users/{username}/posts, the public listing of one author's posts.
pub fn handle_user_posts(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let username = req
        .path()
        .strip_prefix("/users/")
        .and_then(|rest| rest.strip_suffix("/posts"))
        .unwrap_or_default();
    let username = urlencoding::decode(username)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| username.to_string());

    let Some(user) = users::find_by_username(store, &username)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", username)).into());
    };

    let page = crate::core::query_params::page_param(req.uri());
    let posts = feed::user_posts(store, &user.id, page)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&posts)?)
        .build())
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

/// Sanitize a post body and turn bare URLs into links.
pub fn filter_post_body(body: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(body)
        .to_string();

    // Convert HTTP/HTTPS URLs into clickable links with proper escaping
    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(filter_post_body("hello world"), "hello world");
    }

    #[test]
    fn scripts_are_stripped() {
        let filtered = filter_post_body("hi <script>alert('x')</script>there");
        assert!(!filtered.contains("<script>"));
        assert!(filtered.contains("hi"));
        assert!(filtered.contains("there"));
    }

    #[test]
    fn urls_become_links() {
        let filtered = filter_post_body("see https://example.com for more");
        assert!(filtered.contains(r#"<a href="https://example.com""#));
        assert!(filtered.contains("target=\"_blank\""));
    }
}
