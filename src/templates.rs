use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::{Request, Response};

use crate::core::errors::ApiError;
use crate::core::query_params::page_param;
use crate::core::store::Datastore;
use crate::feed::{self, PostPage};
use crate::follow;
use crate::users;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

pub fn serve_static(path: &str) -> anyhow::Result<Response> {
    let file_path = match path {
        "/" => "index.html",
        "/index.html" => "index.html",
        _ => path.trim_start_matches('/'),
    };

    let Some(file) = Assets::get(file_path) else {
        return Ok(ApiError::NotFound("File not found".to_string()).into());
    };

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(file.data.to_vec())
        .build())
}

fn pagination_links(username: &str, page: &PostPage) -> String {
    let encoded = urlencoding::encode(username);
    let mut links = String::new();
    if page.has_prev {
        links.push_str(&format!(
            r#"<a href="/user/{}?page={}">Newer posts</a>"#,
            encoded,
            page.page - 1
        ));
    }
    if page.has_next {
        if !links.is_empty() {
            links.push_str(" | ");
        }
        links.push_str(&format!(
            r#"<a href="/user/{}?page={}">Older posts</a>"#,
            encoded,
            page.page + 1
        ));
    }
    links
}

/// GET /user/{username}, the server-rendered profile page.
pub fn render_user_profile(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let raw = req.path().strip_prefix("/user/").unwrap_or_default();
    let username = urlencoding::decode(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string());

    let Some(user) = users::find_by_username(store, &username)? else {
        return Ok(ApiError::NotFound(format!("User {} not found", username)).into());
    };

    let page = page_param(req.uri());
    let posts = feed::user_posts(store, &user.id, page)?;
    let follower_count = follow::follower_ids(store, &user.id)?.len();
    let following_count = follow::following_ids(store, &user.id)?.len();

    let template = Assets::get("profile.html")
        .ok_or_else(|| anyhow::anyhow!("Profile template not found"))?
        .data
        .to_vec();
    let mut html = String::from_utf8(template)?;

    html = html.replace(
        "PROFILE_USERNAME",
        &html_escape::encode_text(&user.username).to_string(),
    );
    html = html.replace(
        "PROFILE_ABOUT",
        &html_escape::encode_text(user.about_me.as_deref().unwrap_or("")).to_string(),
    );
    html = html.replace(
        "PROFILE_LAST_SEEN",
        &html_escape::encode_text(user.last_seen.as_deref().unwrap_or("never")).to_string(),
    );
    html = html.replace("PROFILE_FOLLOWERS", &follower_count.to_string());
    html = html.replace("PROFILE_FOLLOWING", &following_count.to_string());

    // Post bodies were sanitized when the posts were created, they go in as is.
    let mut posts_html = String::new();
    for post in &posts.items {
        posts_html.push_str(&format!(
            r#"<div class="post"><span class="post-author">{}</span> <span class="post-date">{}</span><div class="post-body">{}</div></div>"#,
            html_escape::encode_text(&user.username),
            html_escape::encode_text(&post.created_at),
            post.body,
        ));
    }
    html = html.replace("PROFILE_POSTS", &posts_html);
    html = html.replace("PROFILE_PAGINATION", &pagination_links(&user.username, &posts));

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build())
}
