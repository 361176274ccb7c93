use spin_sdk::http::{Method, Request, Response};

pub mod auth;
pub mod config;
pub mod feed;
pub mod follow;
pub mod lang;
pub mod mail;
pub mod posts;
pub mod templates;
pub mod token;
pub mod users;
pub mod validation;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod query_params;
    pub mod store;
}

pub mod models {
    pub mod models;
}

use crate::core::errors::ApiError;
use crate::core::store::Datastore;

/// Serve one request against the given store.
///
/// Errors that escape a handler are logged and turned into a generic 500,
/// expected failures come back as regular responses from the handlers.
pub fn route(store: &dyn Datastore, req: Request) -> Response {
    match dispatch(store, &req) {
        Ok(resp) => resp,
        Err(err) => {
            log::error!("error serving {} {}: {}", req.method(), req.path(), err);
            ApiError::InternalError("Internal server error".to_string()).into()
        }
    }
}

fn dispatch(store: &dyn Datastore, req: &Request) -> anyhow::Result<Response> {
    let auth = auth::authenticate(store, req)?;
    let auth = auth.as_ref();
    let path = req.path().to_string();

    let resp = match (req.method(), path.as_str()) {
        (Method::Post, "/register") => users::create_user(store, req)?,
        (Method::Post, "/login") => auth::login_user(store, req)?,
        (Method::Post, "/logout") => auth::logout_user(store, req)?,
        (Method::Get, "/index") | (Method::Get, "/feed") => feed::handle_home(store, auth, req)?,
        (Method::Get, "/explore") => feed::handle_explore(store, auth, req)?,
        (Method::Post, "/posts") => posts::create_post(store, auth, req)?,
        (Method::Get, "/profile") => users::get_profile(auth)?,
        (Method::Put, "/edit_profile") => users::update_profile(store, auth, req)?,
        (Method::Post, "/reset_password_request") => {
            auth::reset_password_request(store, auth, req)?
        }
        (Method::Post, p) if p.starts_with("/reset_password/") => {
            auth::reset_password(store, auth, req)?
        }
        // Mailed reset links open in a browser, hand them the app shell.
        (Method::Get, p) if p.starts_with("/reset_password/") => templates::serve_static("/")?,
        (Method::Post, p) if p.starts_with("/follow/") => follow::handle_follow(store, auth, p)?,
        (Method::Post, p) if p.starts_with("/unfollow/") => {
            follow::handle_unfollow(store, auth, p)?
        }
        (Method::Get, p) if p.starts_with("/followers/") => follow::handle_followers(store, p)?,
        (Method::Get, p) if p.starts_with("/following/") => follow::handle_following(store, p)?,
        (Method::Get, p) if p.starts_with("/users/") && p.ends_with("/posts") => {
            posts::handle_user_posts(store, req)?
        }
        (Method::Get, p) if p.starts_with("/users/") => users::get_user_details(store, p)?,
        (Method::Get, p) if p.starts_with("/user/") => templates::render_user_profile(store, req)?,
        // Everything else that is a GET falls through to the embedded assets.
        (Method::Get, p) => templates::serve_static(p)?,
        _ => ApiError::NotFound("Not found".to_string()).into(),
    };

    Ok(resp)
}

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;

    use crate::core::db;
    use crate::core::store::SpinStore;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = SpinStore::open_default()?;
        if let Err(err) = db::init_demo_data(&store) {
            log::warn!("demo data init failed: {}", err);
        }
        Ok(crate::route(&store, req))
    }
}
