use email_address::EmailAddress;

use crate::config;
use crate::core::errors::FieldError;
use crate::core::store::Datastore;
use crate::models::models::User;
use crate::users;

/// Outcome of validating one request payload. `Err` carries every failed
/// field so clients can show all problems at once.
pub type Validated = Result<(), Vec<FieldError>>;

fn check_username(
    store: &dyn Datastore,
    username: &str,
    errors: &mut Vec<FieldError>,
) -> anyhow::Result<()> {
    let len = username.chars().count();
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if len < config::MIN_USERNAME_LENGTH || len > config::MAX_USERNAME_LENGTH {
        errors.push(FieldError::new(
            "username",
            format!(
                "Username must be between {} and {} characters",
                config::MIN_USERNAME_LENGTH,
                config::MAX_USERNAME_LENGTH
            ),
        ));
    } else if users::find_by_username(store, username)?.is_some() {
        errors.push(FieldError::new("username", "Please use a different username"));
    }
    Ok(())
}

/// Validate a registration payload. Username and email must be unused.
pub fn validate_registration(
    store: &dyn Datastore,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Validated> {
    let mut errors = Vec::new();

    check_username(store, username, &mut errors)?;

    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if email.chars().count() > config::MAX_EMAIL_LENGTH || !EmailAddress::is_valid(email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    } else if users::find_by_email(store, email)?.is_some() {
        errors.push(FieldError::new(
            "email",
            "Please use a different email address",
        ));
    }

    if password.chars().count() < config::MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            "password",
            format!(
                "Password must be at least {} characters",
                config::MIN_PASSWORD_LENGTH
            ),
        ));
    }

    Ok(if errors.is_empty() { Ok(()) } else { Err(errors) })
}

/// Validate a profile edit. The username is only checked for collisions
/// when it differs from the caller's current one.
pub fn validate_profile_edit(
    store: &dyn Datastore,
    current: &User,
    new_username: &str,
    about_me: &str,
) -> anyhow::Result<Validated> {
    let mut errors = Vec::new();

    if new_username != current.username {
        check_username(store, new_username, &mut errors)?;
    }

    if about_me.chars().count() > config::MAX_ABOUT_LENGTH {
        errors.push(FieldError::new(
            "about_me",
            format!("About me must be at most {} characters", config::MAX_ABOUT_LENGTH),
        ));
    }

    Ok(if errors.is_empty() { Ok(()) } else { Err(errors) })
}

/// Validate a post body. Length limits apply to characters, not bytes.
pub fn validate_post_body(body: &str) -> Validated {
    let mut errors = Vec::new();
    let len = body.chars().count();
    if len == 0 {
        errors.push(FieldError::new("body", "Post body must not be empty"));
    } else if len > config::MAX_POST_LENGTH {
        errors.push(FieldError::new(
            "body",
            format!("Post body must be at most {} characters", config::MAX_POST_LENGTH),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the replacement password in a reset flow.
pub fn validate_reset_password(password: &str) -> Validated {
    if password.chars().count() < config::MIN_PASSWORD_LENGTH {
        return Err(vec![FieldError::new(
            "password",
            format!(
                "Password must be at least {} characters",
                config::MIN_PASSWORD_LENGTH
            ),
        )]);
    }
    Ok(())
}
