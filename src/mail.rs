use std::sync::Arc;

use crate::models::models::User;

/// A composed message, ready for a transport.
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Transport that writes messages to the application log. Stands in for a
/// real SMTP relay in development and inside the sandboxed component.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &Email) -> anyhow::Result<()> {
        log::info!("mail to <{}> subject {:?}", email.to, email.subject);
        log::info!("{}", email.body);
        Ok(())
    }
}

/// Compose the password reset message with its signed link.
pub fn password_reset_email(user: &User, reset_token: &str, base_url: &str) -> Email {
    let link = format!(
        "{}/reset_password/{}",
        base_url.trim_end_matches('/'),
        reset_token
    );
    Email {
        to: user.email.clone(),
        subject: "[Chirp] Reset Your Password".to_string(),
        body: format!(
            "Dear {},\n\n\
             To reset your password click on the following link:\n\n\
             {}\n\n\
             If you have not requested a password reset simply ignore this message.\n\n\
             Sincerely,\n\nThe Chirp Team",
            user.username, link
        ),
    }
}

/// Hand a message to the transport without blocking the current request.
///
/// Delivery is at most once. A failed send is logged and dropped, never
/// retried and never surfaced to the caller.
pub fn deliver(mailer: Arc<dyn Mailer>, email: Email) {
    #[cfg(not(target_arch = "wasm32"))]
    std::thread::spawn(move || {
        if let Err(err) = mailer.send(&email) {
            log::warn!("email delivery to <{}> failed: {}", email.to, err);
        }
    });

    // Component instances are single threaded, send before the response goes out.
    #[cfg(target_arch = "wasm32")]
    if let Err(err) = mailer.send(&email) {
        log::warn!("email delivery to <{}> failed: {}", email.to, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn sample_user() -> User {
        User {
            id: "id-susan".to_string(),
            username: "susan".to_string(),
            email: "susan@example.com".to_string(),
            password: "hash".to_string(),
            about_me: None,
            last_seen: None,
        }
    }

    #[test]
    fn reset_email_carries_link_and_recipient() {
        let email = password_reset_email(&sample_user(), "tok123", "http://localhost:3000/");
        assert_eq!(email.to, "susan@example.com");
        assert!(email.body.contains("http://localhost:3000/reset_password/tok123"));
        assert!(email.body.contains("Dear susan"));
    }

    #[test]
    fn log_mailer_accepts_messages() {
        let email = password_reset_email(&sample_user(), "tok123", "http://localhost:3000");
        assert!(LogMailer.send(&email).is_ok());
    }

    struct ChannelMailer(Mutex<mpsc::Sender<String>>);

    impl Mailer for ChannelMailer {
        fn send(&self, email: &Email) -> anyhow::Result<()> {
            let tx = self.0.lock().expect("sender mutex poisoned");
            tx.send(email.to.clone())?;
            Ok(())
        }
    }

    #[test]
    fn deliver_reaches_the_transport() {
        let (tx, rx) = mpsc::channel();
        let mailer = Arc::new(ChannelMailer(Mutex::new(tx)));
        deliver(
            mailer,
            Email {
                to: "susan@example.com".to_string(),
                subject: "hi".to_string(),
                body: "there".to_string(),
            },
        );
        let to = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(to, "susan@example.com");
    }
}
