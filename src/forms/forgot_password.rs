use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::backend::Backend;
use crate::schema::ForgotPasswordInput;
use url::Url;

pub const RESET_EMAIL_SENT_MESSAGE: &str = "Password reset email sent. Check your inbox.";
pub const RESET_PATH: &str = "/reset-password";

/// The address of the reset page placed in recovery emails.
///
/// `origin` is the request origin, used when no public site URL is configured.
/// The site URL is a root URL, configuration rejects one with a path.
#[must_use]
pub fn reset_link(site_url: Option<&Url>, origin: &str) -> String {
    match site_url.and_then(|site| site.join(RESET_PATH).ok()) {
        Some(url) => url.to_string(),
        None => format!("{}{RESET_PATH}", origin.trim_end_matches('/')),
    }
}

/// Ask the backend to email a password recovery link pointing at `redirect_to`.
pub async fn submit(
    backend: &dyn Backend,
    in_flight: &InFlight,
    form_id: &str,
    input: &ForgotPasswordInput,
    redirect_to: &str,
) -> Submission {
    let key = FormKey::new(FormKind::ForgotPassword, form_id);
    run(in_flight, key, input.validate(), |email| async move {
        match backend.request_password_reset(&email, redirect_to).await {
            Ok(()) => Outcome::success(RESET_EMAIL_SENT_MESSAGE),
            Err(err) => Outcome::failure(err.to_string()),
        }
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::mock::{Call, MockBackend};
    use crate::backend::BackendError;

    #[test]
    fn reset_link_prefers_site_url() {
        let site = Url::parse("https://portal.dev").unwrap();
        assert_eq!(
            reset_link(Some(&site), "http://localhost:8080"),
            "https://portal.dev/reset-password"
        );
        assert_eq!(
            reset_link(None, "http://localhost:8080/"),
            "http://localhost:8080/reset-password"
        );
    }

    #[tokio::test]
    async fn success_stays_on_page() {
        let backend = MockBackend::default();
        let input = ForgotPasswordInput {
            email: "ada@example.com".to_string(),
        };
        let submission = submit(
            &backend,
            &InFlight::default(),
            "f",
            &input,
            "https://portal.dev/reset-password",
        )
        .await;
        assert_eq!(
            submission,
            Submission::Completed(Outcome::success(RESET_EMAIL_SENT_MESSAGE))
        );
        assert_eq!(
            backend.calls(),
            vec![Call::RequestPasswordReset {
                email: "ada@example.com".to_string(),
                redirect_to: "https://portal.dev/reset-password".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn rate_limit_message_is_surfaced() {
        let backend = MockBackend {
            password_reset: Err(BackendError::Api {
                status: 429,
                message: "For security purposes, you can only request this once every 60 seconds"
                    .to_string(),
            }),
            ..MockBackend::default()
        };
        let input = ForgotPasswordInput {
            email: "ada@example.com".to_string(),
        };
        let submission = submit(&backend, &InFlight::default(), "f", &input, "/reset").await;
        let Submission::Completed(outcome) = submission else {
            panic!("expected a completed submission");
        };
        assert!(outcome.notification.is_error());
        assert!(outcome.notification.message.starts_with("For security purposes"));
    }
}
