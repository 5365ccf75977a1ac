use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::analytics::{EventTracker, LOGIN_FAILED, LOGIN_SUCCESSFUL, LOGIN_UNCONFIRMED_EMAIL};
use crate::backend::SessionClient;
use crate::schema::LoginInput;
use serde_json::json;
use tracing::info;

pub const LOGIN_SUCCESSFUL_MESSAGE: &str = "Login successful";
pub const UNCONFIRMED_EMAIL_MESSAGE: &str = "Please confirm your email before logging in.";

/// Where to go after login: `redirect_to` when it is a path on this site, else `/`.
#[must_use]
pub fn redirect_target(redirect_to: Option<&str>) -> String {
    match redirect_to {
        Some(target)
            if target.starts_with('/')
                && !target.starts_with("//")
                && !target.starts_with("/\\") =>
        {
            target.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Sign in with email and password.
///
/// The session is only persisted for users with a confirmed email.
pub async fn submit(
    client: &mut SessionClient,
    in_flight: &InFlight,
    events: &dyn EventTracker,
    form_id: &str,
    input: &LoginInput,
    redirect_to: Option<&str>,
) -> Submission {
    let key = FormKey::new(FormKind::Login, form_id);
    run(in_flight, key, input.validate(), |credentials| async move {
        let session = match client.sign_in(&credentials).await {
            Ok(session) => session,
            Err(err) => {
                info!("login failed: {err}");
                events.track(LOGIN_FAILED, json!({ "error": err.to_string() }));
                return Outcome::failure(err.to_string());
            }
        };

        if !session.user.is_email_confirmed() {
            events.track(LOGIN_UNCONFIRMED_EMAIL, json!({}));
            return Outcome::failure(UNCONFIRMED_EMAIL_MESSAGE);
        }

        info!(user_id = %session.user.id, "login successful");
        client.set_session(session);
        events.track(LOGIN_SUCCESSFUL, json!({}));
        Outcome::success(LOGIN_SUCCESSFUL_MESSAGE).then_navigate(redirect_target(redirect_to))
    })
    .await
}
