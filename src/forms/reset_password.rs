use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::backend::{BackendError, OtpType, SessionClient};
use crate::schema::ResetPasswordInput;
use serde::Deserialize;
use tracing::{info, warn};

pub const PASSWORD_RESET_MESSAGE: &str =
    "Password reset successful. Please log in with your new password.";

/// Query parameters the recovery email link lands with.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LinkQuery {
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl LinkQuery {
    /// The message to show when the link was rejected by the backend, e.g. expired.
    #[must_use]
    pub fn link_error(&self) -> Option<String> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        if present(&self.error).is_none() && present(&self.error_code).is_none() {
            return None;
        }
        present(&self.error_description)
            .or_else(|| present(&self.error_code))
            .or_else(|| present(&self.error))
    }

    /// The recovery token carried by the link, if any.
    #[must_use]
    pub fn recovery_token(&self) -> Option<&str> {
        match (self.token_hash.as_deref(), self.kind.as_deref().and_then(OtpType::parse)) {
            (Some(token), Some(OtpType::Recovery)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

/// Redeem the recovery token of the link, signing the user in for the reset.
///
/// Returns `Ok(false)` when the link carries no recovery token.
///
/// # Errors
/// Returns the backend error when the token is invalid or expired.
pub async fn exchange_link(client: &mut SessionClient, link: &LinkQuery) -> Result<bool, BackendError> {
    let Some(token) = link.recovery_token() else {
        return Ok(false);
    };
    client.verify_otp(token, OtpType::Recovery).await?;
    Ok(true)
}

/// Set a new password for the user signed in through the recovery link.
///
/// A link error disables the form regardless of the submitted values.
pub async fn submit(
    client: &mut SessionClient,
    in_flight: &InFlight,
    form_id: &str,
    input: &ResetPasswordInput,
    link: &LinkQuery,
) -> Submission {
    if let Some(message) = link.link_error() {
        warn!("reset link rejected: {message}");
        return Submission::Disabled(message);
    }

    let key = FormKey::new(FormKind::ResetPassword, form_id);
    run(in_flight, key, input.validate(), |attributes| async move {
        match client.update_user(&attributes).await {
            Ok(user) => {
                info!(user_id = %user.id, "password reset");
                Outcome::success(PASSWORD_RESET_MESSAGE).then_navigate("/login")
            }
            Err(err) => Outcome::failure(err.to_string()),
        }
    })
    .await
}
