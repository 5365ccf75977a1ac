use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::backend::SessionClient;
use crate::schema::AccountInput;
use tracing::info;

pub const ACCOUNT_UPDATED_MESSAGE: &str = "Account updated.";

/// Update the email, phone and optionally the password of the signed-in user.
///
/// An email change only takes effect once the backend's confirmation link is followed.
pub async fn submit(
    client: &mut SessionClient,
    in_flight: &InFlight,
    form_id: &str,
    input: &AccountInput,
) -> Submission {
    let key = FormKey::new(FormKind::Account, form_id);
    run(in_flight, key, input.validate(), |attributes| async move {
        match client.update_user(&attributes).await {
            Ok(user) => {
                info!(user_id = %user.id, password_changed = attributes.password.is_some(), "account updated");
                Outcome::success(ACCOUNT_UPDATED_MESSAGE)
            }
            Err(err) => Outcome::failure(err.to_string()),
        }
    })
    .await
}
