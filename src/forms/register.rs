use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::backend::Backend;
use crate::schema::RegistrationInput;
use tracing::info;

pub const REGISTERED_MESSAGE: &str =
    "Registration successful. Check your email for a confirmation link.";

/// Create an account; the backend sends the confirmation email.
pub async fn submit(
    backend: &dyn Backend,
    in_flight: &InFlight,
    form_id: &str,
    input: &RegistrationInput,
) -> Submission {
    let key = FormKey::new(FormKind::Register, form_id);
    run(in_flight, key, input.validate(), |credentials| async move {
        match backend.sign_up(&credentials).await {
            Ok(()) => {
                info!("registration accepted");
                Outcome::success(REGISTERED_MESSAGE).then_navigate("/login")
            }
            Err(err) => Outcome::failure(err.to_string()),
        }
    })
    .await
}
