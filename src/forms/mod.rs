//! Form submission workflows.
//!
//! Every workflow follows the same contract, implemented by [`run`]:
//!
//! 1. invalid input is rejected without contacting the backend;
//! 2. a form instance that is already being submitted is rejected as busy;
//! 3. exactly one remote step runs and yields exactly one [`Notification`],
//!    optionally followed by a navigation target.
//!
//! The in-flight flag lives in an [`InFlightGuard`], so it is cleared on success,
//! on failure and when the request future is dropped.

pub mod account;
pub mod forgot_password;
pub mod login;
pub mod profile;
pub mod register;
pub mod reset_password;

use crate::schema::FieldErrors;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use ulid::Ulid;

pub const BUSY_MESSAGE: &str = "This form is already being submitted.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormKind {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Account,
    Profile,
}

/// Identifies one rendered form: its kind plus the instance id embedded in the page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormKey {
    kind: FormKind,
    instance: String,
}

impl FormKey {
    #[must_use]
    pub fn new(kind: FormKind, instance: impl Into<String>) -> Self {
        Self {
            kind,
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FormKind {
        self.kind
    }
}

/// A fresh instance id for a rendered form.
#[must_use]
pub fn new_form_id() -> String {
    Ulid::new().to_string()
}

/// Registry of form instances with a submission in progress.
#[derive(Clone, Debug, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<FormKey>>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<FormKey>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` as submitting. Returns `None` if it already is.
    #[must_use]
    pub fn try_begin(&self, key: FormKey) -> Option<InFlightGuard> {
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            registry: self.clone(),
            key,
        })
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &FormKey) -> bool {
        self.lock().contains(key)
    }
}

/// Clears the in-flight flag of its form when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlight,
    key: FormKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub notification: Notification,
    pub navigate_to: Option<String>,
}

impl Outcome {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            notification: Notification::success(message),
            navigate_to: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            notification: Notification::error(message),
            navigate_to: None,
        }
    }

    #[must_use]
    pub fn then_navigate(mut self, to: impl Into<String>) -> Self {
        self.navigate_to = Some(to.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Input failed validation; nothing was sent.
    Rejected(FieldErrors),
    /// The same form instance is still being submitted.
    Busy,
    /// The form cannot be submitted; the message explains why.
    Disabled(String),
    Completed(Outcome),
}

/// Drive one submission through validation, the in-flight guard and its remote step.
pub async fn run<V, F, Fut>(
    in_flight: &InFlight,
    key: FormKey,
    validated: Result<V, FieldErrors>,
    remote: F,
) -> Submission
where
    F: FnOnce(V) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let values = match validated {
        Ok(values) => values,
        Err(errors) => {
            debug!(form = ?key.kind(), errors = errors.len(), "form rejected by validation");
            return Submission::Rejected(errors);
        }
    };

    let Some(_guard) = in_flight.try_begin(key.clone()) else {
        debug!(form = ?key.kind(), "form already in flight");
        return Submission::Busy;
    };

    Submission::Completed(remote(values).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> FormKey {
        FormKey::new(FormKind::Login, "01J9Z")
    }

    #[test]
    fn guard_clears_flag_on_drop() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_begin(key());
        assert!(guard.is_some());
        assert!(in_flight.is_in_flight(&key()));
        assert!(in_flight.try_begin(key()).is_none());
        drop(guard);
        assert!(!in_flight.is_in_flight(&key()));
    }

    #[test]
    fn instances_are_independent() {
        let in_flight = InFlight::default();
        let _first = in_flight.try_begin(key());
        assert!(in_flight
            .try_begin(FormKey::new(FormKind::Login, "other"))
            .is_some());
        assert!(in_flight
            .try_begin(FormKey::new(FormKind::Register, "01J9Z"))
            .is_some());
    }

    #[tokio::test]
    async fn invalid_input_skips_remote_step() {
        let in_flight = InFlight::default();
        let mut errors = FieldErrors::default();
        errors.push("email", "Invalid email");
        let submission = run(&in_flight, key(), Err::<(), _>(errors.clone()), |()| async {
            Outcome::success("remote step ran")
        })
        .await;
        assert_eq!(submission, Submission::Rejected(errors));
        assert!(!in_flight.is_in_flight(&key()));
    }

    #[tokio::test]
    async fn flag_is_set_during_remote_step_and_cleared_after() {
        let in_flight = InFlight::default();
        let probe = in_flight.clone();
        let submission = run(&in_flight, key(), Ok(()), |()| async move {
            assert!(probe.is_in_flight(&key()));
            Outcome::failure("boom")
        })
        .await;
        assert_eq!(submission, Submission::Completed(Outcome::failure("boom")));
        assert!(!in_flight.is_in_flight(&key()));
    }

    #[tokio::test]
    async fn concurrent_submission_is_busy() {
        let in_flight = InFlight::default();
        let _held = in_flight.try_begin(key());
        let submission = run(&in_flight, key(), Ok(()), |()| async {
            Outcome::success("unreachable")
        })
        .await;
        assert_eq!(submission, Submission::Busy);
    }

    #[test]
    fn form_ids_are_unique() {
        assert_ne!(new_form_id(), new_form_id());
    }
}
