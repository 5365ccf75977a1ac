//! The signed-in user as shown by the dashboard.

use crate::backend::SessionClient;
use crate::forms::Notification;
use tracing::warn;
use uuid::Uuid;

/// Identity fields from the auth service merged with the user's profile row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub username: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email_confirmed_at: Option<String>,
}

impl User {
    #[must_use]
    pub fn initials(&self) -> String {
        initials(self.name.as_deref())
    }
}

/// Loading state of the current user for one page render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub loading: bool,
    pub user: Option<User>,
    pub notification: Option<Notification>,
}

impl CurrentUser {
    /// State before any read has been attempted.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            loading: true,
            user: None,
            notification: None,
        }
    }

    /// Read the identity, then the profile row of that identity.
    ///
    /// Any failure leaves `user` empty and records one error notification; nothing
    /// is retried.
    pub async fn load(client: &mut SessionClient) -> Self {
        let mut state = Self::pending();
        state.loading = false;

        let identity = match client.get_user().await {
            Ok(identity) => identity,
            Err(err) => {
                warn!("failed to load user: {err}");
                state.notification = Some(Notification::error(format!("Error loading user: {err}")));
                return state;
            }
        };

        let profile = match client.read_profile(identity.id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id = %identity.id, "failed to load profile: {err}");
                state.notification = Some(Notification::error(format!(
                    "Error loading user profile: {err}"
                )));
                return state;
            }
        };

        state.user = Some(User {
            id: identity.id,
            name: profile.full_name,
            email: identity.email,
            avatar: profile.avatar_url,
            username: profile.username,
            website: profile.website,
            phone: identity.phone,
            email_confirmed_at: identity.email_confirmed_at,
        });
        state
    }
}

/// Up to two upper-cased initials of `name`; `"A"` when there is no name.
#[must_use]
pub fn initials(name: Option<&str>) -> String {
    let mut words = name.unwrap_or_default().split_whitespace();
    let Some(first) = words.next() else {
        return "A".to_string();
    };
    let mut initials = leading_upper(first);
    if let Some(second) = words.next() {
        initials.push_str(&leading_upper(second));
    }
    initials
}

fn leading_upper(word: &str) -> String {
    word.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}
