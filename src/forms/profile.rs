use super::{run, FormKey, FormKind, InFlight, Outcome, Submission};
use crate::backend::{BackendError, ProfileUpsert, SessionClient, Upload, AVATAR_BUCKET};
use crate::schema::ProfileInput;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub const PROFILE_UPDATED_MESSAGE: &str = "Profile updated.";

/// Object path of an uploaded avatar: `<user id>_<unix millis>_<file name>`.
#[must_use]
pub fn avatar_path(user_id: Uuid, millis: i64, file_name: &str) -> String {
    format!("{user_id}_{millis}_{}", sanitize_file_name(file_name))
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.trim_matches('.').is_empty() {
        "avatar".to_string()
    } else {
        sanitized
    }
}

/// Save the profile row of the signed-in user, uploading a new avatar first.
///
/// A failed upload ends the submission before the row is written.
pub async fn submit(
    client: &mut SessionClient,
    in_flight: &InFlight,
    form_id: &str,
    input: &ProfileInput,
    avatar: Option<Upload>,
) -> Submission {
    let key = FormKey::new(FormKind::Profile, form_id);
    run(in_flight, key, input.validate(avatar), |values| async move {
        let Some(user_id) = client.session().map(|session| session.user.id) else {
            return Outcome::failure(BackendError::SessionMissing.to_string());
        };

        let mut avatar_url = None;
        if let Some(upload) = &values.avatar {
            let path = avatar_path(user_id, Utc::now().timestamp_millis(), &upload.file_name);
            match client.upload_file(AVATAR_BUCKET, &path, upload).await {
                Ok(url) => avatar_url = Some(url),
                Err(err) => return Outcome::failure(err.to_string()),
            }
        }

        let row = ProfileUpsert {
            id: user_id,
            username: values.username,
            full_name: values.full_name,
            website: values.website,
            avatar_url,
        };
        match client.upsert_profile(&row).await {
            Ok(()) => {
                info!(%user_id, avatar = row.avatar_url.is_some(), "profile updated");
                Outcome::success(PROFILE_UPDATED_MESSAGE)
            }
            Err(err) => Outcome::failure(err.to_string()),
        }
    })
    .await
}
