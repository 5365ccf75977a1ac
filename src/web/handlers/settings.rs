use super::{dashboard::shell_page, html, respond};
use crate::backend::{CookieMode, Upload};
use crate::forms::{account, new_form_id, profile};
use crate::schema::{AccountInput, FieldErrors, ProfileInput};
use crate::user::CurrentUser;
use crate::web::{
    flash,
    views::{
        forms::{self as views, FormView, ProfileFields},
        shell,
    },
    AppState,
};
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use leptos::prelude::IntoAny;
use serde::Deserialize;
use tracing::warn;

pub const PROFILE_PATH: &str = "/settings/profile";
pub const ACCOUNT_PATH: &str = "/settings/account";

const PROFILE_DESCRIPTION: &str = "This is how others will see you on the site.";
const ACCOUNT_DESCRIPTION: &str = "Update your account settings.";

#[derive(Deserialize)]
pub struct AccountForm {
    #[serde(default = "new_form_id")]
    pub form_id: String,
    #[serde(flatten)]
    pub input: AccountInput,
}

pub async fn index() -> Redirect {
    Redirect::to(PROFILE_PATH)
}

pub async fn profile_page(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let mut client = state.session_client(&headers, CookieMode::ReadOnly);
    let current = CurrentUser::load(&mut client).await;

    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled: current.user.is_none(),
    };
    let fields = ProfileFields::from_user(current.user.as_ref());
    let form = views::profile(&view, current.user.as_ref(), &fields);
    let content = shell::settings(PROFILE_PATH, "Profile", PROFILE_DESCRIPTION, form);
    html(
        shell_page(
            &state,
            &headers,
            PROFILE_PATH,
            &current,
            "Profile",
            notification.as_ref(),
            content,
        ),
        removal,
    )
}

struct ProfileForm {
    form_id: String,
    input: ProfileInput,
    avatar: Option<Upload>,
}

async fn read_profile_form(mut multipart: Multipart) -> Result<ProfileForm, MultipartError> {
    let mut form = ProfileForm {
        form_id: String::new(),
        input: ProfileInput::default(),
        avatar: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "avatar" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    form.avatar = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "form_id" => form.form_id = field.text().await?,
            "username" => form.input.username = field.text().await?,
            "full_name" => form.input.full_name = field.text().await?,
            "website" => form.input.website = field.text().await?,
            _ => {}
        }
    }

    if form.form_id.is_empty() {
        form.form_id = new_form_id();
    }
    Ok(form)
}

pub async fn update_profile(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = match read_profile_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!("unreadable profile form: {err}");
            return err.into_response();
        }
    };

    let mut client = state.session_client(&headers, CookieMode::Mutable);
    let submission = profile::submit(
        &mut client,
        &state.in_flight,
        &form.form_id,
        &form.input,
        form.avatar,
    )
    .await;
    let current = CurrentUser::load(&mut client).await;

    respond(&state, submission, client.set_cookie_headers(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let fields = ProfileFields {
            username: &form.input.username,
            full_name: &form.input.full_name,
            website: &form.input.website,
        };
        let profile_form = views::profile(&view, current.user.as_ref(), &fields);
        let content = shell::settings(PROFILE_PATH, "Profile", PROFILE_DESCRIPTION, profile_form);
        shell_page(
            &state,
            &headers,
            PROFILE_PATH,
            &current,
            "Profile",
            result.notification,
            content,
        )
    })
}

pub async fn account_page(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let (notification, removal) = flash::take(&headers, state.config.secure_cookies());
    let mut client = state.session_client(&headers, CookieMode::ReadOnly);
    let current = CurrentUser::load(&mut client).await;

    let view = FormView {
        form_id: &new_form_id(),
        errors: &FieldErrors::default(),
        disabled: current.user.is_none(),
    };
    let user = current.user.as_ref();
    let form = views::account(
        &view,
        user.and_then(|user| user.email.as_deref()).unwrap_or_default(),
        user.and_then(|user| user.phone.as_deref()).unwrap_or_default(),
    );
    let content = shell::settings(ACCOUNT_PATH, "Account", ACCOUNT_DESCRIPTION, form);
    html(
        shell_page(
            &state,
            &headers,
            ACCOUNT_PATH,
            &current,
            "Account",
            notification.as_ref(),
            content,
        ),
        removal,
    )
}

pub async fn update_account(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Form(form): Form<AccountForm>,
) -> Response {
    let mut client = state.session_client(&headers, CookieMode::Mutable);
    let submission = account::submit(&mut client, &state.in_flight, &form.form_id, &form.input).await;
    let current = CurrentUser::load(&mut client).await;

    respond(&state, submission, client.set_cookie_headers(), |result| {
        let view = FormView {
            form_id: &form.form_id,
            errors: result.errors,
            disabled: result.disabled,
        };
        let account_form = views::account(&view, &form.input.email, &form.input.phone);
        let content = shell::settings(ACCOUNT_PATH, "Account", ACCOUNT_DESCRIPTION, account_form);
        shell_page(
            &state,
            &headers,
            ACCOUNT_PATH,
            &current,
            "Account",
            result.notification,
            content,
        )
    })
}

async fn informational(
    state: &AppState,
    headers: &HeaderMap,
    path: &'static str,
    title: &'static str,
    description: &'static str,
) -> Response {
    let (notification, removal) = flash::take(headers, state.config.secure_cookies());
    let mut client = state.session_client(headers, CookieMode::ReadOnly);
    let current = CurrentUser::load(&mut client).await;
    let content = shell::settings(path, title, description, ().into_any());
    html(
        shell_page(
            state,
            headers,
            path,
            &current,
            title,
            notification.as_ref(),
            content,
        ),
        removal,
    )
}

pub async fn appearance(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    informational(
        &state,
        &headers,
        "/settings/appearance",
        "Appearance",
        "Customize the appearance of the app. Automatically switch between day and night themes.",
    )
    .await
}

pub async fn display(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    informational(
        &state,
        &headers,
        "/settings/display",
        "Display",
        "Turn items on or off to control what's displayed in the app.",
    )
    .await
}

pub async fn notifications(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    informational(
        &state,
        &headers,
        "/settings/notifications",
        "Notifications",
        "Configure how you receive notifications.",
    )
    .await
}
