use super::Card;
use crate::schema::FieldErrors;
use crate::user::{initials, User};
use leptos::prelude::*;

/// Rendering state shared by every form.
pub struct FormView<'a> {
    pub form_id: &'a str,
    pub errors: &'a FieldErrors,
    pub disabled: bool,
}

impl FormView<'_> {
    fn input(&self, name: &'static str, label: &'static str, kind: &'static str) -> Input {
        Input {
            name,
            label,
            kind,
            value: String::new(),
            placeholder: "",
            error: self.errors.get(name).map(ToString::to_string),
        }
    }
}

/// One labelled input of a form and its first validation error.
struct Input {
    name: &'static str,
    label: &'static str,
    kind: &'static str,
    value: String,
    placeholder: &'static str,
    error: Option<String>,
}

impl Input {
    fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;
        self
    }
}

/// Passwords and files are never prefilled.
#[component]
fn Field(input: Input, disabled: bool) -> impl IntoView {
    let Input {
        name,
        label,
        kind,
        value,
        placeholder,
        error,
    } = input;
    let value = (kind != "password" && kind != "file").then_some(value);
    let accept = (kind == "file").then_some("image/*");

    view! {
        <div class="field">
            <label for=name>{label}</label>
            <input
                id=name
                name=name
                type=kind
                value=value
                accept=accept
                placeholder=placeholder
                disabled=disabled
            />
            {error.map(|message| view! { <p class="field-error">{message}</p> })}
        </div>
    }
}

#[component]
fn PostForm(
    #[prop(into)] action: String,
    #[prop(into)] form_id: String,
    #[prop(optional)] multipart: bool,
    #[prop(optional)] hidden: Vec<(&'static str, String)>,
    inputs: Vec<Input>,
    disabled: bool,
    submit: &'static str,
) -> impl IntoView {
    let enctype = multipart.then_some("multipart/form-data");

    view! {
        <form method="post" action=action enctype=enctype>
            <input type="hidden" name="form_id" value=form_id/>
            {hidden
                .into_iter()
                .map(|(name, value)| view! { <input type="hidden" name=name value=value/> })
                .collect_view()}
            {inputs
                .into_iter()
                .map(|input| view! { <Field input=input disabled=disabled/> })
                .collect_view()}
            <button type="submit" disabled=disabled>{submit}</button>
        </form>
    }
}

#[must_use]
pub fn login(view: &FormView<'_>, email: &str, redirect_to: Option<&str>) -> AnyView {
    let form_id = view.form_id.to_string();
    let disabled = view.disabled;
    let hidden: Vec<(&'static str, String)> = redirect_to
        .map(|redirect_to| ("redirect_to", redirect_to.to_string()))
        .into_iter()
        .collect();
    let inputs = vec![
        view.input("email", "Email", "email")
            .value(email)
            .placeholder("m@example.com"),
        view.input("password", "Password", "password")
            .placeholder("********"),
    ];

    view! {
        <Card title="Login" description="Enter your email below to login to your account">
            <PostForm
                action="/login"
                form_id=form_id
                hidden=hidden
                inputs=inputs
                disabled=disabled
                submit="Login"
            />
            <p><a href="/forgot-password">"Forgot your password?"</a></p>
            <p>"Don't have an account? " <a href="/register">"Register"</a></p>
        </Card>
    }
    .into_any()
}

#[must_use]
pub fn register(view: &FormView<'_>, email: &str) -> AnyView {
    let form_id = view.form_id.to_string();
    let disabled = view.disabled;
    let inputs = vec![
        view.input("email", "Email", "email")
            .value(email)
            .placeholder("m@example.com"),
        view.input("password", "Password", "password")
            .placeholder("********"),
        view.input("confirm_password", "Confirm Password", "password")
            .placeholder("********"),
    ];

    view! {
        <Card title="Register" description="Please fill out the form to create a new account">
            <PostForm
                action="/register"
                form_id=form_id
                inputs=inputs
                disabled=disabled
                submit="Register"
            />
            <p>"Already have an account? " <a href="/login">"Login"</a></p>
        </Card>
    }
    .into_any()
}

#[must_use]
pub fn forgot_password(view: &FormView<'_>, email: &str) -> AnyView {
    let form_id = view.form_id.to_string();
    let disabled = view.disabled;
    let inputs = vec![view
        .input("email", "Email", "email")
        .value(email)
        .placeholder("m@example.com")];

    view! {
        <Card title="Forgot Password" description="Enter your email address to reset your password.">
            <PostForm
                action="/forgot-password"
                form_id=form_id
                inputs=inputs
                disabled=disabled
                submit="Send Reset Link"
            />
        </Card>
    }
    .into_any()
}

/// `action` keeps the link's query string so a link error also applies on submit.
#[must_use]
pub fn reset_password(view: &FormView<'_>, action: &str) -> AnyView {
    let action = action.to_string();
    let form_id = view.form_id.to_string();
    let disabled = view.disabled;
    let inputs = vec![
        view.input("password", "New Password", "password")
            .placeholder("********"),
        view.input("confirm_password", "Confirm New Password", "password")
            .placeholder("********"),
    ];

    view! {
        <Card title="Reset Password" description="Enter a new password and the confirmation below.">
            <PostForm
                action=action
                form_id=form_id
                inputs=inputs
                disabled=disabled
                submit="Reset Password"
            />
        </Card>
    }
    .into_any()
}

#[must_use]
pub fn account(view: &FormView<'_>, email: &str, phone: &str) -> AnyView {
    let inputs = vec![
        view.input("email", "Email", "email")
            .value(email)
            .placeholder("m@acme.com"),
        view.input("phone", "Phone", "tel").value(phone),
        view.input("password", "New Password", "password")
            .placeholder("********"),
        view.input("confirm_password", "Confirm New Password", "password")
            .placeholder("********"),
    ];

    view! {
        <PostForm
            action="/settings/account"
            form_id=view.form_id
            inputs=inputs
            disabled=view.disabled
            submit="Update account"
        />
    }
    .into_any()
}

pub struct ProfileFields<'a> {
    pub username: &'a str,
    pub full_name: &'a str,
    pub website: &'a str,
}

impl<'a> ProfileFields<'a> {
    /// Values of the stored profile, empty for missing columns.
    #[must_use]
    pub fn from_user(user: Option<&'a User>) -> Self {
        Self {
            username: user.and_then(|user| user.username.as_deref()).unwrap_or_default(),
            full_name: user.and_then(|user| user.name.as_deref()).unwrap_or_default(),
            website: user.and_then(|user| user.website.as_deref()).unwrap_or_default(),
        }
    }
}

#[component]
fn LargeAvatar(avatar: Option<String>, name: Option<String>) -> impl IntoView {
    match avatar {
        Some(src) => {
            let alt = name.unwrap_or_default();
            view! { <img class="avatar avatar-lg" src=src alt=alt/> }.into_any()
        }
        None => {
            let initials = initials(name.as_deref());
            view! { <span class="avatar avatar-lg">{initials}</span> }.into_any()
        }
    }
}

#[must_use]
pub fn profile(view: &FormView<'_>, user: Option<&User>, fields: &ProfileFields<'_>) -> AnyView {
    let avatar = user.and_then(|user| user.avatar.clone());
    let name = user.and_then(|user| user.name.clone());
    let inputs = vec![
        view.input("avatar", "Avatar", "file"),
        view.input("username", "Username", "text")
            .value(fields.username)
            .placeholder("username"),
        view.input("full_name", "Full Name", "text")
            .value(fields.full_name)
            .placeholder("Full Name"),
        view.input("website", "Website", "url")
            .value(fields.website)
            .placeholder("https://www.example.com"),
    ];

    view! {
        <div class="profile-avatar">
            <LargeAvatar avatar=avatar name=name/>
        </div>
        <PostForm
            action="/settings/profile"
            form_id=view.form_id
            multipart=true
            inputs=inputs
            disabled=view.disabled
            submit="Update profile"
        />
    }
    .into_any()
}
