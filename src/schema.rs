//! Form input validation.
//!
//! Every form deserializes into an `*Input` struct holding the raw strings, and
//! `validate` turns it into the normalized values handed to the backend or into
//! [`FieldErrors`]. A field may collect several messages; pages show the first.

use crate::backend::{Credentials, Upload, UserAttributes};
use regex::Regex;
use serde::Deserialize;
use url::Url;

pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_EMAIL: &str = "Invalid email";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
const PASSWORDS_DO_NOT_MATCH: &str = "Passwords don't match";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validation failures in the order they were found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    /// Returns `self` when at least one field failed.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn check_email(errors: &mut FieldErrors, field: &'static str, value: &str) -> String {
    let email = value.trim();
    if !valid_email(email) {
        errors.push(field, INVALID_EMAIL);
    }
    email.to_string()
}

fn check_min(errors: &mut FieldErrors, field: &'static str, value: &str, min: usize, message: &str) {
    if value.chars().count() < min {
        errors.push(field, message);
    }
}

fn check_max(errors: &mut FieldErrors, field: &'static str, value: &str, max: usize, message: &str) {
    if value.chars().count() > max {
        errors.push(field, message);
    }
}

fn check_passwords_match(errors: &mut FieldErrors, password: Option<&str>, confirm: Option<&str>) {
    if password != confirm {
        errors.push("confirm_password", PASSWORDS_DO_NOT_MATCH);
    }
}

/// Empty form values stand for an absent optional field.
fn optional(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[derive(Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    /// # Errors
    /// Returns the field errors when the email is malformed.
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        errors.finish(Credentials {
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegistrationInput {
    /// # Errors
    /// Returns every field error found.
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        check_min(&mut errors, "password", &self.password, MIN_PASSWORD_LENGTH, PASSWORD_TOO_SHORT);
        check_min(
            &mut errors,
            "confirm_password",
            &self.confirm_password,
            MIN_PASSWORD_LENGTH,
            PASSWORD_TOO_SHORT,
        );
        check_passwords_match(
            &mut errors,
            Some(&self.password),
            Some(&self.confirm_password),
        );
        errors.finish(Credentials {
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForgotPasswordInput {
    #[serde(default)]
    pub email: String,
}

impl ForgotPasswordInput {
    /// Returns the normalized email.
    ///
    /// # Errors
    /// Returns the field errors when the email is malformed.
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        errors.finish(email)
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct ResetPasswordInput {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ResetPasswordInput {
    /// Returns the attributes setting the new password.
    ///
    /// # Errors
    /// Returns every field error found.
    pub fn validate(&self) -> Result<UserAttributes, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_min(&mut errors, "password", &self.password, MIN_PASSWORD_LENGTH, PASSWORD_TOO_SHORT);
        check_min(
            &mut errors,
            "confirm_password",
            &self.confirm_password,
            MIN_PASSWORD_LENGTH,
            PASSWORD_TOO_SHORT,
        );
        check_passwords_match(
            &mut errors,
            Some(&self.password),
            Some(&self.confirm_password),
        );
        errors.finish(UserAttributes::password(self.password.clone()))
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct AccountInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

impl AccountInput {
    /// # Errors
    /// Returns every field error found.
    pub fn validate(&self) -> Result<UserAttributes, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = check_email(&mut errors, "email", &self.email);
        let phone = self.phone.trim();
        check_min(
            &mut errors,
            "phone",
            phone,
            8,
            "String must contain at least 8 character(s)",
        );
        check_max(
            &mut errors,
            "phone",
            phone,
            15,
            "String must contain at most 15 character(s)",
        );

        let password = optional(self.password.as_deref());
        let confirm = optional(self.confirm_password.as_deref());
        if let Some(password) = password {
            check_min(&mut errors, "password", password, MIN_PASSWORD_LENGTH, PASSWORD_TOO_SHORT);
        }
        if let Some(confirm) = confirm {
            check_min(&mut errors, "confirm_password", confirm, MIN_PASSWORD_LENGTH, PASSWORD_TOO_SHORT);
        }
        check_passwords_match(&mut errors, password, confirm);

        errors.finish(UserAttributes {
            email: Some(email),
            phone: Some(phone.to_string()),
            password: password.map(str::to_string),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub website: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileValues {
    pub username: String,
    pub full_name: String,
    pub website: Option<String>,
    pub avatar: Option<Upload>,
}

impl ProfileInput {
    /// # Errors
    /// Returns every field error found, including a non-image avatar.
    pub fn validate(&self, avatar: Option<Upload>) -> Result<ProfileValues, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_min(
            &mut errors,
            "username",
            &self.username,
            2,
            "Username must be at least 2 characters.",
        );
        check_max(
            &mut errors,
            "username",
            &self.username,
            30,
            "Username must not be longer than 30 characters.",
        );
        check_min(&mut errors, "full_name", &self.full_name, 1, "Full Name cannot be empty.");

        let website = optional(Some(self.website.trim()));
        if let Some(website) = website {
            let valid = Url::parse(website)
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
            if !valid {
                errors.push("website", "Website URL must be valid.");
            }
        }

        if let Some(upload) = &avatar {
            if !upload.content_type.starts_with("image/") {
                errors.push("avatar", "Avatar must be an image.");
            }
        }

        errors.finish(ProfileValues {
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            website: website.map(str::to_string),
            avatar,
        })
    }
}
