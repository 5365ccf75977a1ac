//! # Portal (account front end for a hosted auth backend)
//!
//! `portal` renders the login, registration and password recovery pages plus an
//! authenticated settings area. It owns no user data: identities, sessions,
//! profile rows and avatar files all live in a Supabase-compatible
//! backend-as-a-service reached over HTTPS.
//!
//! ## Request flow
//!
//! 1. **Validate:** a form POST is checked against its schema ([`schema`]). Invalid
//!    input is rendered back with per-field messages and never reaches the backend.
//! 2. **Guard:** the submission takes the in-flight slot of its form instance
//!    ([`forms::InFlight`]); a repeated activation of the same form is rejected
//!    until the first one resolves.
//! 3. **Call:** exactly one backend operation runs ([`backend::Backend`]), except the
//!    profile form which may upload an avatar before the row upsert.
//! 4. **Report:** the outcome is a single notification, optionally followed by a
//!    redirect that carries the notification in a flash cookie.
//!
//! ## Sessions
//!
//! Session tokens are issued by the backend and stored in the backend's own
//! cookie (`sb-<project>-auth-token`). The server never mints tokens; it only
//! forwards them through [`backend::SessionClient`], which is created per request
//! and passed explicitly to the code that needs it.

pub mod analytics;
pub mod backend;
pub mod cli;
pub mod config;
pub mod forms;
pub mod schema;
pub mod session;
pub mod user;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
