//! Server-rendered HTML.
//!
//! Views are leptos components rendered to a string once per response. Text and
//! attribute values are escaped by the renderer.

pub mod forms;
pub mod shell;

use crate::config::AppMeta;
use crate::forms::{Notification, NotificationKind};
use leptos::prelude::*;

/// A complete document: head metadata, the page notification and `body`.
pub struct Page<'a> {
    pub title: &'a str,
    pub app: &'a AppMeta,
    pub notification: Option<&'a Notification>,
    pub body: AnyView,
}

#[must_use]
pub fn render(page: Page<'_>) -> String {
    let Page {
        title,
        app,
        notification,
        body,
    } = page;
    let html = view! {
        <Document title={title.to_string()} app={app.clone()} notification={notification.cloned()}>
            {body}
        </Document>
    }
    .to_html();
    format!("<!DOCTYPE html>{html}")
}

#[component]
fn Document(
    title: String,
    app: AppMeta,
    notification: Option<Notification>,
    children: Children,
) -> impl IntoView {
    let heading = format!("{title} | {}", app.name);
    let description = app
        .description
        .map(|description| view! { <meta name="description" content=description/> });

    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{heading}</title>
                {description}
            </head>
            <body>
                {notification.map(|notification| view! { <Toast notification=notification/> })}
                {children()}
            </body>
        </html>
    }
}

/// Success or error banner.
#[component]
pub fn Toast(notification: Notification) -> impl IntoView {
    let (class, role) = match notification.kind {
        NotificationKind::Success => ("toast toast-success", "status"),
        NotificationKind::Error => ("toast toast-error", "alert"),
    };

    view! { <div class=class role=role>{notification.message}</div> }
}

/// A centered card, used by the authentication pages.
#[component]
pub fn Card(title: &'static str, description: &'static str, children: Children) -> impl IntoView {
    view! {
        <main class="auth">
            <section class="card">
                <header>
                    <h1>{title}</h1>
                    <p>{description}</p>
                </header>
                {children()}
            </section>
        </main>
    }
}
