use super::{render, Page};
use crate::config::AppMeta;
use crate::forms::Notification;
use crate::user::{CurrentUser, User};
use leptos::prelude::*;

const NAVIGATION: &[(&str, &str)] = &[("/", "Dashboard"), ("/settings/profile", "Settings")];

const SETTINGS_NAVIGATION: &[(&str, &str)] = &[
    ("/settings/profile", "Profile"),
    ("/settings/account", "Account"),
    ("/settings/appearance", "Appearance"),
    ("/settings/notifications", "Notifications"),
    ("/settings/display", "Display"),
];

/// The dashboard frame around a page: sidebar, navigation and the user card.
pub struct Shell<'a> {
    pub app: &'a AppMeta,
    pub current: &'a CurrentUser,
    pub sidebar_open: bool,
    pub path: &'a str,
}

impl Shell<'_> {
    /// Render `content` inside the shell. The notification of the user load, if
    /// any, is shown when the page has none of its own.
    #[must_use]
    pub fn render(&self, title: &str, notification: Option<&Notification>, content: AnyView) -> String {
        let notification = notification.or(self.current.notification.as_ref());
        let state = if self.sidebar_open { "expanded" } else { "collapsed" };
        let app_name = self.app.name.clone();
        let path = self.path.to_string();
        let user = self.current.user.clone();
        let loading = self.current.loading;

        let body = view! {
            <div class="layout" data-sidebar=state>
                <aside class="sidebar">
                    <header><a href="/">{app_name}</a></header>
                    <nav>
                        <NavLinks items=NAVIGATION path=path exact=false/>
                    </nav>
                    <footer>
                        <UserCard user=user loading=loading/>
                    </footer>
                </aside>
                <main>
                    <form method="post" action="/sidebar">
                        <button type="submit" class="sidebar-trigger" aria-label="Toggle sidebar">
                            "\u{2630}"
                        </button>
                    </form>
                    {content}
                </main>
            </div>
        }
        .into_any();

        render(Page {
            title,
            app: self.app,
            notification,
            body,
        })
    }
}

#[component]
fn NavLinks(items: &'static [(&'static str, &'static str)], path: String, exact: bool) -> impl IntoView {
    items
        .iter()
        .map(|&(href, label)| {
            let active = if exact {
                path == href
            } else if href == "/" {
                path == "/"
            } else {
                path.starts_with(href.trim_end_matches("/profile"))
            };
            let current = active.then_some("page");
            view! { <a href=href aria-current=current>{label}</a> }
        })
        .collect_view()
}

#[component]
fn Avatar(user: User) -> impl IntoView {
    match user.avatar.clone() {
        Some(src) => {
            let alt = user.name.clone().unwrap_or_default();
            view! { <img class="avatar" src=src alt=alt/> }.into_any()
        }
        None => {
            let initials = user.initials();
            view! { <span class="avatar">{initials}</span> }.into_any()
        }
    }
}

#[component]
fn LogoutForm() -> impl IntoView {
    view! {
        <form method="post" action="/logout">
            <button type="submit">"Log out"</button>
        </form>
    }
}

/// Avatar, name and email of the signed-in user. A placeholder while loading.
#[component]
fn UserCard(user: Option<User>, loading: bool) -> impl IntoView {
    match user {
        Some(user) => {
            let name = user.name.clone().unwrap_or_default();
            let email = user.email.clone().unwrap_or_default();
            view! {
                <div class="user-card">
                    <Avatar user=user/>
                    <div>
                        <div class="user-name">{name}</div>
                        <div class="user-email">{email}</div>
                    </div>
                </div>
                <LogoutForm/>
            }
            .into_any()
        }
        None if loading => view! { <div class="user-card loading"></div> }.into_any(),
        None => view! { <LogoutForm/> }.into_any(),
    }
}

/// The settings area: heading, section navigation and the section content.
#[must_use]
pub fn settings(
    path: &str,
    title: &'static str,
    description: &'static str,
    content: AnyView,
) -> AnyView {
    view! {
        <section class="settings">
            <header>
                <h2>"Settings"</h2>
                <p>"Manage your account settings and set e-mail preferences."</p>
            </header>
            <nav class="settings-nav">
                <NavLinks items=SETTINGS_NAVIGATION path=path.to_string() exact=true/>
            </nav>
            <div class="settings-content">
                <h3>{title}</h3>
                <p>{description}</p>
                <hr/>
                {content}
            </div>
        </section>
    }
    .into_any()
}
