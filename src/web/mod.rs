//! HTTP surface: router, shared state and server lifecycle.

pub mod flash;
pub mod handlers;
pub mod views;

#[cfg(test)]
mod tests;

use crate::analytics::EventTracker;
use crate::backend::{client, Backend, CookieMode, SessionClient};
use crate::config::Config;
use crate::forms::InFlight;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use handlers::{auth, dashboard, health, session, settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

/// Largest accepted profile form, avatar included.
pub const AVATAR_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Everything a handler needs, shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
    pub in_flight: InFlight,
    pub events: Arc<dyn EventTracker>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn Backend>,
        events: Arc<dyn EventTracker>,
    ) -> Self {
        Self {
            config,
            backend,
            in_flight: InFlight::default(),
            events,
        }
    }

    /// A backend client for the session carried by `headers`.
    #[must_use]
    pub fn session_client(&self, headers: &HeaderMap, mode: CookieMode) -> SessionClient {
        client::server(self.backend.clone(), &self.config, headers, mode)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let dashboard = Router::new()
        .route("/", get(dashboard::index))
        .route("/settings", get(settings::index))
        .route(
            settings::PROFILE_PATH,
            get(settings::profile_page)
                .post(settings::update_profile)
                .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route(
            settings::ACCOUNT_PATH,
            get(settings::account_page).post(settings::update_account),
        )
        .route("/settings/appearance", get(settings::appearance))
        .route("/settings/display", get(settings::display))
        .route("/settings/notifications", get(settings::notifications))
        .route_layer(middleware::from_fn(session::require_session));

    Router::new()
        .merge(dashboard)
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route("/auth/confirm", get(auth::confirm))
        .route("/logout", post(dashboard::logout))
        .route("/sidebar", post(dashboard::toggle_sidebar))
        .route("/health", get(health::health).options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state))
                .layer(middleware::from_fn(session::refresh_session)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
