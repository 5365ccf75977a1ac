use crate::{
    analytics,
    backend::client,
    cli::telemetry,
    config::Config,
    web::{self, AppState},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: Config,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the backend client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Startup config: {:?}", args.config);
    info!(
        port = args.port,
        backend = %args.config.supabase_url(),
        analytics = args.config.aptabase_app_key().is_some(),
        "starting {}",
        args.config.app().name
    );

    let backend = client::browser(&args.config).context("Could not create backend client")?;
    let events = analytics::tracker(args.config.aptabase_app_key());
    let state = AppState::new(Arc::new(args.config), backend, events);

    let result = web::serve(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}
