use crate::{
    cli::{
        actions::{server::Args, Action},
        commands::{self, backend, site, telemetry},
    },
    config::{Config, RawConfig},
};
use anyhow::Result;

/// Collect every configuration value from the parsed arguments, unvalidated.
#[must_use]
pub fn raw_config(matches: &clap::ArgMatches) -> RawConfig {
    let backend = backend::Options::parse(matches);
    let site = site::Options::parse(matches);
    let telemetry = telemetry::Options::parse(matches);

    RawConfig {
        supabase_url: backend.url,
        supabase_anon_key: backend.anon_key,
        app_name: site.app_name,
        app_description: site.app_description,
        site_url: site.site_url,
        aptabase_app_key: site.aptabase_app_key,
        otlp_endpoint: telemetry.endpoint,
        otlp_access_token: telemetry.access_token,
    }
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches, config: Config) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);

    Ok(Action::Server(Args { port, config }))
}
