use crate::config::{ENV_OTLP_ACCESS_TOKEN, ENV_OTLP_ENDPOINT};
use clap::{Arg, ArgMatches, Command};

pub const ARG_OTLP_ENDPOINT: &str = "otlp-endpoint";
pub const ARG_OTLP_ACCESS_TOKEN: &str = "otlp-access-token";

#[derive(Clone, Default)]
pub struct Options {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            endpoint: matches.get_one::<String>(ARG_OTLP_ENDPOINT).cloned(),
            access_token: matches.get_one::<String>(ARG_OTLP_ACCESS_TOKEN).cloned(),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OTLP_ENDPOINT)
                .long(ARG_OTLP_ENDPOINT)
                .help("OTLP/gRPC collector endpoint, spans are only exported when set")
                .env(ENV_OTLP_ENDPOINT),
        )
        .arg(
            Arg::new(ARG_OTLP_ACCESS_TOKEN)
                .long(ARG_OTLP_ACCESS_TOKEN)
                .help("Access token sent to the collector as signoz-access-token")
                .env(ENV_OTLP_ACCESS_TOKEN)
                .hide_env_values(true),
        )
}
