use crate::config::{ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL};
use clap::{Arg, ArgMatches, Command};

pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_SUPABASE_ANON_KEY: &str = "supabase-anon-key";

/// Backend project location and its public API key.
#[derive(Clone, Default)]
pub struct Options {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            url: matches.get_one::<String>(ARG_SUPABASE_URL).cloned(),
            anon_key: matches.get_one::<String>(ARG_SUPABASE_ANON_KEY).cloned(),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Backend project URL, example: https://<project>.supabase.co")
                .env(ENV_SUPABASE_URL),
        )
        .arg(
            Arg::new(ARG_SUPABASE_ANON_KEY)
                .long(ARG_SUPABASE_ANON_KEY)
                .help("Backend anon (public) API key")
                .env(ENV_SUPABASE_ANON_KEY)
                .hide_env_values(true),
        )
}
