use crate::config::{ENV_APP_DESCRIPTION, ENV_APP_NAME, ENV_APTABASE_APP_KEY, ENV_SITE_URL};
use clap::{Arg, ArgMatches, Command};

pub const ARG_APP_NAME: &str = "app-name";
pub const ARG_APP_DESCRIPTION: &str = "app-description";
pub const ARG_SITE_URL: &str = "site-url";
pub const ARG_APTABASE_APP_KEY: &str = "aptabase-app-key";

#[derive(Clone, Debug, Default)]
pub struct Options {
    pub app_name: Option<String>,
    pub app_description: Option<String>,
    pub site_url: Option<String>,
    pub aptabase_app_key: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let read = |id: &str| matches.get_one::<String>(id).cloned();
        Self {
            app_name: read(ARG_APP_NAME),
            app_description: read(ARG_APP_DESCRIPTION),
            site_url: read(ARG_SITE_URL),
            aptabase_app_key: read(ARG_APTABASE_APP_KEY),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_NAME)
                .long(ARG_APP_NAME)
                .help("Application name shown in page titles")
                .env(ENV_APP_NAME),
        )
        .arg(
            Arg::new(ARG_APP_DESCRIPTION)
                .long(ARG_APP_DESCRIPTION)
                .help("Application description for the page metadata")
                .env(ENV_APP_DESCRIPTION),
        )
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Public root URL of this site (no path), used in password recovery links")
                .env(ENV_SITE_URL),
        )
        .arg(
            Arg::new(ARG_APTABASE_APP_KEY)
                .long(ARG_APTABASE_APP_KEY)
                .help("Aptabase app key (A-US-*, A-EU-* or A-DEV-*), enables login analytics")
                .env(ENV_APTABASE_APP_KEY),
        )
}
