use crate::cli::{
    actions::Action,
    commands::{self, logging::ARG_VERBOSITY},
    dispatch::{handler, raw_config},
    telemetry,
};
use anyhow::Result;
use tracing::{error, Level};

fn get_verbosity_level(matches: &clap::ArgMatches) -> Option<Level> {
    let level = match matches.get_one::<u8>(ARG_VERBOSITY).map_or(0, |&v| v) {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    Some(level)
}

/// Start the CLI
/// # Errors
/// Returns an error if the configuration is invalid or logging cannot be initialized.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity_level = get_verbosity_level(&matches);

    match raw_config(&matches).validate() {
        Ok(config) => {
            telemetry::init(verbosity_level, config.telemetry(), &config.app().name)?;
            handler(&matches, config)
        }
        Err(err) => {
            telemetry::init(verbosity_level, None, env!("CARGO_PKG_NAME"))?;
            for violation in err.violations() {
                error!(variable = violation.variable, "{}", violation.message);
            }
            Err(err.into())
        }
    }
}
