//! Process-wide configuration.
//!
//! Values arrive as raw strings (CLI flags or their environment variables) and are
//! validated once at startup. Validation collects every violation instead of stopping
//! at the first one so an operator can fix a broken deployment in a single pass.
//! The resulting [`Config`] is immutable and shared behind an `Arc`.

use regex::Regex;
use secrecy::SecretString;
use std::fmt;
use url::Url;

pub const ENV_SUPABASE_URL: &str = "PORTAL_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "PORTAL_SUPABASE_ANON_KEY";
pub const ENV_APP_NAME: &str = "PORTAL_APP_NAME";
pub const ENV_APP_DESCRIPTION: &str = "PORTAL_APP_DESCRIPTION";
pub const ENV_SITE_URL: &str = "PORTAL_SITE_URL";
pub const ENV_APTABASE_APP_KEY: &str = "PORTAL_APTABASE_APP_KEY";
pub const ENV_OTLP_ENDPOINT: &str = "PORTAL_OTLP_ENDPOINT";
pub const ENV_OTLP_ACCESS_TOKEN: &str = "PORTAL_OTLP_ACCESS_TOKEN";

/// Unvalidated configuration as read from the command line and environment.
#[derive(Clone, Default)]
pub struct RawConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub app_name: Option<String>,
    pub app_description: Option<String>,
    pub site_url: Option<String>,
    pub aptabase_app_key: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub otlp_access_token: Option<String>,
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &self.supabase_anon_key.as_ref().map(|_| "***"))
            .field("app_name", &self.app_name)
            .field("app_description", &self.app_description)
            .field("site_url", &self.site_url)
            .field("aptabase_app_key", &self.aptabase_app_key)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .field("otlp_access_token", &self.otlp_access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A single configuration problem, keyed by the environment variable that carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub variable: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variable, self.message)
    }
}

#[derive(Debug)]
pub struct ConfigError {
    violations: Vec<Violation>,
}

impl ConfigError {
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self
            .violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(
            f,
            "invalid configuration ({} violation(s)): {list}",
            self.violations.len()
        )
    }
}

impl std::error::Error for ConfigError {}

/// Application metadata rendered into every page head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppMeta {
    pub name: String,
    pub description: Option<String>,
}

/// OTLP span export target.
#[derive(Clone)]
pub struct TelemetryConfig {
    pub endpoint: Url,
    pub access_token: Option<SecretString>,
}

impl fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    supabase_url: Url,
    supabase_anon_key: SecretString,
    app: AppMeta,
    site_url: Option<Url>,
    aptabase_app_key: Option<String>,
    telemetry: Option<TelemetryConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url.as_str())
            .field("supabase_anon_key", &"***")
            .field("app", &self.app)
            .field("site_url", &self.site_url.as_ref().map(Url::as_str))
            .field("aptabase_app_key", &self.aptabase_app_key)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl Config {
    #[must_use]
    pub fn supabase_url(&self) -> &Url {
        &self.supabase_url
    }

    #[must_use]
    pub fn supabase_anon_key(&self) -> &SecretString {
        &self.supabase_anon_key
    }

    #[must_use]
    pub fn app(&self) -> &AppMeta {
        &self.app
    }

    #[must_use]
    pub fn site_url(&self) -> Option<&Url> {
        self.site_url.as_ref()
    }

    #[must_use]
    pub fn aptabase_app_key(&self) -> Option<&str> {
        self.aptabase_app_key.as_deref()
    }

    #[must_use]
    pub fn telemetry(&self) -> Option<&TelemetryConfig> {
        self.telemetry.as_ref()
    }

    /// Cookies are only marked `Secure` when the public site is served over HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.site_url
            .as_ref()
            .is_some_and(|url| url.scheme() == "https")
    }
}

impl RawConfig {
    /// Validate every field and build the immutable [`Config`].
    ///
    /// # Errors
    /// Returns a [`ConfigError`] listing all violations found.
    pub fn validate(self) -> Result<Config, ConfigError> {
        let mut violations = Vec::new();

        let supabase_url = match normalize(self.supabase_url) {
            Some(value) => http_url(ENV_SUPABASE_URL, &value, &mut violations),
            None => {
                violations.push(missing(ENV_SUPABASE_URL));
                None
            }
        };

        let supabase_anon_key = normalize(self.supabase_anon_key);
        if supabase_anon_key.is_none() {
            violations.push(missing(ENV_SUPABASE_ANON_KEY));
        }

        let app_name = normalize(self.app_name);
        if app_name.is_none() {
            violations.push(missing(ENV_APP_NAME));
        }

        let site_url = normalize(self.site_url)
            .and_then(|value| http_url(ENV_SITE_URL, &value, &mut violations))
            .and_then(|url| site_root(url, &mut violations));

        let aptabase_app_key = normalize(self.aptabase_app_key);
        if let Some(key) = &aptabase_app_key {
            if !valid_aptabase_key(key) {
                violations.push(Violation {
                    variable: ENV_APTABASE_APP_KEY,
                    message: format!("expected A-US-<id>, A-EU-<id> or A-DEV-<id>, got {key}"),
                });
            }
        }

        let otlp_endpoint_raw = normalize(self.otlp_endpoint);
        let otlp_access_token = normalize(self.otlp_access_token);
        if otlp_access_token.is_some() && otlp_endpoint_raw.is_none() {
            violations.push(Violation {
                variable: ENV_OTLP_ACCESS_TOKEN,
                message: format!("requires {ENV_OTLP_ENDPOINT}"),
            });
        }
        let otlp_endpoint = otlp_endpoint_raw
            .and_then(|value| http_url(ENV_OTLP_ENDPOINT, &value, &mut violations));

        match (supabase_url, supabase_anon_key, app_name) {
            (Some(supabase_url), Some(anon_key), Some(name)) if violations.is_empty() => {
                Ok(Config {
                    supabase_url,
                    supabase_anon_key: SecretString::from(anon_key),
                    app: AppMeta {
                        name,
                        description: normalize(self.app_description),
                    },
                    site_url,
                    aptabase_app_key,
                    telemetry: otlp_endpoint.map(|endpoint| TelemetryConfig {
                        endpoint,
                        access_token: otlp_access_token.map(SecretString::from),
                    }),
                })
            }
            _ => Err(ConfigError { violations }),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn missing(variable: &'static str) -> Violation {
    Violation {
        variable,
        message: "required value is missing or empty".to_string(),
    }
}

fn http_url(variable: &'static str, value: &str, violations: &mut Vec<Violation>) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Some(url)
        }
        Ok(url) => {
            violations.push(Violation {
                variable,
                message: format!("expected an http(s) URL with a host, got scheme {}", url.scheme()),
            });
            None
        }
        Err(err) => {
            violations.push(Violation {
                variable,
                message: format!("invalid URL {value}: {err}"),
            });
            None
        }
    }
}

// Routes are mounted at the root, so links built from the site URL are too.
fn site_root(url: Url, violations: &mut Vec<Violation>) -> Option<Url> {
    if url.path() == "/" && url.query().is_none() && url.fragment().is_none() {
        return Some(url);
    }
    violations.push(Violation {
        variable: ENV_SITE_URL,
        message: format!("expected the site root without a path or query, got {url}"),
    });
    None
}

fn valid_aptabase_key(key: &str) -> bool {
    Regex::new(r"^A-(US|EU|DEV)-\d+$").is_ok_and(|regex| regex.is_match(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn raw() -> RawConfig {
        RawConfig {
            supabase_url: Some("https://abcdefgh.supabase.co".to_string()),
            supabase_anon_key: Some("anon-key".to_string()),
            app_name: Some("Portal".to_string()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        let config = raw().validate();
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.supabase_url().as_str(), "https://abcdefgh.supabase.co/");
            assert_eq!(config.supabase_anon_key().expose_secret(), "anon-key");
            assert_eq!(config.app().name, "Portal");
            assert_eq!(config.app().description, None);
            assert!(config.telemetry().is_none());
            assert!(!config.secure_cookies());
        }
    }

    #[test]
    fn validate_reports_every_violation() {
        let result = RawConfig {
            supabase_url: Some("not a url".to_string()),
            supabase_anon_key: Some("   ".to_string()),
            app_name: None,
            otlp_endpoint: Some("ftp://collector".to_string()),
            ..RawConfig::default()
        }
        .validate();

        let Err(err) = result else {
            panic!("expected validation to fail");
        };
        let variables: Vec<_> = err.violations().iter().map(|v| v.variable).collect();
        assert_eq!(
            variables,
            vec![
                ENV_SUPABASE_URL,
                ENV_SUPABASE_ANON_KEY,
                ENV_APP_NAME,
                ENV_OTLP_ENDPOINT
            ]
        );
        assert!(err.to_string().contains("4 violation(s)"));
    }

    #[test]
    fn validate_rejects_non_http_backend_url() {
        let mut config = raw();
        config.supabase_url = Some("mailto:ops@example.com".to_string());
        let Err(err) = config.validate() else {
            panic!("expected validation to fail");
        };
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].variable, ENV_SUPABASE_URL);
    }

    #[test]
    fn validate_rejects_site_url_with_path() {
        let mut config = raw();
        config.site_url = Some("https://portal.example.com/app/".to_string());
        let Err(err) = config.validate() else {
            panic!("expected validation to fail");
        };
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].variable, ENV_SITE_URL);

        let mut config = raw();
        config.site_url = Some("https://portal.example.com/".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_keeps_optional_values() {
        let mut config = raw();
        config.app_description = Some("  Account settings  ".to_string());
        config.site_url = Some("https://portal.example.com".to_string());
        config.aptabase_app_key = Some("A-US-9694108634".to_string());
        config.otlp_endpoint = Some("https://ingest.signoz.example:443".to_string());
        config.otlp_access_token = Some("token".to_string());

        let Ok(config) = config.validate() else {
            panic!("expected validation to pass");
        };
        assert_eq!(config.app().description.as_deref(), Some("Account settings"));
        assert!(config.secure_cookies());
        assert_eq!(config.aptabase_app_key(), Some("A-US-9694108634"));
        assert!(config
            .telemetry()
            .is_some_and(|telemetry| telemetry.access_token.is_some()));
    }

    #[test]
    fn validate_rejects_malformed_aptabase_key() {
        let mut config = raw();
        config.aptabase_app_key = Some("not-a-key".to_string());
        let Err(err) = config.validate() else {
            panic!("expected validation to fail");
        };
        assert_eq!(err.violations()[0].variable, ENV_APTABASE_APP_KEY);
    }

    #[test]
    fn validate_requires_endpoint_for_access_token() {
        let mut config = raw();
        config.otlp_access_token = Some("token".to_string());
        let Err(err) = config.validate() else {
            panic!("expected validation to fail");
        };
        assert_eq!(err.violations()[0].variable, ENV_OTLP_ACCESS_TOKEN);
    }

    #[test]
    fn debug_redacts_secrets() {
        let Ok(config) = raw().validate() else {
            panic!("expected validation to pass");
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("anon-key"));
        assert!(debug.contains("***"));
    }
}
