//! Environment-driven application configuration.
//!
//! Every setting has a default except the Supabase credentials. Missing or
//! placeholder credentials select fixture mode: in-memory reports and a
//! scripted sign-in, nothing persisted.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mockable::Env;
use tracing::warn;
use url::Url;

use crate::domain::map::style::DEFAULT_STYLE_URL;

const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
const SUPABASE_KEY_ENV: &str = "SUPABASE_KEY";
const IP_LOOKUP_URL_ENV: &str = "CAMPUS_TRACE_IP_LOOKUP_URL";
const IP_LOOKUP_TIMEOUT_ENV: &str = "CAMPUS_TRACE_IP_LOOKUP_TIMEOUT_MS";
const HTTP_TIMEOUT_ENV: &str = "CAMPUS_TRACE_HTTP_TIMEOUT_SECS";
const MAP_STYLE_URL_ENV: &str = "CAMPUS_TRACE_MAP_STYLE_URL";
const SESSION_FILE_ENV: &str = "CAMPUS_TRACE_SESSION_FILE";
const OAUTH_PORT_ENV: &str = "CAMPUS_TRACE_OAUTH_PORT";
const OAUTH_TIMEOUT_ENV: &str = "CAMPUS_TRACE_OAUTH_TIMEOUT_SECS";
const DEV_EMAIL_ENV: &str = "CAMPUS_TRACE_DEV_EMAIL";

const PLACEHOLDER_URL: &str = "your_supabase_project_url";
const PLACEHOLDER_KEY: &str = "your_supabase_anon_key";

const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";
const DEFAULT_IP_LOOKUP_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OAUTH_PORT: u16 = 54_321;
const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DEV_EMAIL: &str = "student@campus.invalid";
const SESSION_FILE_SUFFIX: &str = ".config/campus-trace/session.json";

const URL_EXPECTED: &str = "an absolute http(s) URL";
const MILLIS_EXPECTED: &str = "a positive number of milliseconds";
const SECS_EXPECTED: &str = "a positive number of seconds";
const PORT_EXPECTED: &str = "a TCP port between 1 and 65535";

/// Errors raised while validating configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Where reports and sign-in are served from.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendMode {
    /// A configured Supabase project.
    Supabase {
        /// Project base URL.
        url: Url,
        /// Anon API key.
        key: String,
    },
    /// In-memory stand-ins; nothing survives the process.
    Fixture,
}

impl fmt::Debug for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", &url.as_str())
                .field("key", &"<redacted>")
                .finish(),
            Self::Fixture => f.write_str("Fixture"),
        }
    }
}

/// Validated application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend selection.
    pub backend: BackendMode,
    /// Public IP lookup endpoint.
    pub ip_lookup_url: Url,
    /// Budget for one IP lookup.
    pub ip_lookup_timeout: Duration,
    /// Request timeout for backend calls.
    pub http_timeout: Duration,
    /// Basemap style document.
    pub map_style_url: Url,
    /// Where the signed-in session is persisted.
    pub session_file: PathBuf,
    /// Loopback port receiving the OAuth redirect.
    pub oauth_port: u16,
    /// How long an interactive sign-in may take.
    pub oauth_timeout: Duration,
    /// Identity email used by the fixture sign-in.
    pub dev_email: String,
}

impl AppConfig {
    /// Read and validate settings from `env`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use campus_trace::config::{AppConfig, BackendMode};
    /// use mockable::MockEnv;
    ///
    /// let mut env = MockEnv::new();
    /// env.expect_string().returning(|name| match name {
    ///     "HOME" => Some("/home/ada".to_owned()),
    ///     _ => None,
    /// });
    ///
    /// let config = AppConfig::from_env(&env).expect("defaults are valid");
    /// assert_eq!(config.backend, BackendMode::Fixture);
    /// assert_eq!(config.oauth_port, 54321);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for malformed URLs and numbers.
    pub fn from_env<E: Env>(env: &E) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: backend_from_env(env)?,
            ip_lookup_url: url_from_env(env, IP_LOOKUP_URL_ENV, DEFAULT_IP_LOOKUP_URL)?,
            ip_lookup_timeout: Duration::from_millis(positive_from_env(
                env,
                IP_LOOKUP_TIMEOUT_ENV,
                DEFAULT_IP_LOOKUP_TIMEOUT_MS,
                MILLIS_EXPECTED,
            )?),
            http_timeout: Duration::from_secs(positive_from_env(
                env,
                HTTP_TIMEOUT_ENV,
                DEFAULT_HTTP_TIMEOUT_SECS,
                SECS_EXPECTED,
            )?),
            map_style_url: url_from_env(env, MAP_STYLE_URL_ENV, DEFAULT_STYLE_URL)?,
            session_file: session_file_from_env(env),
            oauth_port: positive_from_env(env, OAUTH_PORT_ENV, DEFAULT_OAUTH_PORT, PORT_EXPECTED)?,
            oauth_timeout: Duration::from_secs(positive_from_env(
                env,
                OAUTH_TIMEOUT_ENV,
                DEFAULT_OAUTH_TIMEOUT_SECS,
                SECS_EXPECTED,
            )?),
            dev_email: non_empty(env, DEV_EMAIL_ENV).unwrap_or_else(|| DEFAULT_DEV_EMAIL.to_owned()),
        })
    }
}

fn backend_from_env<E: Env>(env: &E) -> Result<BackendMode, ConfigError> {
    let url = non_empty(env, SUPABASE_URL_ENV).filter(|value| value != PLACEHOLDER_URL);
    let key = non_empty(env, SUPABASE_KEY_ENV).filter(|value| value != PLACEHOLDER_KEY);
    let (Some(url), Some(key)) = (url, key) else {
        warn!("Supabase is not configured; running with in-memory data (no persistence)");
        return Ok(BackendMode::Fixture);
    };
    let url = parse_url(SUPABASE_URL_ENV, url)?;
    Ok(BackendMode::Supabase { url, key })
}

fn session_file_from_env<E: Env>(env: &E) -> PathBuf {
    if let Some(path) = non_empty(env, SESSION_FILE_ENV) {
        return PathBuf::from(path);
    }
    match non_empty(env, "HOME") {
        Some(home) => PathBuf::from(home).join(SESSION_FILE_SUFFIX),
        None => {
            warn!("HOME not set; keeping the session file in the working directory");
            PathBuf::from("campus-trace-session.json")
        }
    }
}

fn url_from_env<E: Env>(
    env: &E,
    name: &'static str,
    default: &str,
) -> Result<Url, ConfigError> {
    let value = non_empty(env, name).unwrap_or_else(|| default.to_owned());
    parse_url(name, value)
}

fn parse_url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value,
            expected: URL_EXPECTED,
        }),
    }
}

fn positive_from_env<E, T>(
    env: &E,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    E: Env,
    T: FromStr + PartialEq + Default,
{
    let Some(value) = non_empty(env, name) else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value,
            expected,
        }),
    }
}

fn non_empty<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for environment parsing.
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> MockEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_string()
            .returning(move |name| vars.get(name).cloned());
        env
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_env(&env_with(&[("HOME", "/home/ada")])).expect("config");

        assert_eq!(config.backend, BackendMode::Fixture);
        assert_eq!(
            config.ip_lookup_url.as_str(),
            "https://api.ipify.org/?format=json"
        );
        assert_eq!(config.ip_lookup_timeout, Duration::from_millis(3_000));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.map_style_url.as_str(), DEFAULT_STYLE_URL);
        assert_eq!(
            config.session_file,
            PathBuf::from("/home/ada/.config/campus-trace/session.json")
        );
        assert_eq!(config.oauth_port, 54_321);
        assert_eq!(config.oauth_timeout, Duration::from_secs(300));
        assert_eq!(config.dev_email, DEFAULT_DEV_EMAIL);
    }

    #[test]
    fn configured_credentials_select_supabase() {
        let config = AppConfig::from_env(&env_with(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_KEY", "anon"),
        ]))
        .expect("config");

        assert_eq!(
            config.backend,
            BackendMode::Supabase {
                url: Url::parse("https://project.supabase.co").expect("url"),
                key: "anon".to_owned(),
            }
        );
    }

    #[rstest]
    #[case(&[("SUPABASE_URL", "https://project.supabase.co")])]
    #[case(&[("SUPABASE_KEY", "anon")])]
    #[case(&[("SUPABASE_URL", "your_supabase_project_url"), ("SUPABASE_KEY", "anon")])]
    #[case(&[("SUPABASE_URL", "https://project.supabase.co"), ("SUPABASE_KEY", "your_supabase_anon_key")])]
    fn missing_or_placeholder_credentials_fall_back_to_fixtures(#[case] vars: &[(&str, &str)]) {
        let config = AppConfig::from_env(&env_with(vars)).expect("config");
        assert_eq!(config.backend, BackendMode::Fixture);
    }

    #[rstest]
    #[case(OAUTH_PORT_ENV, "0")]
    #[case(OAUTH_PORT_ENV, "70000")]
    #[case(HTTP_TIMEOUT_ENV, "ten")]
    #[case(IP_LOOKUP_TIMEOUT_ENV, "-5")]
    #[case(IP_LOOKUP_URL_ENV, "ftp://example.com")]
    #[case(MAP_STYLE_URL_ENV, "not a url")]
    fn malformed_values_are_rejected(#[case] name: &'static str, #[case] value: &str) {
        let error = AppConfig::from_env(&env_with(&[(name, value)])).expect_err("invalid");
        assert!(matches!(error, ConfigError::InvalidEnv { name: reported, .. } if reported == name));
    }

    #[test]
    fn explicit_session_file_wins_over_home() {
        let config = AppConfig::from_env(&env_with(&[
            ("HOME", "/home/ada"),
            (SESSION_FILE_ENV, "/tmp/session.json"),
        ]))
        .expect("config");
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let backend = BackendMode::Supabase {
            url: Url::parse("https://project.supabase.co").expect("url"),
            key: "secret-anon-key".to_owned(),
        };
        assert!(!format!("{backend:?}").contains("secret-anon-key"));
    }
}
