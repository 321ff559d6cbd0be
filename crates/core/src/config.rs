use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::material::UlCertStatus;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub requirements: RequirementsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct RequirementsConfig {
    /// UL tier assumed for records whose UL field is unset.
    pub ul_cert_fallback: Option<UlCertStatus>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub ul_cert_fallback: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read certtrack config `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("certtrack config `{path}` is not valid TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("config placeholder `${{{var}}}` refers to an unset environment variable")]
    MissingEnvInterpolation { var: String },
    #[error("config placeholder is missing its closing `}}`")]
    UnterminatedInterpolation,
    #[error("`{key}` has a non-numeric value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("{0}")]
    Validation(String),
}

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["certtrack.toml", "config/certtrack.toml"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 30,
                max_retries: 1,
            },
            auth: AuthConfig { username: None, password: None },
            requirements: RequirementsConfig { ul_cert_fallback: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let format = match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => {
                return Err(ConfigError::Validation(format!(
                    "log format `{value}` is not one of compact|pretty|json"
                )))
            }
        };
        Ok(format)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.username.is_some() && self.auth.password.is_some()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = api.max_retries {
                self.api.max_retries = max_retries;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(username) = auth.username {
                self.auth.username = Some(username);
            }
            if let Some(password) = auth.password {
                self.auth.password = Some(secret_value(password));
            }
        }

        if let Some(requirements) = patch.requirements {
            if let Some(fallback) = requirements.ul_cert_fallback {
                self.requirements.ul_cert_fallback = Some(UlCertStatus(fallback));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some((_, base_url)) = env_value(&["CERTTRACK_API_BASE_URL"]) {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = env_number("CERTTRACK_API_TIMEOUT_SECS")? {
            self.api.timeout_secs = timeout_secs;
        }
        if let Some(max_retries) = env_number("CERTTRACK_API_MAX_RETRIES")? {
            self.api.max_retries = max_retries;
        }
        if let Some((_, username)) = env_value(&["CERTTRACK_AUTH_USERNAME"]) {
            self.auth.username = Some(username);
        }
        if let Some((_, password)) = env_value(&["CERTTRACK_AUTH_PASSWORD"]) {
            self.auth.password = Some(secret_value(password));
        }
        if let Some(tier) = env_number("CERTTRACK_REQUIREMENTS_UL_CERT_FALLBACK")? {
            self.requirements.ul_cert_fallback = Some(UlCertStatus(tier));
        }
        if let Some((_, level)) = env_value(&["CERTTRACK_LOGGING_LEVEL", "CERTTRACK_LOG_LEVEL"]) {
            self.logging.level = level;
        }
        if let Some((_, format)) = env_value(&["CERTTRACK_LOGGING_FORMAT", "CERTTRACK_LOG_FORMAT"])
        {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.api_base_url {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.api_timeout_secs {
            self.api.timeout_secs = timeout_secs;
        }
        if let Some(username) = overrides.auth_username {
            self.auth.username = Some(username);
        }
        if let Some(password) = overrides.auth_password {
            self.auth.password = Some(secret_value(password));
        }
        if let Some(fallback) = overrides.ul_cert_fallback {
            self.requirements.ul_cert_fallback = Some(UlCertStatus(fallback));
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_auth(&self.auth)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) => None,
        None => CONFIG_FILE_CANDIDATES.iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let expanded = expand_placeholders(&raw)?;
    toml::from_str(&expanded)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${NAME}` in a config file with the value of env var `NAME`.
fn expand_placeholders(raw: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let name = &after_open[..end];
        let value = env::var(name)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: name.to_string() })?;
        expanded.push_str(&value);
        rest = &after_open[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid("api.base_url needs an http:// or https:// scheme"));
    }
    if !(1..=300).contains(&api.timeout_secs) {
        return Err(invalid("api.timeout_secs must be between 1 and 300"));
    }
    if api.max_retries > 5 {
        return Err(invalid("api.max_retries must not exceed 5"));
    }
    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    let has_username = auth.username.as_deref().is_some_and(|value| !value.trim().is_empty());
    let has_password =
        auth.password.as_ref().is_some_and(|value| !value.expose_secret().trim().is_empty());

    match (has_username, has_password) {
        (true, false) => Err(invalid(
            "auth.password is needed alongside auth.username (CERTTRACK_AUTH_PASSWORD)",
        )),
        (false, true) => Err(invalid(
            "auth.username is needed alongside auth.password (CERTTRACK_AUTH_USERNAME)",
        )),
        _ => Ok(()),
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "logging.level `{}` is not one of {}",
            logging.level,
            LOG_LEVELS.join("|")
        )))
    }
}

/// First non-blank value among `keys`, paired with the key it came from.
fn env_value(keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    })
}

fn env_number<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    let Some((key, value)) = env_value(&[key]) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    auth: Option<AuthPatch>,
    requirements: Option<RequirementsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RequirementsPatch {
    ul_cert_fallback: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
