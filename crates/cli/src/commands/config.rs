use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use certtrack_core::config::{AppConfig, LoadOptions, CONFIG_FILE_CANDIDATES};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

struct Sources {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl Sources {
    fn detect(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.exists().then(|| path.to_path_buf()),
            None => CONFIG_FILE_CANDIDATES.iter().map(PathBuf::from).find(|path| path.exists()),
        };
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn field(&self, key_path: &str, env_keys: &[&str]) -> String {
        for env_key in env_keys {
            if env::var_os(env_key).is_some() {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: LoadOptions) -> CommandResult {
    let sources = Sources::detect(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    CommandResult { exit_code: 0, output: render(&config, &sources) }
}

fn render(config: &AppConfig, sources: &Sources) -> String {
    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "api.base_url",
        &config.api.base_url,
        sources.field("api.base_url", &["CERTTRACK_API_BASE_URL"]),
    ));
    lines.push(render_line(
        "api.timeout_secs",
        &config.api.timeout_secs.to_string(),
        sources.field("api.timeout_secs", &["CERTTRACK_API_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "api.max_retries",
        &config.api.max_retries.to_string(),
        sources.field("api.max_retries", &["CERTTRACK_API_MAX_RETRIES"]),
    ));

    lines.push(render_line(
        "auth.username",
        config.auth.username.as_deref().unwrap_or("<unset>"),
        sources.field("auth.username", &["CERTTRACK_AUTH_USERNAME"]),
    ));
    let password = if config.auth.password.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "auth.password",
        password,
        sources.field("auth.password", &["CERTTRACK_AUTH_PASSWORD"]),
    ));

    let fallback = config
        .requirements
        .ul_cert_fallback
        .map(|status| status.0.to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "requirements.ul_cert_fallback",
        &fallback,
        sources.field(
            "requirements.ul_cert_fallback",
            &["CERTTRACK_REQUIREMENTS_UL_CERT_FALLBACK"],
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.field("logging.level", &["CERTTRACK_LOGGING_LEVEL", "CERTTRACK_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        sources.field("logging.format", &["CERTTRACK_LOGGING_FORMAT", "CERTTRACK_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
