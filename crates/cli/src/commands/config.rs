use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pestquote_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "api.base_url",
        &config.api.base_url,
        source("api.base_url", &["PESTQUOTE_API_BASE_URL"]),
    ));
    lines.push(render_line(
        "api.csrf_token",
        &redact_token(config.api.csrf_token.expose_secret()),
        source("api.csrf_token", &["PESTQUOTE_API_CSRF_TOKEN"]),
    ));
    lines.push(render_line(
        "api.timeout_secs",
        &config
            .api
            .timeout_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "<client default>".to_string()),
        source("api.timeout_secs", &["PESTQUOTE_API_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "intake.default_partner_id",
        config.intake.default_partner_id.as_deref().unwrap_or("<unset>"),
        source("intake.default_partner_id", &["PESTQUOTE_INTAKE_PARTNER_ID"]),
    ));
    lines.push(render_line(
        "intake.source",
        &config.intake.source,
        source("intake.source", &["PESTQUOTE_INTAKE_SOURCE"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["PESTQUOTE_LOGGING_LEVEL", "PESTQUOTE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["PESTQUOTE_LOGGING_FORMAT", "PESTQUOTE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pestquote.toml"), PathBuf::from("config/pestquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
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

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() <= 4 {
        return "<redacted>".to_string();
    }
    let prefix: String = trimmed.chars().take(2).collect();
    format!("{prefix}***")
}
