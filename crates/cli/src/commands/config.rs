use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Each entry: dotted key, environment variables that may set it.
const FIELD_ENV_KEYS: &[(&str, &[&str])] = &[
    ("database.url", &["STOREFRONT_DATABASE_URL"]),
    ("database.max_connections", &["STOREFRONT_DATABASE_MAX_CONNECTIONS"]),
    ("database.timeout_secs", &["STOREFRONT_DATABASE_TIMEOUT_SECS"]),
    ("server.bind_address", &["STOREFRONT_SERVER_BIND_ADDRESS"]),
    ("server.port", &["STOREFRONT_SERVER_PORT"]),
    ("server.graceful_shutdown_secs", &["STOREFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ("session.cookie_name", &["STOREFRONT_SESSION_COOKIE_NAME"]),
    ("session.concurrency", &["STOREFRONT_SESSION_CONCURRENCY"]),
    ("session.max_age_secs", &["STOREFRONT_SESSION_MAX_AGE_SECS"]),
    ("logging.level", &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"]),
    ("logging.format", &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"]),
];

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let values = [
        redact_database_url(&config.database.url),
        config.database.max_connections.to_string(),
        config.database.timeout_secs.to_string(),
        config.server.bind_address.clone(),
        config.server.port.to_string(),
        config.server.graceful_shutdown_secs.to_string(),
        config.session.cookie_name.clone(),
        format!("{:?}", config.session.concurrency),
        config.session.max_age_secs.to_string(),
        config.logging.level.clone(),
        format!("{:?}", config.logging.format),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for ((key, env_keys), value) in FIELD_ENV_KEYS.iter().zip(values.iter()) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
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

/// Hides query parameters, which is where sqlite URLs carry keys and modes.
fn redact_database_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?<redacted>"),
        None => url.to_string(),
    }
}
