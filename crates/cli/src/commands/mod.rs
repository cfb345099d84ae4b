pub mod config;
pub mod migrate;
pub mod seed;
pub mod sessions;

use serde::Serialize;
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_db::{connect, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Failure raised inside a command's async body: class, message, exit code.
pub(crate) type StepFailure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, StepFailure> {
    connect(&config.database).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        let message = error.to_string().replace('\\', "\\\\").replace('"', "\\\"");
        format!(
            concat!(
                "{{\"command\":\"unknown\",\"status\":\"error\",",
                "\"error_class\":\"serialization\",\"message\":\"{}\"}}"
            ),
            message
        )
    })
}
