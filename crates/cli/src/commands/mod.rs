pub mod config;
pub mod pricing;
pub mod quote;
pub mod submit;

use pestquote_client::HttpLeadGateway;
use pestquote_core::config::AppConfig;
use pestquote_core::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

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
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application failure onto the interface error classes. `data` is attached
    /// as-is, with the correlation id added when it is an object.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
        data: Option<Value>,
    ) -> Self {
        let exit_code = match &error {
            ApplicationError::Configuration(_) => 2,
            ApplicationError::Domain(_) => 4,
            ApplicationError::Integration(_) => 5,
        };
        let interface = error.into_interface(correlation_id);
        let (error_class, detail) = match &interface {
            InterfaceError::BadRequest { message, .. } => ("bad_request", message),
            InterfaceError::ServiceUnavailable { message, .. } => ("service_unavailable", message),
            InterfaceError::Internal { message, .. } => ("internal", message),
        };

        let mut data = data.unwrap_or_else(|| Value::Object(Default::default()));
        if let Value::Object(map) = &mut data {
            map.insert("correlation_id".to_string(), Value::String(correlation_id.to_string()));
        }

        Self::failure_with_data(
            command,
            error_class,
            format!("{} ({detail})", interface.user_message()),
            exit_code,
            Some(data),
        )
    }
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) fn build_gateway(
    command: &str,
    config: &AppConfig,
) -> Result<HttpLeadGateway, CommandResult> {
    HttpLeadGateway::from_config(&config.api).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("cannot use api.base_url: {error}"),
            2,
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
