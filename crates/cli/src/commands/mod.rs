pub mod config;
pub mod predict;
pub mod recommend;
pub mod run;
pub mod segment;

use std::path::PathBuf;

use cartwise_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
use cartwise_core::errors::PipelineError;
use serde::Serialize;

use crate::export::ExportError;
use crate::loader::LoadError;

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

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Exit codes: 2 config, 3 input, 4 state, 5 insufficient data,
/// 6 untrained model, 7 artifact, 8 export.
fn pipeline_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::DataFormat(_) => 3,
        PipelineError::State(_) => 4,
        PipelineError::InsufficientData(_) => 5,
        PipelineError::UntrainedModel => 6,
        PipelineError::Artifact(_) => 7,
    }
}

pub(crate) fn pipeline_failure(command: &str, error: &PipelineError) -> CommandResult {
    CommandResult::failure(command, error.class(), error.to_string(), pipeline_exit_code(error))
}

pub(crate) fn config_failure(command: &str, error: &ConfigError) -> CommandResult {
    CommandResult::failure(command, "config_validation", error.to_string(), 2)
}

pub(crate) fn load_failure(command: &str, error: &LoadError) -> CommandResult {
    CommandResult::failure(command, error.class(), error.to_string(), 3)
}

pub(crate) fn export_failure(command: &str, error: &ExportError) -> CommandResult {
    CommandResult::failure(command, "export", error.to_string(), 8)
}

/// An explicit `--config` path must exist; otherwise the default lookup
/// locations stay optional.
pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, ConfigError> {
    AppConfig::load(LoadOptions { require_file: config_path.is_some(), config_path, overrides })
}

pub(crate) fn pretty_json<T: Serialize>(command: &'static str, payload: &T) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{command}\",\"status\":\"error\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
