use std::time::Duration;

use thiserror::Error;

/// Failure to run an external command to completion.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {program}")]
    NotFound { program: String },

    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("'{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// Command output that does not match the expected schema.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed {source_name} output: {source}")]
    Malformed {
        source_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Record {index}: field '{field}' has unexpected type, expected {expected}")]
    InvalidType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
}

/// Failure of one structured query attempt (run + decode).
#[derive(Error, Debug)]
pub enum InterfaceQueryError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Fatal failure of the network state aggregation.
#[derive(Error, Debug)]
pub enum NetworkInfoError {
    #[error("Unable to retrieve network interface information")]
    InterfacesUnavailable {
        structured: InterfaceQueryError,
        #[source]
        legacy: CommandError,
    },
}

impl NetworkInfoError {
    /// Diagnostic text listing why each interface strategy failed.
    pub fn details(&self) -> String {
        match self {
            NetworkInfoError::InterfacesUnavailable { structured, legacy } => {
                format!("structured: {}; legacy: {}", structured, legacy)
            }
        }
    }
}

/// Failure of a control action (hotspot, bridge, shutdown).
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("{action} failed at step '{step}'")]
    StepFailed {
        action: &'static str,
        step: String,
        #[source]
        source: CommandError,
    },

    #[error("Hotspot password is not configured")]
    HotspotNotConfigured,
}

impl ControlError {
    /// Diagnostic text for API error bodies.
    pub fn details(&self) -> String {
        match self {
            ControlError::StepFailed { source, .. } => source.to_string(),
            ControlError::HotspotNotConfigured => String::new(),
        }
    }
}

/// Result type aliases for convenience
pub type CommandResult<T> = Result<T, CommandError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type ControlResult<T> = Result<T, ControlError>;
