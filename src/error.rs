use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stage {stage} requires field {field}")]
    MissingField { stage: String, field: String },

    #[error("Field {field} on stage {stage} must be {expected} or absent")]
    WrongFieldType {
        stage: String,
        field: String,
        expected: String,
    },

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Dependency cycle involving tasks: {}", members.join(", "))]
    Cycle { members: Vec<String> },

    #[error("No route for work item: {0}")]
    NoRoute(String),

    #[error("Actor not registered on bus: {0}")]
    ActorNotRegistered(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
