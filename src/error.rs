use std::path::PathBuf;
use thiserror::Error;

use crate::rank::RankError;

#[derive(Error, Debug)]
pub enum CircleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Unknown backend {0:?} (expected \"local\" or \"hosted\")")]
    UnknownBackend(String),

    #[error(
        "Hosted backend needs a URL and API key. Set CIRCLE_HOSTED_URL and CIRCLE_API_KEY or add a [hosted] table to the config file"
    )]
    MissingHostedCredentials,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Team not specified and no default_team in config")]
    NoTeam,

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error("Status not found: {0}")]
    StatusNotFound(String),

    #[error("Priority not found: {0}")]
    PriorityNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Label not found: {0}")]
    LabelNotFound(String),

    #[error("No statuses configured; run `circle db seed` first")]
    NoStatuses,

    #[error("Invalid rank: {0}")]
    InvalidRank(#[from] RankError),

    #[error("Issue title cannot be empty")]
    EmptyTitle,

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("`{operation}` is not available on the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: crate::config::Backend,
    },

    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: rusqlite::Error,
    },
}

pub type Result<T> = std::result::Result<T, CircleError>;
