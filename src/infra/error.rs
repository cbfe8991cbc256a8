use std::path::PathBuf;

use thiserror::Error;

/// Failures of the process plumbing around the application services.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to read `{}`: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render command output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("database error: {message}")]
    Database { message: String },
    #[error("media directory `{}` is unusable: {source}", directory.display())]
    MediaDirectory {
        directory: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
