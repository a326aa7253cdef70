use std::{io, path::Path};

use thiserror::Error;

/// Crate-level failure taxonomy surfaced by every public operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Server '{0}' already exists")]
    AlreadyExists(String),

    #[error("Server '{0}' is already managed")]
    AlreadyManaged(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Server '{0}' is not running")]
    NotRunning(String),

    #[error("Build resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Filesystem error while {context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn fs<S: Into<String>>(context: S, source: io::Error) -> Self {
        Self::Filesystem {
            context: context.into(),
            source,
        }
    }

    pub fn fs_at(action: &str, path: &Path, source: io::Error) -> Self {
        Self::fs(format!("{} {}", action, path.display()), source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Server name must be 3-32 characters of letters, digits, '_' or '-': {0:?}")]
    InvalidName(String),

    #[error("Port must be between 1024 and 65535: {0}")]
    PortOutOfRange(u32),

    #[error("Memory must be between 512 and 65536 MB: {0}")]
    MemoryOutOfRange(u32),

    #[error("Invalid version specifier: {0:?}")]
    InvalidVersion(String),

    #[error("Unknown server variant: {0:?}")]
    UnknownVariant(String),

    #[error("Variant '{0}' cannot be created, import an existing installation instead")]
    NotCreatable(String),

    #[error("JAR path must be relative and stay inside the server directory: {0}")]
    InvalidJarPath(String),

    #[error("Source path is not a directory: {0}")]
    NotADirectory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Upstream {url} unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("Upstream {url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Version {version} is not offered for {variant}")]
    VersionNotOffered { variant: String, version: String },

    #[error("Malformed upstream payload from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("No builds published for {variant} {version}")]
    NoBuilds { variant: String, version: String },

    #[error("Variant '{0}' has no upstream build service")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;
