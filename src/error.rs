use thiserror::Error;

/// Message returned to callers whenever the Docker daemon cannot be reached.
pub const DAEMON_UNAVAILABLE: &str =
    "Docker daemon not available. Make sure Docker socket is mounted.";

/// Dockinfo error types, each mapping onto one HTTP status class
#[derive(Error, Debug)]
pub enum DockinfoError {
    #[error("{}", DAEMON_UNAVAILABLE)]
    RuntimeUnavailable { reason: String },

    #[error("{kind} {name} not found")]
    NotFound { kind: ObjectKind, name: String },

    #[error("{message}")]
    InvalidRequest {
        message: String,
        hint: Option<String>,
    },

    #[error("{0}")]
    Unexpected(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {reason}")]
    Bind {
        addr: std::net::SocketAddr,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Docker object namespaces a lookup can miss in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Container,
    Image,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Container => write!(f, "Container"),
            ObjectKind::Image => write!(f, "Image"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Config file not found at path: {path}")]
    FileNotFound { path: String },
}

impl DockinfoError {
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            hint: None,
        }
    }

    pub fn invalid_request_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn unavailable(reason: impl ToString) -> Self {
        Self::RuntimeUnavailable {
            reason: reason.to_string(),
        }
    }

    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            DockinfoError::InvalidRequest { .. } => 400,
            DockinfoError::NotFound { .. } => 404,
            DockinfoError::RuntimeUnavailable { .. } => 503,
            _ => 500,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            DockinfoError::InvalidRequest { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

/// Convenience type alias for dockinfo results
pub type Result<T, E = DockinfoError> = std::result::Result<T, E>;
