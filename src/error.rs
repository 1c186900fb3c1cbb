use crate::schema_normalizer::SchemaRole;
use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
///
/// Per-item failures (`UnsupportedSchemaKind`, `RouteResolution`,
/// `ReservedPathCollision`) are recovered where they occur and handed to a
/// [`Reporter`](crate::reporter::Reporter). Only `InvalidSchemaUsage`, `Config`
/// and the I/O variants are returned to callers.
#[derive(Debug)]
pub enum Error {
    /// A schema source could not be converted to a canonical schema.
    UnsupportedSchemaKind {
        operation_id: String,
        role: SchemaRole,
        reason: String,
    },
    /// Resolving one route's declared operations failed (parse, I/O, timeout).
    RouteResolution { route: String, reason: String },
    /// A non-schema value was passed where a schema is required.
    InvalidSchemaUsage(String),
    /// A route collides with a path reserved for generated endpoints.
    ReservedPathCollision {
        path: String,
        reserved_for: &'static str,
        config_key: &'static str,
    },
    /// Invalid or unreadable configuration.
    Config { file: PathBuf, message: String },
    IoError(std::io::Error),
    SerializationError(String),
}

impl Error {
    /// Build a route resolution failure from any displayable cause
    pub fn route(route: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::RouteResolution {
            route: route.into(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnsupportedSchemaKind {
                operation_id,
                role,
                reason,
            } => write!(
                f,
                "{} schema for operation {} could not be converted correctly: {}",
                role, operation_id, reason
            ),
            Error::RouteResolution { route, reason } => {
                write!(f, "failed to resolve route {}: {}", route, reason)
            }
            Error::InvalidSchemaUsage(msg) => write!(f, "invalid schema: {}", msg),
            Error::ReservedPathCollision {
                path,
                reserved_for,
                config_key,
            } => write!(
                f,
                "{} is reserved for {}. Update {} in your config to use this path for other purposes.",
                path, reserved_for, config_key
            ),
            Error::Config { file, message } => {
                write!(f, "config error {}: {}", file.display(), message)
            }
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}
