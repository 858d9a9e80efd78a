//! Error types for schema-upgrade.

use thiserror::Error;

/// The main error type for upgrade operations.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Failed to parse a legacy datamodel or target schema.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// The target schema has no datasource block.
    #[error("Missing datasource: the target schema needs a datasource block")]
    MissingDatasource,

    /// The datasource block has no string `provider`.
    #[error("Missing provider: the datasource block needs a provider")]
    MissingProvider,

    /// Provider is not one we can generate SQL for.
    #[error("Unsupported provider: '{0}'. Expected: mysql, postgres or postgresql")]
    UnsupportedProvider(String),

    /// A field references a type that is neither a scalar, an enum nor a model.
    #[error("Unknown type '{type_name}' on {model}.{field}")]
    UnknownType {
        model: String,
        field: String,
        type_name: String,
    },

    /// The relation graph could not be built from the datamodel.
    #[error("Graph construction failed at {node}: {message}")]
    GraphConstruction { node: String, message: String },

    /// The operation cannot be expressed for this provider.
    #[error("{operation} is not supported on {provider}")]
    UnsupportedOperation {
        provider: &'static str,
        operation: &'static str,
    },

    /// Invalid connection URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpgradeError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a graph construction error for a node.
    pub fn graph(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GraphConstruction {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for upgrade operations.
pub type UpgradeResult<T> = Result<T, UpgradeError>;
