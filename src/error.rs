//! Error types for the data-access layer.
//!
//! All fallible operations return [`SqlResult`]. Variants map one-to-one
//! onto the failure classes of the public contract: configuration problems
//! fail fast before any I/O, statement failures carry the backend's SQLSTATE
//! when one is available, and identity-resolution failures are never coerced
//! into a default value.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlError {
    /// A required construction argument was missing or empty.
    #[error("Missing required option: {field}")]
    Configuration { field: String },

    /// The driver name is not part of the supported set.
    #[error("Unknown driver: {name}")]
    UnknownDriver { name: String },

    /// The backend was unreachable or the handshake failed.
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// A SQL statement was rejected by the backend.
    #[error("Statement failed: {message}")]
    Statement {
        message: String,
        /// e.g. "42P01" for an undefined table
        sql_state: Option<String>,
    },

    /// An insert succeeded but no generated identity could be determined.
    ///
    /// This usually points at missing metadata/sequence privileges rather
    /// than a caller mistake, so it always propagates.
    #[error("No generated identity could be resolved for table '{table}'")]
    IdentityResolution { table: String },

    /// A procedure parameter was declared with a type outside the whitelist.
    #[error("Invalid parameter type '{declared}' for parameter '{name}'")]
    InvalidParameterType { name: String, declared: String },

    /// A stored-procedure invocation was rejected by the backend.
    #[error("Procedure '{procedure}' failed: {message}")]
    Procedure { procedure: String, message: String },

    /// The active driver does not provide the requested capability.
    #[error("Driver '{driver}' does not support {capability}")]
    Unsupported {
        driver: &'static str,
        capability: &'static str,
    },

    /// The caller supplied an argument the operation cannot act on.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SqlError {
    /// Create a configuration error naming the missing field.
    pub fn configuration(field: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
        }
    }

    /// Create an unknown-driver error.
    pub fn unknown_driver(name: impl Into<String>) -> Self {
        Self::UnknownDriver { name: name.into() }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement error with optional SQLSTATE.
    pub fn statement(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
        }
    }

    /// Create an identity-resolution error for the given table.
    pub fn identity_resolution(table: impl Into<String>) -> Self {
        Self::IdentityResolution {
            table: table.into(),
        }
    }

    /// Create an invalid-parameter-type error.
    pub fn invalid_parameter_type(name: impl Into<String>, declared: impl Into<String>) -> Self {
        Self::InvalidParameterType {
            name: name.into(),
            declared: declared.into(),
        }
    }

    /// Create a procedure-execution error carrying the backend's message.
    pub fn procedure(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Procedure {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable by the caller. No operation in this
    /// crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert sqlx errors into the crate taxonomy.
impl From<sqlx::Error> for SqlError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => SqlError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                SqlError::statement(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => SqlError::connection(
                "Timed out waiting for the connection",
                "Check that the database server is reachable",
            ),
            sqlx::Error::PoolClosed => {
                SqlError::connection("Connection is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => SqlError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => SqlError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => SqlError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::RowNotFound => SqlError::statement("No rows returned", None),
            sqlx::Error::ColumnNotFound(col) => {
                SqlError::statement(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => SqlError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                SqlError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => SqlError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => SqlError::internal("Database worker crashed"),
            _ => SqlError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for data-access operations.
pub type SqlResult<T> = Result<T, SqlError>;
