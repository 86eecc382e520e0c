//! Error types for the persistence layer.
//!
//! Errors are layered the same way the crate is: filter compilation errors
//! ([`FilterError`]) and schema chain errors ([`SchemaError`]) sit beside
//! resource, transaction and backend errors, all wrapped by [`StorageError`].
//!
//! Every error can be classified with [`StorageError::class`] so an outer
//! transport layer can translate it into a response without matching on
//! individual variants.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Hint appended to every timestamp parameter failure.
pub const TIMESTAMP_HINT: &str = "must be ISO 8601 formatted with timezone information. \
     Please check that the URL is properly encoded.";

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Query parameter errors raised while compiling filters
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Schema document and schema chain errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised while turning raw query parameters into predicates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The geometry text did not decode, or the geometry is not valid.
    #[error("invalid geometry for '{parameter}': {reason}")]
    InvalidGeometry { parameter: String, reason: String },

    /// The identifier is not a syntactically valid UUID.
    #[error("invalid identifier for '{parameter}': '{value}' ({message})")]
    InvalidIdentifier {
        parameter: String,
        value: String,
        message: String,
    },

    /// A well-formed polygon identifier did not resolve to a stored polygon.
    #[error("boundary polygon not found: {id}")]
    PolygonNotFound { id: Uuid },

    /// The JSON text did not parse.
    #[error("invalid JSON for '{parameter}': {message}")]
    InvalidJson { parameter: String, message: String },

    /// The JSON parsed, but is not of the type the filter requires.
    #[error("'{parameter}' lookup must be an object, found {found}")]
    JsonTypeMismatch { parameter: String, found: String },

    /// The timestamp text did not parse.
    #[error("'{parameter}' {}", TIMESTAMP_HINT)]
    InvalidTimestamp { parameter: String },

    /// The timestamp parsed but carries no UTC offset.
    #[error("'{parameter}' has no timezone: {}", TIMESTAMP_HINT)]
    MissingTimezone { parameter: String },

    /// A filter was used without its required setup.
    #[error("filter misconfigured: {message}")]
    MisconfiguredFilter { message: String },
}

impl FilterError {
    /// Returns the query parameter this error refers to, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            FilterError::InvalidGeometry { parameter, .. }
            | FilterError::InvalidIdentifier { parameter, .. }
            | FilterError::InvalidJson { parameter, .. }
            | FilterError::JsonTypeMismatch { parameter, .. }
            | FilterError::InvalidTimestamp { parameter }
            | FilterError::MissingTimezone { parameter } => Some(parameter),
            FilterError::PolygonNotFound { .. } => Some("polygon_id"),
            FilterError::MisconfiguredFilter { .. } => None,
        }
    }
}

/// Errors related to schema documents and the schema version chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The submitted document is not a valid JSON schema.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    /// The record type a schema was published for does not exist.
    #[error("record type not found: {id}")]
    RecordTypeNotFound { id: Uuid },

    /// A data document does not satisfy its schema.
    #[error("data does not satisfy schema {schema_id}: {}", .errors.join("; "))]
    DataValidation { schema_id: Uuid, errors: Vec<String> },

    /// Stored chain pointers violate the chain invariants.
    #[error("schema chain for record type {record_type} is corrupt: {message}")]
    CorruptChain { record_type: Uuid, message: String },
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// A resource with the given identifier already exists.
    #[error("{resource_type} already exists: {id}")]
    AlreadyExists {
        resource_type: &'static str,
        id: Uuid,
    },

    /// A stored geometry failed the validity check.
    #[error("invalid geometry on {resource_type}: {reason}")]
    InvalidGeometry {
        resource_type: &'static str,
        reason: String,
    },

    /// A JSON document is not object or array rooted.
    #[error("invalid {field} on {resource_type}: array or object required")]
    InvalidDocument {
        resource_type: &'static str,
        field: &'static str,
    },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Coarse classification of an error for an outer transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller sent something malformed and can correct the request.
    BadRequest,
    /// A referenced entity does not exist.
    NotFound,
    /// A write conflicted with existing state.
    Conflict,
    /// Server-side configuration or backend fault; not user-correctable.
    ServerFault,
}

impl ErrorClass {
    /// Returns the HTTP status code conventionally used for this class.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorClass::BadRequest => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::Conflict => 409,
            ErrorClass::ServerFault => 500,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::BadRequest => write!(f, "bad-request"),
            ErrorClass::NotFound => write!(f, "not-found"),
            ErrorClass::Conflict => write!(f, "conflict"),
            ErrorClass::ServerFault => write!(f, "server-fault"),
        }
    }
}

impl StorageError {
    /// Classifies this error for translation into a transport response.
    pub fn class(&self) -> ErrorClass {
        match self {
            StorageError::Filter(FilterError::PolygonNotFound { .. }) => ErrorClass::NotFound,
            StorageError::Filter(FilterError::MisconfiguredFilter { .. }) => {
                ErrorClass::ServerFault
            }
            StorageError::Filter(_) => ErrorClass::BadRequest,
            StorageError::Schema(SchemaError::RecordTypeNotFound { .. }) => ErrorClass::NotFound,
            StorageError::Schema(SchemaError::CorruptChain { .. }) => ErrorClass::ServerFault,
            StorageError::Schema(_) => ErrorClass::BadRequest,
            StorageError::Resource(ResourceError::NotFound { .. }) => ErrorClass::NotFound,
            StorageError::Resource(ResourceError::AlreadyExists { .. }) => ErrorClass::Conflict,
            StorageError::Resource(_) => ErrorClass::BadRequest,
            StorageError::Transaction(_) | StorageError::Backend(_) => ErrorClass::ServerFault,
        }
    }

    /// Shorthand for `self.class().status_code()`.
    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for filter compilation steps.
pub type FilterResult<T> = Result<T, FilterError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
