use std::borrow::Cow;

use thiserror::Error;

/// Failure raised by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend could not be reached or refused the call.
    #[error("store unavailable: {message}")]
    Unavailable { message: Cow<'static, str> },

    /// A field-level write targeted a document that does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A document could not be encoded or decoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document is not valid JSON.
    #[error("document {collection}/{id} is not valid JSON: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    /// The batch script returned an error code we do not understand.
    #[error("script error: {message}")]
    Script { message: Cow<'static, str> },
}

impl StoreError {
    pub fn unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn malformed(collection: &str, id: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Redis(err) => {
                err.is_io_error() || err.is_connection_dropped() || err.is_timeout() || err.is_connection_refusal()
            }
            StoreError::Unavailable { .. } => true,
            StoreError::NotFound { .. }
            | StoreError::Serialization(_)
            | StoreError::Malformed { .. }
            | StoreError::Script { .. } => false,
        }
    }
}

/// Top-level error type returned by the follow graph and channel services.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A mutating operation was attempted without a signed-in identity.
    #[error("sign-in required")]
    AuthRequired,

    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// A profile referenced by a mutation does not exist.
    #[error("profile '{user_id}' not found")]
    ProfileNotFound { user_id: String },

    /// A stored document did not match the expected schema.
    #[error("malformed {collection} document '{id}': {reason}")]
    MalformedDocument {
        collection: String,
        id: String,
        reason: String,
    },

    /// The document store failed the call.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The caller tore down before the operation finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl GraphError {
    /// Message suitable for direct display to an end user.
    pub fn user_message(&self) -> String {
        match self {
            GraphError::AuthRequired => "Please sign in to continue.".to_string(),
            GraphError::Validation(err) => match err.issues.first() {
                Some(issue) => issue.message.clone(),
                None => "The request was invalid.".to_string(),
            },
            GraphError::ProfileNotFound { .. } => "That user could not be found.".to_string(),
            GraphError::MalformedDocument { .. } => "Stored data is corrupted; please contact support.".to_string(),
            GraphError::StoreUnavailable(_) => "Could not reach the server. Please try again.".to_string(),
            GraphError::Cancelled => "The request was cancelled.".to_string(),
        }
    }

    pub(crate) fn malformed(collection: &str, id: &str, reason: impl ToString) -> Self {
        GraphError::MalformedDocument {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Bad stored data is never a connectivity problem.
impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Malformed { collection, id, reason } => GraphError::MalformedDocument { collection, id, reason },
            StoreError::Serialization(err) => GraphError::malformed("unknown", "unknown", err),
            other => GraphError::StoreUnavailable(other),
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
