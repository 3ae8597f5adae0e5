//! Error taxonomy for the endpoint.
//!
//! Errors split along two axes: *when* they occur (schema assembly vs request
//! normalization vs field execution) and *who* caused them (the client, a
//! misbehaving transport, or the server itself). The error policy in
//! [`crate::error_policy`] relies on this split to decide what is shown to the
//! client and what is routed to the host logger.

use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tower::BoxError;

/// Schema misdeclaration, fatal at boot.
///
/// Raised while assembling the engine schema from descriptors, never during
/// request handling. A broken schema must fail before the first query is
/// served.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// A root operation field carries no resolver.
    #[error("resolver is not defined for field `{field}`")]
    MissingResolver {
        /// The field missing its resolver.
        field: String,
    },

    /// Two descriptors were registered under the same type name.
    #[error("type `{0}` is already registered")]
    DuplicateTypeName(String),

    /// A field references a type name that was never registered.
    #[error("field `{field}` references unknown type `{type_name}`")]
    InvalidFieldSpecification {
        /// The offending field.
        field: String,
        /// The unresolvable type name.
        type_name: String,
    },

    /// A raw engine field was used where a descriptor is required.
    #[error("raw fields are only supported on root operations, found one in type `{type_name}`")]
    RawFieldInType {
        /// The registered type holding the raw field.
        type_name: String,
    },

    /// Registration was attempted after the schema had been built.
    #[error("the registry is frozen once a schema has been built")]
    RegistryFrozen,

    /// The engine rejected the assembled schema.
    #[error("schema construction failed: {0}")]
    Schema(String),
}

/// Malformed client input, surfaced with a 4xx status and never logged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RequestError {
    /// The request does not carry a `query` field.
    #[error("GraphQL request must provide a `query` field.")]
    MissingQuery,

    /// A top-level array of operations was submitted.
    #[error("Query batching is not supported.")]
    BatchingNotSupported,

    /// A multipart request without the `map` field.
    #[error("The request must define a `map`.")]
    MissingMap,

    /// The multipart framing itself could not be parsed.
    #[error("invalid multipart request: {0}")]
    InvalidMultipart(#[from] multer::Error),

    /// A framework-owned multipart field held unparseable JSON.
    #[error("Invalid JSON in the `{field}` multipart field: {reason}")]
    InvalidJson {
        /// Which multipart field failed to parse.
        field: &'static str,
        /// The decode failure.
        reason: String,
    },

    /// The request body was not the JSON object the transport promises.
    #[error("GraphQL server expects a JSON object, but got {0}.")]
    UnexpectedBodyShape(String),

    /// The `variables` value could not be decoded.
    #[error("Could not decode `variables`: {0}")]
    InvalidVariables(String),

    /// A `map` entry references a file part that is not in the request.
    #[error("Missing file part `{0}` referenced by the `map` field.")]
    MissingFilePart(String),

    /// A `map` path that cannot be walked.
    #[error("Invalid path `{0}` found inside the `map` field.")]
    InvalidMapPath(String),

    /// Too many uploaded files in one request.
    #[error("Exceeded the limit of {0} file uploads in a single request.")]
    MaxFilesExceeded(usize),

    /// One uploaded file is larger than the configured limit.
    #[error("File `{filename}` exceeded the upload limit of {limit} bytes.")]
    MaxFileSizeExceeded {
        /// The offending file part.
        filename: String,
        /// The configured per-file limit.
        limit: u64,
    },

    /// The request content type is not one the normalizer understands.
    #[error("Unsupported content type `{0}`.")]
    UnsupportedContentType(String),
}

/// Outcome of request normalization.
///
/// [`NormalizeError::InvariantViolation`] flags a protocol-contract violation
/// by the transport layer itself. Unlike a [`RequestError`] it is treated as a
/// server misconfiguration: logged, and masked outside debug mode.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Bad client input.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The transport broke its own contract.
    #[error("{0}")]
    InvariantViolation(String),
}

/// One validated attribute that failed, with every message produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The attribute name.
    pub field: String,
    /// All rule messages for this attribute, in rule order.
    pub messages: Vec<String>,
}

impl ValidationFailure {
    /// Single-message failure.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            messages: vec![message.into()],
        }
    }
}

/// Errors raised by the resolver pipeline during field execution.
///
/// These are attached as the source of the engine-level error so the error
/// policy can recover them after execution. All three are user-caused and are
/// never routed to the host logger.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The field authorizer did not return `true`.
    #[error("You are not allowed to perform this action.")]
    Forbidden,

    /// One or more argument validation rules failed.
    #[error("Validation failed.")]
    Validation(Vec<ValidationFailure>),

    /// A resolver raised an error carrying an HTTP status.
    #[error("{message}")]
    Status {
        /// The HTTP status to expose as `statusCode`.
        status: StatusCode,
        /// The user-visible message.
        message: String,
    },
}

impl FieldError {
    /// Convenience constructor for status errors.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Wrapper for anything else a resolver raised.
///
/// Kept as a distinct type so the error policy can tell "resolver blew up"
/// apart from errors the engine itself produced.
#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct InternalFieldError(pub(crate) BoxError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_messages_are_user_facing() {
        assert_eq!(
            FieldError::Forbidden.to_string(),
            "You are not allowed to perform this action."
        );
        assert_eq!(
            FieldError::status(StatusCode::NOT_FOUND, "no such thing").to_string(),
            "no such thing"
        );
    }

    #[test]
    fn validation_failure_serializes_field_then_messages() {
        let failure = ValidationFailure::new("name", "name cannot be blank.");
        let json = serde_json::to_value(&failure).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({"field": "name", "messages": ["name cannot be blank."]})
        );
    }
}
