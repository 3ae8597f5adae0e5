//! Two-tier error policy: shaping errors for the wire and routing
//! server-caused ones to the host.
//!
//! The formatter decides what the client sees; the reporter decides what the
//! application hears about. Both passes classify each execution error by the
//! source the resolver pipeline attached to it. User-caused failures
//! (forbidden, validation, status) pass through verbatim and are never
//! reported; anything the server caused is reported and masked outside debug
//! mode.

use async_graphql::PathSegment;
use async_graphql::Response;
use async_graphql::ServerError;
use http::StatusCode;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::error::FieldError;
use crate::error::InternalFieldError;
use crate::error::NormalizeError;
use crate::error::ValidationFailure;
use crate::host::Host;

pub(crate) const MASKED_MESSAGE: &str = "Internal server error";

enum ErrorKind<'a> {
    /// The authorizer rejected the field.
    Forbidden,
    /// Argument validation failed.
    Validation(&'a [ValidationFailure]),
    /// The resolver raised an error with an HTTP status.
    Status(StatusCode),
    /// The resolver raised something unexpected.
    Internal,
    /// The engine itself produced the error (parse, coercion, depth).
    Engine,
}

fn classify(error: &ServerError) -> ErrorKind<'_> {
    if let Some(source) = &error.source {
        if let Some(field_error) = source.downcast_ref::<FieldError>() {
            return match field_error {
                FieldError::Forbidden => ErrorKind::Forbidden,
                FieldError::Validation(failures) => ErrorKind::Validation(failures),
                FieldError::Status { status, .. } => ErrorKind::Status(*status),
            };
        }
        if source.downcast_ref::<InternalFieldError>().is_some() {
            return ErrorKind::Internal;
        }
    }
    ErrorKind::Engine
}

/// Shape one execution error for the response body.
///
/// User-caused kinds prepend their discriminating key (`validation` or
/// `statusCode`) before the message; internal ones are masked unless the host
/// runs in debug mode, in which case the original message rides along as
/// `debugMessage`.
pub(crate) fn format_error(error: &ServerError, debug: bool) -> Value {
    let mut out = Map::new();
    match classify(error) {
        ErrorKind::Validation(failures) => {
            out.insert("validation".to_string(), json!(failures));
            out.insert("message".to_string(), json!(error.message));
        }
        // Forbidden is a status error with a fixed code.
        ErrorKind::Forbidden => {
            out.insert(
                "statusCode".to_string(),
                json!(StatusCode::FORBIDDEN.as_u16()),
            );
            out.insert("message".to_string(), json!(error.message));
        }
        ErrorKind::Status(status) => {
            out.insert("statusCode".to_string(), json!(status.as_u16()));
            out.insert("message".to_string(), json!(error.message));
        }
        ErrorKind::Engine => {
            out.insert("message".to_string(), json!(error.message));
        }
        ErrorKind::Internal => {
            out.insert("message".to_string(), json!(MASKED_MESSAGE));
            if debug {
                out.insert("debugMessage".to_string(), json!(error.message));
            }
        }
    }

    if !error.locations.is_empty() {
        let locations: Vec<Value> = error
            .locations
            .iter()
            .map(|pos| json!({"line": pos.line, "column": pos.column}))
            .collect();
        out.insert("locations".to_string(), Value::Array(locations));
    }
    if !error.path.is_empty() {
        let path: Vec<Value> = error
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => json!(name),
                PathSegment::Index(index) => json!(index),
            })
            .collect();
        out.insert("path".to_string(), Value::Array(path));
    }
    if let Some(extensions) = &error.extensions {
        if let Ok(value @ Value::Object(_)) = serde_json::to_value(extensions) {
            out.insert("extensions".to_string(), value);
        }
    }
    Value::Object(out)
}

/// Route server-caused errors to the host; user-caused ones stay quiet.
pub(crate) fn report_errors(errors: &[ServerError], host: &dyn Host) {
    for error in errors {
        match classify(error) {
            ErrorKind::Forbidden | ErrorKind::Validation(_) | ErrorKind::Status(_) => {}
            ErrorKind::Internal | ErrorKind::Engine => host.log_exception(error),
        }
    }
}

/// Run the reporter and the formatter over one execution response and build
/// the response body.
///
/// `data` is omitted when execution never started (parse or validation
/// failures leave the data tree null and the errors list non-empty).
pub(crate) fn process_response(response: Response, host: &dyn Host) -> Value {
    report_errors(&response.errors, host);
    let debug = host.is_debug_mode();

    let mut body = Map::new();
    let data = response.data.into_json().unwrap_or(Value::Null);
    if response.errors.is_empty() || !data.is_null() {
        body.insert("data".to_string(), data);
    }
    if !response.errors.is_empty() {
        let errors: Vec<Value> = response
            .errors
            .iter()
            .map(|error| format_error(error, debug))
            .collect();
        body.insert("errors".to_string(), Value::Array(errors));
    }
    Value::Object(body)
}

/// Shape a normalization failure into a status code and response body.
///
/// Client mistakes surface verbatim with a 400; transport-contract
/// violations are logged through the host and masked outside debug mode.
pub(crate) fn request_failure(error: &NormalizeError, host: &dyn Host) -> (StatusCode, Value) {
    match error {
        NormalizeError::Request(request_error) => (
            StatusCode::BAD_REQUEST,
            json!({"errors": [{"message": request_error.to_string()}]}),
        ),
        NormalizeError::InvariantViolation(detail) => {
            host.log_exception(&ServerError::new(detail.clone(), None));
            let message = if host.is_debug_mode() {
                detail.as_str()
            } else {
                MASKED_MESSAGE
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"errors": [{"message": message}]}),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::RequestError;
    use crate::host::test_host::RecordingHost;

    // `new_with_source` uses the source's Display output as the message,
    // exactly like the pipeline does.
    fn server_error_with<T: std::fmt::Display + Send + Sync + 'static>(source: T) -> ServerError {
        async_graphql::Error::new_with_source(source).into_server_error(async_graphql::Pos {
            line: 2,
            column: 5,
        })
    }

    #[test]
    fn validation_errors_prepend_the_failure_list() {
        let error = server_error_with(FieldError::Validation(vec![ValidationFailure::new(
            "name",
            "name cannot be blank.",
        )]));
        let formatted = format_error(&error, false);
        assert_eq!(
            formatted,
            json!({
                "validation": [{"field": "name", "messages": ["name cannot be blank."]}],
                "message": "Validation failed.",
                "locations": [{"line": 2, "column": 5}],
            })
        );
        // Key order carries the prepend contract.
        let keys: Vec<&String> = formatted.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["validation", "message", "locations"]);
    }

    #[test]
    fn forbidden_formats_as_a_403() {
        let error = server_error_with(FieldError::Forbidden);
        let formatted = format_error(&error, false);
        assert_eq!(formatted["statusCode"], json!(403));
        assert_eq!(
            formatted["message"],
            json!("You are not allowed to perform this action.")
        );
    }

    #[test]
    fn status_errors_prepend_the_status_code() {
        let error = server_error_with(FieldError::status(StatusCode::NOT_FOUND, "no such record"));
        let formatted = format_error(&error, false);
        assert_eq!(formatted["statusCode"], json!(404));
        assert_eq!(formatted["message"], json!("no such record"));
    }

    #[test]
    fn internal_errors_are_masked_outside_debug_mode() {
        let error = server_error_with(InternalFieldError("database exploded".into()));
        let masked = format_error(&error, false);
        assert_eq!(masked["message"], json!("Internal server error"));
        assert!(masked.get("debugMessage").is_none());

        let debug = format_error(&error, true);
        assert_eq!(debug["message"], json!("Internal server error"));
        assert_eq!(debug["debugMessage"], json!("database exploded"));
    }

    #[test]
    fn reporter_skips_user_caused_errors() {
        let host = RecordingHost::default();
        let errors = vec![
            server_error_with(FieldError::Forbidden),
            server_error_with(FieldError::Validation(Vec::new())),
            server_error_with(FieldError::status(StatusCode::GONE, "gone")),
            server_error_with(InternalFieldError("database exploded".into())),
            ServerError::new("engine says no", None),
        ];
        report_errors(&errors, &host);
        assert_eq!(
            *host.logged.lock(),
            vec!["database exploded".to_string(), "engine says no".to_string()]
        );
    }

    #[test]
    fn request_failures_map_to_a_400() {
        let host = RecordingHost::default();
        let (status, body) =
            request_failure(&NormalizeError::Request(RequestError::MissingQuery), &host);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"errors": [{"message": "GraphQL request must provide a `query` field."}]})
        );
        assert!(host.logged.lock().is_empty());
    }

    #[test]
    fn invariant_violations_map_to_a_masked_500_and_get_logged() {
        let host = RecordingHost::default();
        let error = NormalizeError::InvariantViolation("transport lied".to_string());
        let (status, body) = request_failure(&error, &host);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"errors": [{"message": "Internal server error"}]}));
        assert_eq!(*host.logged.lock(), vec!["transport lied".to_string()]);
    }
}
