//! Request normalization: every supported transport encoding in, one
//! [`NormalizedOperation`] out.
//!
//! Three variants are selected by content-type sniffing: a JSON body, an
//! urlencoded query string or form body, and the multipart file-upload
//! convention. Whatever the transport, execution only ever sees the
//! normalized tuple.

pub mod files;
mod multipart;

use std::path::PathBuf;

use bytes::Bytes;
use http::Method;
use http::header::CONTENT_TYPE;
use mediatype::MediaType;
use mediatype::ReadParams;
use mediatype::names::APPLICATION;
use mediatype::names::BOUNDARY;
use mediatype::names::FORM_DATA;
use mediatype::names::JSON;
use mediatype::names::MULTIPART;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::error::RequestError;
use crate::request::files::UploadLimits;
use crate::request::files::UploadMap;

/// The canonical operation tuple, identical for every transport encoding.
///
/// Constructed once per request and consumed exactly once by execution.
#[derive(Debug)]
pub struct NormalizedOperation {
    /// The GraphQL document, non-empty.
    pub query: String,
    /// Decoded variables, if any.
    pub variables: Option<serde_json::Map<String, Value>>,
    /// The operation to execute when the document holds several.
    pub operation_name: Option<String>,
    /// Uploaded files keyed by placeholder path; empty outside multipart.
    pub uploads: UploadMap,
}

/// What to do when `variables` arrives as a string that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VariablesDecodePolicy {
    /// Treat variables as absent and run the operation without them.
    #[default]
    DropOnError,
    /// Reject the whole request.
    Fail,
}

/// Normalizer tuning.
#[derive(Debug, Clone, Default)]
pub struct NormalizerConfig {
    /// Policy for undecodable string-encoded variables.
    pub variables_decode_policy: VariablesDecodePolicy,
    /// Multipart upload limits.
    pub limits: UploadLimits,
    /// Where file parts are spooled; the system temp dir when unset.
    pub spool_dir: Option<PathBuf>,
}

/// Parse raw transport input into a [`NormalizedOperation`].
pub async fn normalize(
    request: http::Request<Bytes>,
    config: &NormalizerConfig,
) -> Result<NormalizedOperation, NormalizeError> {
    if request.method() == Method::GET {
        let query_string = request.uri().query().unwrap_or_default();
        let params = params_from_urlencoded(query_string.as_bytes())?;
        return from_params(params, config.variables_decode_policy, UploadMap::default());
    }

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|header| header.to_str().ok())
        .map(str::to_owned);
    let media_type = content_type
        .as_deref()
        .and_then(|value| MediaType::parse(value).ok());

    match media_type {
        Some(mime) if mime.ty == MULTIPART && mime.subty == FORM_DATA => {
            let boundary = mime
                .get_param(BOUNDARY)
                .ok_or(RequestError::InvalidMultipart(multer::Error::NoBoundary))?
                .unquoted_str()
                .to_string();
            multipart::reassemble(boundary, request.into_body(), config).await
        }
        Some(mime) if media_type_is_json(&mime) => {
            let params: Value = serde_json::from_slice(request.body()).map_err(|err| {
                RequestError::InvalidJson {
                    field: "body",
                    reason: err.to_string(),
                }
            })?;
            from_params(params, config.variables_decode_policy, UploadMap::default())
        }
        Some(mime) if mime.ty == APPLICATION && mime.subty.as_str() == "x-www-form-urlencoded" => {
            let params = params_from_urlencoded(request.body())?;
            from_params(params, config.variables_decode_policy, UploadMap::default())
        }
        Some(mime) => Err(RequestError::UnsupportedContentType(mime.to_string()).into()),
        // No usable content type: fall back to the query string, the same
        // way a POST with an empty parsed body falls through to GET params.
        None => {
            let query_string = request.uri().query().unwrap_or_default();
            let params = params_from_urlencoded(query_string.as_bytes())?;
            from_params(params, config.variables_decode_policy, UploadMap::default())
        }
    }
}

fn media_type_is_json(mime: &MediaType<'_>) -> bool {
    mime.ty == APPLICATION && (mime.subty == JSON || mime.suffix == Some(JSON))
}

fn params_from_urlencoded(bytes: &[u8]) -> Result<Value, NormalizeError> {
    let params: Value = serde_urlencoded::from_bytes(bytes)
        .map_err(|err| RequestError::UnexpectedBodyShape(err.to_string()))?;
    Ok(params)
}

/// Turn a parsed parameter object into the normalized tuple.
///
/// Shared by every transport variant; multipart reassembly funnels its
/// placeholder-patched `operations` object through here as well.
fn from_params(
    params: Value,
    policy: VariablesDecodePolicy,
    uploads: UploadMap,
) -> Result<NormalizedOperation, NormalizeError> {
    if params.is_array() {
        return Err(RequestError::BatchingNotSupported.into());
    }
    let Value::Object(mut params) = params else {
        return Err(RequestError::UnexpectedBodyShape(describe_json(&params).to_string()).into());
    };

    let query = match params.get("query") {
        Some(Value::String(query)) if !query.trim().is_empty() => query.clone(),
        _ => return Err(RequestError::MissingQuery.into()),
    };
    let operation_name = params
        .get("operationName")
        .and_then(Value::as_str)
        .map(str::to_string);
    let variables = decode_variables(params.remove("variables"), policy)?;

    Ok(NormalizedOperation {
        query,
        variables,
        operation_name,
        uploads,
    })
}

/// Variables arrive either as an object or as a JSON-encoded string.
fn decode_variables(
    value: Option<Value>,
    policy: VariablesDecodePolicy,
) -> Result<Option<serde_json::Map<String, Value>>, NormalizeError> {
    let undecodable = |reason: String| match policy {
        VariablesDecodePolicy::DropOnError => Ok(None),
        VariablesDecodePolicy::Fail => Err(RequestError::InvalidVariables(reason).into()),
    };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => undecodable(format!("expected a JSON object, got {}", describe_json(&other))),
            Err(err) => undecodable(err.to_string()),
        },
        Some(other) => undecodable(format!("expected a JSON object, got {}", describe_json(&other))),
    }
}

fn describe_json(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
