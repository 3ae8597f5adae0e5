//! Multipart file-upload reassembly.
//!
//! Implements the convention where an `operations` text part carries the
//! operation with `null` placeholders, a `map` text part assigns file parts
//! to dot-separated paths inside it, and the remaining parts are the files
//! themselves. Reassembly patches a `<upload:FIELD>` marker into every mapped
//! path and records the spooled files in an [`UploadMap`], then funnels the
//! patched object through the shared parameter path.

use std::convert::Infallible;
use std::path::Path;
use std::path::PathBuf;

use bytes::Bytes;
use futures::stream;
use indexmap::IndexMap;
use multer::Multipart;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::error::RequestError;
use crate::request::NormalizedOperation;
use crate::request::NormalizerConfig;
use crate::request::describe_json;
use crate::request::files::FileHandle;
use crate::request::files::UploadMap;
use crate::request::files::UploadSlot;
use crate::request::from_params;

/// The marker value written at every mapped path.
pub(crate) fn upload_placeholder(field: &str) -> String {
    format!("<upload:{field}>")
}

pub(crate) async fn reassemble(
    boundary: String,
    body: Bytes,
    config: &NormalizerConfig,
) -> Result<NormalizedOperation, NormalizeError> {
    if body.is_empty() {
        return Err(NormalizeError::InvariantViolation(
            "multipart request arrived with an empty body".to_string(),
        ));
    }

    let stream = stream::iter([Ok::<Bytes, Infallible>(body)]);
    let mut multipart = Multipart::new(stream, boundary);

    let mut text_fields: IndexMap<String, String> = IndexMap::new();
    let mut file_fields: IndexMap<String, Vec<FileHandle>> = IndexMap::new();
    let mut file_count = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(RequestError::from)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                file_count += 1;
                if file_count > config.limits.max_files {
                    return Err(RequestError::MaxFilesExceeded(config.limits.max_files).into());
                }
                let content_type = field.content_type().map(|mime| mime.to_string());
                let content = field.bytes().await.map_err(RequestError::from)?;
                if content.len() as u64 > config.limits.max_file_size {
                    return Err(RequestError::MaxFileSizeExceeded {
                        filename: file_name,
                        limit: config.limits.max_file_size,
                    }
                    .into());
                }
                let handle =
                    spool(file_name, content_type, content, config.spool_dir.as_deref()).await?;
                file_fields.entry(name).or_default().push(handle);
            }
            None => {
                let text = field.text().await.map_err(RequestError::from)?;
                text_fields.insert(name, text);
            }
        }
    }

    let operations = match text_fields.get("operations") {
        Some(text) => serde_json::from_str::<Value>(text).map_err(|err| {
            RequestError::InvalidJson {
                field: "operations",
                reason: err.to_string(),
            }
        })?,
        None => {
            return Err(NormalizeError::InvariantViolation(
                "multipart request did not provide an `operations` field".to_string(),
            ));
        }
    };
    if operations.is_array() {
        return Err(RequestError::BatchingNotSupported.into());
    }
    if !operations.is_object() {
        return Err(RequestError::UnexpectedBodyShape(describe_json(&operations).to_string()).into());
    }

    let map: IndexMap<String, Vec<String>> = match text_fields.get("map") {
        Some(text) => serde_json::from_str(text).map_err(|err| RequestError::InvalidJson {
            field: "map",
            reason: err.to_string(),
        })?,
        None => return Err(RequestError::MissingMap.into()),
    };

    let mut operations = operations;
    let mut uploads = UploadMap::default();
    for (file_field, paths) in map {
        let Some(handles) = file_fields.get(&file_field) else {
            return Err(RequestError::MissingFilePart(file_field).into());
        };
        let slot = match handles.as_slice() {
            [single] => UploadSlot::Single(single.clone()),
            _ => UploadSlot::Multiple(handles.clone()),
        };
        for path in paths {
            // A numeric first segment addresses an operation inside a batch.
            if path
                .split('.')
                .next()
                .is_some_and(|segment| segment.parse::<usize>().is_ok())
            {
                return Err(RequestError::BatchingNotSupported.into());
            }
            write_placeholder(&mut operations, &path, &file_field)?;
            uploads.insert(path, file_field.clone(), slot.clone());
        }
    }

    from_params(operations, config.variables_decode_policy, uploads)
}

/// Walk one dot-separated `map` path and write the upload marker at its leaf.
///
/// Missing intermediate segments are created as objects. Existing arrays are
/// indexed, never grown; an out-of-range index is a client error.
fn write_placeholder(root: &mut Value, path: &str, file_field: &str) -> Result<(), RequestError> {
    if path.is_empty() {
        return Err(RequestError::InvalidMapPath(path.to_string()));
    }
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        current = match current {
            Value::Array(items) => {
                let index = segment
                    .parse::<usize>()
                    .map_err(|_| RequestError::InvalidMapPath(path.to_string()))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| RequestError::InvalidMapPath(path.to_string()))?
            }
            Value::Object(object) => {
                let replace = match object.get(segment) {
                    None => true,
                    Some(existing) => !is_last && !existing.is_object() && !existing.is_array(),
                };
                if replace {
                    let filler = if is_last {
                        Value::Null
                    } else {
                        Value::Object(serde_json::Map::new())
                    };
                    object.insert(segment.to_string(), filler);
                }
                object
                    .get_mut(segment)
                    .ok_or_else(|| RequestError::InvalidMapPath(path.to_string()))?
            }
            _ => return Err(RequestError::InvalidMapPath(path.to_string())),
        };
    }
    *current = Value::String(upload_placeholder(file_field));
    Ok(())
}

/// Spool one file part to temporary storage and hand back its metadata.
async fn spool(
    file_name: String,
    content_type: Option<String>,
    content: Bytes,
    spool_dir: Option<&Path>,
) -> Result<FileHandle, NormalizeError> {
    let dir: PathBuf = spool_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let spool_failure =
        |err: &dyn std::fmt::Display| NormalizeError::InvariantViolation(format!(
            "failed to spool uploaded file: {err}"
        ));

    let temp_path = tempfile::Builder::new()
        .prefix("graphql-upload-")
        .tempfile_in(&dir)
        .map_err(|err| spool_failure(&err))?
        .into_temp_path()
        .keep()
        .map_err(|err| spool_failure(&err))?;
    let size = content.len() as u64;
    tokio::fs::write(&temp_path, content)
        .await
        .map_err(|err| spool_failure(&err))?;

    Ok(FileHandle {
        file_name,
        temp_path,
        content_type,
        size,
    })
}
