//! Uploaded-file bookkeeping for multipart requests.

use std::path::PathBuf;

use indexmap::IndexMap;

/// An uploaded file spooled to temporary storage for the request lifetime.
///
/// The handle owns the metadata only. Removing the temp file once the request
/// completes is the host's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// The client-supplied file name.
    pub file_name: String,
    /// Where the file content was spooled.
    pub temp_path: PathBuf,
    /// The part's content type, verbatim.
    pub content_type: Option<String>,
    /// Spooled size in bytes.
    pub size: u64,
}

/// One leaf slot of the upload map: a single file, or an array-valued field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSlot {
    /// The upload slot held exactly one file.
    Single(FileHandle),
    /// The upload slot held an array of files.
    Multiple(Vec<FileHandle>),
}

impl UploadSlot {
    /// All files in this slot, single or not.
    pub fn files(&self) -> &[FileHandle] {
        match self {
            Self::Single(handle) => std::slice::from_ref(handle),
            Self::Multiple(handles) => handles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UploadEntry {
    field: String,
    slot: UploadSlot,
}

/// Placeholder-path to file-handle mapping produced by the normalizer.
///
/// Keys are the dot-separated paths from the multipart `map` field, e.g.
/// `variables.input.photo`. Several paths may share one underlying file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMap {
    entries: IndexMap<String, UploadEntry>,
}

impl UploadMap {
    pub(crate) fn insert(&mut self, path: String, field: String, slot: UploadSlot) {
        self.entries.insert(path, UploadEntry { field, slot });
    }

    /// The slot assigned to a placeholder path, if any.
    pub fn at_path(&self, path: &str) -> Option<&UploadSlot> {
        self.entries.get(path).map(|entry| &entry.slot)
    }

    /// The slot uploaded under a multipart field name, if any.
    pub fn by_field(&self, field: &str) -> Option<&UploadSlot> {
        self.entries
            .values()
            .find(|entry| entry.field == field)
            .map(|entry| &entry.slot)
    }

    /// Iterate `(placeholder path, slot)` pairs in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadSlot)> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.as_str(), &entry.slot))
    }

    /// Number of distinct placeholder paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no files were uploaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Limits applied while streaming multipart file parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum number of file parts per request.
    pub max_files: usize,
    /// Maximum size of a single file part, in bytes.
    pub max_file_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 16,
            max_file_size: 5 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> FileHandle {
        FileHandle {
            file_name: name.to_string(),
            temp_path: PathBuf::from(format!("/tmp/{name}")),
            content_type: Some("text/plain".to_string()),
            size: 3,
        }
    }

    #[test]
    fn shared_file_is_reachable_through_both_paths() {
        let mut map = UploadMap::default();
        let slot = UploadSlot::Single(handle("a.txt"));
        map.insert("variables.a".into(), "file0".into(), slot.clone());
        map.insert("variables.b".into(), "file0".into(), slot.clone());

        assert_eq!(map.at_path("variables.a"), Some(&slot));
        assert_eq!(map.at_path("variables.b"), Some(&slot));
        assert_eq!(map.by_field("file0"), Some(&slot));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn slot_files_flattens_both_shapes() {
        let single = UploadSlot::Single(handle("a.txt"));
        let multiple = UploadSlot::Multiple(vec![handle("a.txt"), handle("b.txt")]);
        assert_eq!(single.files().len(), 1);
        assert_eq!(multiple.files().len(), 2);
    }
}
