//! Per-request context shared with every resolver invocation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::request::files::UploadMap;
use crate::request::files::UploadSlot;

/// Cheaply-cloneable per-request state handed to resolvers.
///
/// Holds the uploaded-file map produced by the request normalizer and a typed
/// extensions store the host may populate before execution (current user,
/// database handles, and so on). Safe to clone across concurrently-resolved
/// sibling fields; it owns no mutable state besides the extensions store.
#[derive(Clone, Default)]
pub struct RequestContext {
    uploads: Arc<UploadMap>,
    extensions: Arc<Mutex<http::Extensions>>,
}

impl RequestContext {
    pub(crate) fn new(uploads: UploadMap) -> Self {
        Self {
            uploads: Arc::new(uploads),
            extensions: Arc::default(),
        }
    }

    /// The uploaded files for this request, keyed by placeholder path.
    pub fn uploads(&self) -> &UploadMap {
        &self.uploads
    }

    /// Resolve an `Upload`-typed argument value to its file slot.
    ///
    /// Upload arguments reach resolvers as `<upload:FIELD>` placeholder
    /// strings; this accepts either such a placeholder or a raw placeholder
    /// path from the multipart `map`.
    pub fn upload(&self, value: &str) -> Option<&UploadSlot> {
        if let Some(field) = value
            .strip_prefix("<upload:")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return self.uploads.by_field(field);
        }
        self.uploads.at_path(value)
    }

    /// Store a typed value for resolvers to pick up.
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.extensions.lock().insert(value);
    }

    /// Fetch a typed value previously stored by the host.
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions.lock().get::<T>().cloned()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("uploads", &self.uploads)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_round_trip() {
        #[derive(Clone, Debug, PartialEq)]
        struct CurrentUser(String);

        let context = RequestContext::default();
        context.insert_extension(CurrentUser("alice".into()));
        assert_eq!(
            context.extension::<CurrentUser>(),
            Some(CurrentUser("alice".into()))
        );
        assert_eq!(context.extension::<u64>(), None);
    }
}
