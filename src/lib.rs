//! A GraphQL endpoint toolkit for embedding applications.
//!
//! Schemas are declared as plain descriptors, registered once in a
//! [`SchemaRegistry`] and assembled into an executable schema on first use.
//! Requests arrive over any of three transport encodings, including the
//! multipart file-upload convention, and are normalized into one canonical
//! operation before execution. Every field runs through an
//! authorize/validate/resolve pipeline, and a two-tier error policy keeps
//! user-caused failures on the wire and server-caused ones in the host's
//! logs.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use graphql_endpoint::ArgumentDescriptor;
//! use graphql_endpoint::FieldDescriptor;
//! use graphql_endpoint::GraphQLEndpoint;
//! use graphql_endpoint::SchemaRegistry;
//! use graphql_endpoint::TypeRef;
//! use graphql_endpoint::resolver;
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new();
//! let mut queries = IndexMap::new();
//! queries.insert(
//!     "greet".to_string(),
//!     FieldDescriptor::builder()
//!         .type_ref(TypeRef::string())
//!         .resolver(resolver(|request| async move {
//!             Ok(json!(format!("hello, {}", request.arg("name"))))
//!         }))
//!         .argument(
//!             ArgumentDescriptor::builder()
//!                 .name("name")
//!                 .type_ref(TypeRef::string())
//!                 .build(),
//!         )
//!         .build()
//!         .into(),
//! );
//! let endpoint = Arc::new(
//!     GraphQLEndpoint::builder()
//!         .registry(registry)
//!         .queries(queries)
//!         .build(),
//! );
//! ```

mod context;
mod descriptor;
mod endpoint;
mod error;
mod error_policy;
mod host;
mod request;
mod resolver;
mod schema;

pub use crate::context::RequestContext;
pub use crate::descriptor::ArgumentDescriptor;
pub use crate::descriptor::EnumDescriptor;
pub use crate::descriptor::FieldDescriptor;
pub use crate::descriptor::FieldSpec;
pub use crate::descriptor::TypeDescriptor;
pub use crate::descriptor::TypeRef;
pub use crate::descriptor::UPLOAD_TYPE_NAME;
pub use crate::descriptor::pagination_type;
pub use crate::endpoint::GraphQLEndpoint;
pub use crate::endpoint::GraphQLService;
pub use crate::error::ConfigurationError;
pub use crate::error::FieldError;
pub use crate::error::NormalizeError;
pub use crate::error::RequestError;
pub use crate::error::ValidationFailure;
pub use crate::host::Host;
pub use crate::host::TracingHost;
pub use crate::request::NormalizedOperation;
pub use crate::request::NormalizerConfig;
pub use crate::request::VariablesDecodePolicy;
pub use crate::request::files::FileHandle;
pub use crate::request::files::UploadLimits;
pub use crate::request::files::UploadMap;
pub use crate::request::files::UploadSlot;
pub use crate::request::normalize;
pub use crate::resolver::Authorizer;
pub use crate::resolver::ResolveRequest;
pub use crate::resolver::Resolver;
pub use crate::resolver::Rule;
pub use crate::resolver::authorizer;
pub use crate::resolver::resolver;
pub use crate::schema::SchemaOptions;
pub use crate::schema::SchemaRegistry;
