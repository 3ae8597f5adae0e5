//! Transport-independent type references.

use async_graphql::dynamic;

/// Name of the file-upload scalar registered by the assembler.
pub const UPLOAD_TYPE_NAME: &str = "Upload";

/// A reference to a schema type by name, with list and non-null wrapping.
///
/// Descriptors reference types through `TypeRef` rather than holding engine
/// type objects, which is what lets mutually-recursive type graphs assemble
/// without infinite construction: the engine resolves names lazily at
/// introspection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A named type.
    Named(String),
    /// A list of the inner type.
    List(Box<TypeRef>),
    /// The inner type, non-nullable.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Reference a type by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The built-in `String` scalar.
    pub fn string() -> Self {
        Self::named(dynamic::TypeRef::STRING)
    }

    /// The built-in `Int` scalar.
    pub fn int() -> Self {
        Self::named(dynamic::TypeRef::INT)
    }

    /// The built-in `Float` scalar.
    pub fn float() -> Self {
        Self::named(dynamic::TypeRef::FLOAT)
    }

    /// The built-in `Boolean` scalar.
    pub fn boolean() -> Self {
        Self::named(dynamic::TypeRef::BOOLEAN)
    }

    /// The built-in `ID` scalar.
    pub fn id() -> Self {
        Self::named(dynamic::TypeRef::ID)
    }

    /// The `Upload` scalar for multipart file uploads.
    pub fn upload() -> Self {
        Self::named(UPLOAD_TYPE_NAME)
    }

    /// Wrap `self` in a list.
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Mark `self` non-nullable.
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// The underlying named type, stripped of list/non-null wrappers.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    pub(crate) fn to_engine(&self) -> dynamic::TypeRef {
        match self {
            Self::Named(name) => dynamic::TypeRef::Named(name.clone().into()),
            Self::List(inner) => dynamic::TypeRef::List(Box::new(inner.to_engine())),
            Self::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(inner.to_engine())),
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}
