//! Object and input-object type descriptors.

use async_graphql::dynamic;
use indexmap::IndexMap;

use crate::descriptor::FieldDescriptor;
use crate::descriptor::TypeRef;

/// One entry of a name→field mapping.
///
/// Mirrors the three shapes a field may be declared in: a full descriptor, a
/// bare type reference resolved by property lookup on the parent object, or a
/// pre-built engine field passed through untouched. Anything else is
/// unrepresentable by construction.
pub enum FieldSpec {
    /// A full field descriptor; the mapping key supplies the field name.
    Descriptor(FieldDescriptor),
    /// A bare type reference; the field resolves to the parent object's
    /// property of the same name.
    Type(TypeRef),
    /// A pre-built engine field, passed through as-is. The name embedded in
    /// the field wins over the mapping key. Only allowed on root operations.
    Raw(dynamic::Field),
}

impl From<FieldDescriptor> for FieldSpec {
    fn from(descriptor: FieldDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<TypeRef> for FieldSpec {
    fn from(type_ref: TypeRef) -> Self {
        Self::Type(type_ref)
    }
}

impl From<dynamic::Field> for FieldSpec {
    fn from(field: dynamic::Field) -> Self {
        Self::Raw(field)
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Descriptor(descriptor) => f.debug_tuple("Descriptor").field(descriptor).finish(),
            Self::Type(type_ref) => f.debug_tuple("Type").field(type_ref).finish(),
            Self::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

/// A declarative object or input-object type.
///
/// The name must be unique across the whole schema; the registry enforces
/// this at registration time. Conversion to an engine type happens once per
/// registry, when the schema is assembled.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// Unique type name.
    pub name: String,
    /// Type documentation.
    pub description: Option<String>,
    /// Whether this is an input object rather than an output object.
    pub input_object: bool,
    /// The fields, keyed by field name.
    pub fields: IndexMap<String, FieldSpec>,
}

#[buildstructor::buildstructor]
impl TypeDescriptor {
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        description: Option<String>,
        input_object: Option<bool>,
        fields: IndexMap<String, FieldSpec>,
    ) -> Self {
        Self {
            name,
            description,
            input_object: input_object.unwrap_or_default(),
            fields,
        }
    }
}
