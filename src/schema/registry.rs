//! Explicit registry of named types.

use async_graphql::dynamic;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::descriptor::EnumDescriptor;
use crate::descriptor::FieldSpec;
use crate::descriptor::TypeDescriptor;
use crate::error::ConfigurationError;
use crate::schema::SchemaOptions;
use crate::schema::assemble;

/// Type names the registry reserves for the engine and the assembler.
pub(crate) const RESERVED_NAMES: &[&str] = &[
    "Query",
    "Mutation",
    "Subscription",
    "Upload",
    dynamic::TypeRef::STRING,
    dynamic::TypeRef::INT,
    dynamic::TypeRef::FLOAT,
    dynamic::TypeRef::BOOLEAN,
    dynamic::TypeRef::ID,
];

pub(crate) enum TypeEntry {
    Object(TypeDescriptor),
    Enum(EnumDescriptor),
}

impl TypeEntry {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Object(descriptor) => &descriptor.name,
            Self::Enum(descriptor) => &descriptor.name,
        }
    }
}

#[derive(Default)]
struct Inner {
    types: IndexMap<String, TypeEntry>,
    frozen: bool,
}

/// Owns every named type of one schema and enforces single registration per
/// name.
///
/// Passed explicitly through construction instead of hiding type singletons
/// in process-wide statics; a fresh registry per test gives a fresh type
/// universe. Once a schema has been assembled the registry freezes and
/// further registration fails.
#[derive(Default)]
pub struct SchemaRegistry {
    inner: Mutex<Inner>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object or input-object type.
    ///
    /// Fails when the name is already taken or the registry is frozen.
    pub fn register_type(&self, descriptor: TypeDescriptor) -> Result<(), ConfigurationError> {
        self.register(TypeEntry::Object(descriptor))
    }

    /// Register an enum type.
    pub fn register_enum(&self, descriptor: EnumDescriptor) -> Result<(), ConfigurationError> {
        self.register(TypeEntry::Enum(descriptor))
    }

    /// A registered enum by name, for label/value translation in resolvers.
    pub fn enum_descriptor(&self, name: &str) -> Option<EnumDescriptor> {
        let inner = self.inner.lock();
        match inner.types.get(name) {
            Some(TypeEntry::Enum(descriptor)) => Some(descriptor.clone()),
            _ => None,
        }
    }

    fn register(&self, entry: TypeEntry) -> Result<(), ConfigurationError> {
        let mut inner = self.inner.lock();
        if inner.frozen {
            return Err(ConfigurationError::RegistryFrozen);
        }
        let name = entry.name().to_string();
        if RESERVED_NAMES.contains(&name.as_str()) || inner.types.contains_key(&name) {
            return Err(ConfigurationError::DuplicateTypeName(name));
        }
        inner.types.insert(name, entry);
        Ok(())
    }

    /// Assemble an engine schema from the registered types plus the given
    /// root operation mappings.
    ///
    /// The mutation root is omitted entirely when `mutations` is empty.
    /// Freezes the registry: the schema is the one conversion of every
    /// registered type to its engine representation.
    pub fn build_schema(
        &self,
        queries: IndexMap<String, FieldSpec>,
        mutations: IndexMap<String, FieldSpec>,
        options: &SchemaOptions,
    ) -> Result<dynamic::Schema, ConfigurationError> {
        let mut inner = self.inner.lock();
        inner.frozen = true;
        assemble(&inner.types, queries, mutations, options)
    }
}
