//! Schema assembly: descriptors in, engine schema out.
//!
//! Assembly is the one place descriptors meet the engine. Every field is
//! compiled through the resolver pipeline, type references are checked
//! against the registry, and introspection is switched off unless the
//! endpoint runs in debug mode.

mod registry;

use std::collections::HashSet;

use async_graphql::dynamic;
use indexmap::IndexMap;
use serde_json::Value;

pub use self::registry::SchemaRegistry;
use self::registry::TypeEntry;
use crate::descriptor::EnumDescriptor;
use crate::descriptor::FieldDescriptor;
use crate::descriptor::FieldSpec;
use crate::descriptor::TypeDescriptor;
use crate::descriptor::TypeRef;
use crate::descriptor::UPLOAD_TYPE_NAME;
use crate::error::ConfigurationError;
use crate::resolver::ResolveRequest;
use crate::resolver::ResolverPipeline;

/// Assembly-time switches.
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// Allow schema introspection. Off by default so production schemas do
    /// not leak; the endpoint turns it on in debug mode.
    pub introspection: bool,
}

struct Assembly<'a> {
    known: HashSet<&'a str>,
    uses_upload: bool,
}

impl Assembly<'_> {
    fn check_type(&mut self, field: &str, type_ref: &TypeRef) -> Result<(), ConfigurationError> {
        let base = type_ref.base_name();
        if base == UPLOAD_TYPE_NAME {
            self.uses_upload = true;
        }
        if self.known.contains(base) {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidFieldSpecification {
                field: field.to_string(),
                type_name: base.to_string(),
            })
        }
    }
}

pub(crate) fn assemble(
    types: &IndexMap<String, TypeEntry>,
    queries: IndexMap<String, FieldSpec>,
    mutations: IndexMap<String, FieldSpec>,
    options: &SchemaOptions,
) -> Result<dynamic::Schema, ConfigurationError> {
    let mut assembly = Assembly {
        known: registry::RESERVED_NAMES
            .iter()
            .copied()
            .chain(types.keys().map(String::as_str))
            .collect(),
        uses_upload: false,
    };

    let query = build_root_object("Query", queries, &mut assembly)?;
    let mutation = if mutations.is_empty() {
        None
    } else {
        Some(build_root_object("Mutation", mutations, &mut assembly)?)
    };

    let mut builder = dynamic::Schema::build(
        "Query",
        mutation.is_some().then_some("Mutation"),
        None,
    );
    builder = builder.register(query);
    if let Some(mutation) = mutation {
        builder = builder.register(mutation);
    }
    for entry in types.values() {
        builder = match entry {
            TypeEntry::Object(descriptor) if descriptor.input_object => {
                builder.register(build_input_object(descriptor, &mut assembly)?)
            }
            TypeEntry::Object(descriptor) => {
                builder.register(build_object(descriptor, &mut assembly)?)
            }
            TypeEntry::Enum(descriptor) => builder.register(build_enum(descriptor)),
        };
    }
    if assembly.uses_upload {
        builder = builder.register(upload_scalar());
    }
    if !options.introspection {
        builder = builder.disable_introspection();
    }
    builder
        .finish()
        .map_err(|err| ConfigurationError::Schema(err.to_string()))
}

/// Build `Query` or `Mutation` from its name→field mapping.
///
/// Root fields must be resolvable: a descriptor without a resolver is a boot
/// failure here, not a request-time surprise. Raw engine fields pass through
/// untouched.
fn build_root_object(
    name: &str,
    fields: IndexMap<String, FieldSpec>,
    assembly: &mut Assembly<'_>,
) -> Result<dynamic::Object, ConfigurationError> {
    let mut object = dynamic::Object::new(name);
    for (field_name, spec) in fields {
        object = match spec {
            FieldSpec::Descriptor(descriptor) => {
                if descriptor.resolver.is_none() {
                    return Err(ConfigurationError::MissingResolver { field: field_name });
                }
                object.field(build_field(&field_name, &descriptor, assembly)?)
            }
            FieldSpec::Type(_) => {
                return Err(ConfigurationError::MissingResolver { field: field_name });
            }
            FieldSpec::Raw(field) => object.field(field),
        };
    }
    Ok(object)
}

fn build_object(
    descriptor: &TypeDescriptor,
    assembly: &mut Assembly<'_>,
) -> Result<dynamic::Object, ConfigurationError> {
    let mut object = dynamic::Object::new(descriptor.name.clone());
    if let Some(description) = &descriptor.description {
        object = object.description(description.clone());
    }
    for (field_name, spec) in &descriptor.fields {
        object = match spec {
            FieldSpec::Descriptor(field) => {
                object.field(build_field(field_name, field, assembly)?)
            }
            FieldSpec::Type(type_ref) => {
                assembly.check_type(field_name, type_ref)?;
                object.field(dynamic::Field::new(
                    field_name.clone(),
                    type_ref.to_engine(),
                    ResolverPipeline::new(
                        field_name.clone(),
                        property_resolver(),
                        None,
                        Vec::new(),
                        Vec::new(),
                    )
                    .into_engine_resolver(),
                ))
            }
            FieldSpec::Raw(_) => {
                return Err(ConfigurationError::RawFieldInType {
                    type_name: descriptor.name.clone(),
                });
            }
        };
    }
    Ok(object)
}

/// Compile one descriptor field into an engine field.
///
/// The field name comes from the mapping key, never from the descriptor. A
/// descriptor without a resolver falls back to property lookup on the parent
/// object, still wrapped in the pipeline so authorizers and rules apply.
fn build_field(
    name: &str,
    descriptor: &FieldDescriptor,
    assembly: &mut Assembly<'_>,
) -> Result<dynamic::Field, ConfigurationError> {
    assembly.check_type(name, &descriptor.type_ref)?;

    let resolver = descriptor
        .resolver
        .clone()
        .unwrap_or_else(property_resolver);
    let pipeline = ResolverPipeline::new(
        name.to_string(),
        resolver,
        descriptor.authorizer.clone(),
        descriptor.rules.clone(),
        descriptor.declared_argument_names(),
    );

    let mut field = dynamic::Field::new(
        name.to_string(),
        descriptor.type_ref.to_engine(),
        pipeline.into_engine_resolver(),
    );
    if let Some(description) = &descriptor.description {
        field = field.description(description.clone());
    }
    for argument in &descriptor.arguments {
        assembly.check_type(&argument.name, &argument.type_ref)?;
        let mut input = dynamic::InputValue::new(
            argument.name.clone(),
            argument.type_ref.to_engine(),
        );
        if let Some(description) = &argument.description {
            input = input.description(description.clone());
        }
        if let Some(default) = &argument.default {
            let default = async_graphql::Value::from_json(default.clone())
                .map_err(|err| ConfigurationError::Schema(err.to_string()))?;
            input = input.default_value(default);
        }
        field = field.argument(input);
    }
    Ok(field)
}

fn build_input_object(
    descriptor: &TypeDescriptor,
    assembly: &mut Assembly<'_>,
) -> Result<dynamic::InputObject, ConfigurationError> {
    let mut object = dynamic::InputObject::new(descriptor.name.clone());
    if let Some(description) = &descriptor.description {
        object = object.description(description.clone());
    }
    for (field_name, spec) in &descriptor.fields {
        let type_ref = match spec {
            FieldSpec::Descriptor(field) => &field.type_ref,
            FieldSpec::Type(type_ref) => type_ref,
            FieldSpec::Raw(_) => {
                return Err(ConfigurationError::RawFieldInType {
                    type_name: descriptor.name.clone(),
                });
            }
        };
        assembly.check_type(field_name, type_ref)?;
        object = object.field(dynamic::InputValue::new(
            field_name.clone(),
            type_ref.to_engine(),
        ));
    }
    Ok(object)
}

fn build_enum(descriptor: &EnumDescriptor) -> dynamic::Enum {
    let mut engine_enum = dynamic::Enum::new(descriptor.name.clone());
    if let Some(description) = &descriptor.description {
        engine_enum = engine_enum.description(description.clone());
    }
    for label in descriptor.values.keys() {
        engine_enum = engine_enum.item(dynamic::EnumItem::new(label.clone()));
    }
    engine_enum
}

/// The `Upload` scalar. Values only ever enter through multipart variables
/// and reach resolvers as `<upload:FIELD>` placeholder strings.
fn upload_scalar() -> dynamic::Scalar {
    dynamic::Scalar::new(UPLOAD_TYPE_NAME)
        .description(
            "The `Upload` special type represents a file to be uploaded in the same HTTP \
             request as specified by graphql-multipart-request-spec.",
        )
        .validator(|value| {
            matches!(value, async_graphql::Value::String(s) if s.starts_with("<upload:"))
        })
}

/// Resolves a field to the parent JSON object's property of the same name.
fn property_resolver() -> crate::resolver::Resolver {
    crate::resolver::resolver(|request: ResolveRequest| async move {
        Ok(match &request.parent {
            Value::Object(map) => map
                .get(&request.field_name)
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resolver::resolver;

    fn name_field() -> FieldDescriptor {
        FieldDescriptor::builder()
            .type_ref(TypeRef::string())
            .resolver(resolver(|_request| async { Ok(json!("ada")) }))
            .build()
    }

    #[test]
    fn root_field_without_resolver_fails_at_assembly() {
        let registry = SchemaRegistry::new();
        let mut queries = IndexMap::new();
        queries.insert(
            "name".to_string(),
            FieldSpec::Descriptor(FieldDescriptor::builder().type_ref(TypeRef::string()).build()),
        );
        let err = registry
            .build_schema(queries, IndexMap::new(), &SchemaOptions::default())
            .expect_err("must fail at boot");
        assert!(matches!(err, ConfigurationError::MissingResolver { field } if field == "name"));
    }

    #[test]
    fn unknown_type_reference_fails_at_assembly() {
        let registry = SchemaRegistry::new();
        let mut queries = IndexMap::new();
        queries.insert(
            "account".to_string(),
            FieldSpec::Descriptor(
                FieldDescriptor::builder()
                    .type_ref(TypeRef::named("Account"))
                    .resolver(resolver(|_request| async { Ok(json!(null)) }))
                    .build(),
            ),
        );
        let err = registry
            .build_schema(queries, IndexMap::new(), &SchemaOptions::default())
            .expect_err("must fail at boot");
        assert!(matches!(
            err,
            ConfigurationError::InvalidFieldSpecification { type_name, .. } if type_name == "Account"
        ));
    }

    #[test]
    fn mutation_root_is_omitted_when_empty() {
        let registry = SchemaRegistry::new();
        let mut queries = IndexMap::new();
        queries.insert("name".to_string(), FieldSpec::Descriptor(name_field()));
        let schema = registry
            .build_schema(queries, IndexMap::new(), &SchemaOptions::default())
            .expect("schema builds");
        assert!(!schema.sdl().contains("type Mutation"));
    }

    #[test]
    fn recursive_type_graphs_assemble() {
        let registry = SchemaRegistry::new();
        registry
            .register_type(
                TypeDescriptor::builder()
                    .name("Employee")
                    .field("name", FieldSpec::Type(TypeRef::string()))
                    .field("manager", FieldSpec::Type(TypeRef::named("Employee")))
                    .build(),
            )
            .expect("registers");
        let mut queries = IndexMap::new();
        queries.insert(
            "employee".to_string(),
            FieldSpec::Descriptor(
                FieldDescriptor::builder()
                    .type_ref(TypeRef::named("Employee"))
                    .resolver(resolver(|_request| async {
                        Ok(json!({"name": "ada", "manager": {"name": "grace"}}))
                    }))
                    .build(),
            ),
        );
        registry
            .build_schema(queries, IndexMap::new(), &SchemaOptions::default())
            .expect("recursive schema builds");
    }

    #[test]
    fn introspection_is_rejected_unless_enabled() {
        let build = |introspection: bool| {
            let registry = SchemaRegistry::new();
            let mut queries = IndexMap::new();
            queries.insert("name".to_string(), FieldSpec::Descriptor(name_field()));
            registry
                .build_schema(queries, IndexMap::new(), &SchemaOptions { introspection })
                .expect("schema builds")
        };

        let query = "{ __schema { queryType { name } } }";
        let closed = futures::executor::block_on(
            build(false).execute(async_graphql::Request::new(query)),
        );
        assert!(!closed.errors.is_empty());

        let open = futures::executor::block_on(
            build(true).execute(async_graphql::Request::new(query)),
        );
        assert!(open.errors.is_empty());
    }
}
