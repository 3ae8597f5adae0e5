//! Field and argument descriptors.

use serde_json::Value;

use crate::descriptor::TypeRef;
use crate::resolver::Authorizer;
use crate::resolver::Resolver;
use crate::resolver::Rule;

/// A declared field argument, ordered within its field.
#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    /// The argument name.
    pub name: String,
    /// The argument type.
    pub type_ref: TypeRef,
    /// Optional documentation.
    pub description: Option<String>,
    /// Optional default applied by the engine when the argument is absent.
    pub default: Option<Value>,
}

#[buildstructor::buildstructor]
impl ArgumentDescriptor {
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        type_ref: TypeRef,
        description: Option<String>,
        default: Option<Value>,
    ) -> Self {
        Self {
            name,
            type_ref,
            description,
            default,
        }
    }
}

/// A declarative, transport-independent description of one field.
///
/// Immutable once constructed. Capabilities are explicit tagged optionals:
/// a field either carries a resolver/authorizer or it does not — there is no
/// name-based method lookup at request time.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Name used when the field is embedded by reference rather than under a
    /// mapping key.
    pub name: Option<String>,
    /// Field documentation.
    pub description: Option<String>,
    /// The field's result type.
    pub type_ref: TypeRef,
    /// Declared arguments, in declaration order.
    pub arguments: Vec<ArgumentDescriptor>,
    /// Validation rules run against the declared arguments before resolving.
    pub rules: Vec<Rule>,
    /// The resolver computing the field value.
    pub resolver: Option<Resolver>,
    /// Optional predicate gating the resolver.
    pub authorizer: Option<Authorizer>,
}

#[buildstructor::buildstructor]
impl FieldDescriptor {
    /// Builder for a field descriptor; only the result type is mandatory.
    #[builder(visibility = "pub")]
    fn new(
        name: Option<String>,
        description: Option<String>,
        type_ref: TypeRef,
        arguments: Vec<ArgumentDescriptor>,
        rules: Vec<Rule>,
        resolver: Option<Resolver>,
        authorizer: Option<Authorizer>,
    ) -> Self {
        Self {
            name,
            description,
            type_ref,
            arguments,
            rules,
            resolver,
            authorizer,
        }
    }

    /// The declared argument names, in order.
    pub(crate) fn declared_argument_names(&self) -> Vec<String> {
        self.arguments.iter().map(|arg| arg.name.clone()).collect()
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_ref", &self.type_ref)
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .field("has_authorizer", &self.authorizer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolver;

    #[test]
    fn builder_defaults_capabilities_to_absent() {
        let field = FieldDescriptor::builder()
            .type_ref(TypeRef::string())
            .build();
        assert!(field.resolver.is_none());
        assert!(field.authorizer.is_none());
        assert!(field.arguments.is_empty());
    }

    #[test]
    fn argument_order_is_declaration_order() {
        let field = FieldDescriptor::builder()
            .type_ref(TypeRef::string())
            .argument(
                ArgumentDescriptor::builder()
                    .name("b")
                    .type_ref(TypeRef::int())
                    .build(),
            )
            .argument(
                ArgumentDescriptor::builder()
                    .name("a")
                    .type_ref(TypeRef::int())
                    .build(),
            )
            .resolver(resolver(|_request| async { Ok(serde_json::Value::Null) }))
            .build();
        assert_eq!(field.declared_argument_names(), vec!["b", "a"]);
    }
}
