//! Enum type descriptors.

use indexmap::IndexMap;
use serde_json::Value;

/// A declarative enum type: labels exposed in the schema, mapped to the
/// internal values resolvers work with.
///
/// The engine only ever sees the labels; [`EnumDescriptor::value_of`] recovers
/// the configured internal value from a label received in arguments.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    /// Unique type name.
    pub name: String,
    /// Type documentation.
    pub description: Option<String>,
    /// Label → internal value, in declaration order.
    pub values: IndexMap<String, Value>,
}

#[buildstructor::buildstructor]
impl EnumDescriptor {
    #[builder(visibility = "pub")]
    fn new(name: String, description: Option<String>, values: IndexMap<String, Value>) -> Self {
        Self {
            name,
            description,
            values,
        }
    }

    /// The internal value configured for a label.
    pub fn value_of(&self, label: &str) -> Option<&Value> {
        self.values.get(label)
    }

    /// The label configured for an internal value.
    pub fn label_of(&self, value: &Value) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, candidate)| *candidate == value)
            .map(|(label, _)| label.as_str())
    }
}
