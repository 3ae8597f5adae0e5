//! Declarative argument-validation rules.
//!
//! A rule names the attributes it applies to and the check run against each
//! of them; failures carry the attribute name so they can be aggregated per
//! field.

use std::sync::Arc;

use serde_json::Value;

type Check = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// A validation rule applied to one or more named arguments.
#[derive(Clone)]
pub struct Rule {
    fields: Vec<String>,
    check: Check,
}

impl Rule {
    /// Build a rule from field names and a check function.
    ///
    /// The check receives the field name and its value (JSON `null` when the
    /// argument was not supplied) and returns the failure message, if any.
    pub fn custom<I, S, F>(fields: I, check: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            check: Arc::new(check),
        }
    }

    /// The named arguments must be present and non-null.
    pub fn required<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::custom(fields, |field, value| {
            if value.is_null() {
                Err(format!("{field} cannot be blank."))
            } else {
                Ok(())
            }
        })
    }

    /// String arguments must contain at least `min` characters.
    ///
    /// Null values pass; combine with [`Rule::required`] to also reject
    /// absence.
    pub fn min_length<I, S>(fields: I, min: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::custom(fields, move |field, value| match value {
            Value::String(s) if s.chars().count() < min => Err(format!(
                "{field} should contain at least {min} characters."
            )),
            _ => Ok(()),
        })
    }

    /// String arguments must contain at most `max` characters.
    pub fn max_length<I, S>(fields: I, max: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::custom(fields, move |field, value| match value {
            Value::String(s) if s.chars().count() > max => {
                Err(format!("{field} should contain at most {max} characters."))
            }
            _ => Ok(()),
        })
    }

    /// Run the rule against an attribute set, yielding `(field, message)`
    /// pairs for every failing attribute.
    pub(crate) fn evaluate(
        &self,
        attributes: &serde_json::Map<String, Value>,
    ) -> Vec<(String, String)> {
        let mut failures = Vec::new();
        for field in &self.fields {
            let value = attributes.get(field).unwrap_or(&Value::Null);
            if let Err(message) = (self.check)(field, value) {
                failures.push((field.clone(), message));
            }
        }
        failures
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attrs(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().expect("object fixture").clone()
    }

    #[test]
    fn required_rejects_null_and_absent() {
        let rule = Rule::required(["name", "email"]);
        let failures = rule.evaluate(&attrs(json!({"name": null})));
        assert_eq!(
            failures,
            vec![
                ("name".to_string(), "name cannot be blank.".to_string()),
                ("email".to_string(), "email cannot be blank.".to_string()),
            ]
        );
    }

    #[test]
    fn length_rules_ignore_null() {
        let rule = Rule::min_length(["name"], 3);
        assert!(rule.evaluate(&attrs(json!({"name": null}))).is_empty());
        assert!(rule.evaluate(&attrs(json!({"name": "abc"}))).is_empty());
        assert_eq!(rule.evaluate(&attrs(json!({"name": "ab"}))).len(), 1);
    }
}
