//! Ready-made pagination wrapper type.

use crate::descriptor::FieldSpec;
use crate::descriptor::TypeDescriptor;
use crate::descriptor::TypeRef;

/// Build a pagination object type around an item type.
///
/// The resulting type exposes the conventional page envelope over a JSON page
/// object produced by the resolver:
/// `{data, total, per_page, current_page, page_count}`. The type is named
/// `<Item>Pagination` unless a custom name is given; register it once and
/// reference it by name from any paginated field.
pub fn pagination_type(item: TypeRef, custom_name: Option<String>) -> TypeDescriptor {
    let name = custom_name.unwrap_or_else(|| format!("{}Pagination", item.base_name()));
    let field = |type_ref: TypeRef, description: &str| {
        FieldSpec::Descriptor(
            crate::descriptor::FieldDescriptor::builder()
                .type_ref(type_ref)
                .description(description)
                .build(),
        )
    };
    TypeDescriptor::builder()
        .name(name)
        .field(
            "data",
            field(item.list(), "List of items on the current page"),
        )
        .field(
            "total",
            field(
                TypeRef::int().non_null(),
                "Number of total items selected by the query",
            ),
        )
        .field(
            "per_page",
            field(
                TypeRef::int().non_null(),
                "Number of items returned per page",
            ),
        )
        .field(
            "current_page",
            field(TypeRef::int().non_null(), "Current page of the cursor"),
        )
        .field(
            "page_count",
            field(TypeRef::int().non_null(), "Total number of pages"),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_from_item_type() {
        let ty = pagination_type(TypeRef::named("User"), None);
        assert_eq!(ty.name, "UserPagination");
        let names: Vec<&String> = ty.fields.keys().collect();
        assert_eq!(
            names,
            vec!["data", "total", "per_page", "current_page", "page_count"]
        );
    }

    #[test]
    fn custom_name_wins() {
        let ty = pagination_type(TypeRef::named("User"), Some("UserPage".to_string()));
        assert_eq!(ty.name, "UserPage");
    }
}
