//! Declarative descriptions of fields, types and enums, independent of any
//! transport or engine representation.

mod enum_type;
mod field;
mod object;
mod pagination;
mod type_ref;

pub use self::enum_type::EnumDescriptor;
pub use self::field::ArgumentDescriptor;
pub use self::field::FieldDescriptor;
pub use self::object::FieldSpec;
pub use self::object::TypeDescriptor;
pub use self::pagination::pagination_type;
pub use self::type_ref::TypeRef;
pub use self::type_ref::UPLOAD_TYPE_NAME;
