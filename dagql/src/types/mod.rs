//! The typed-value model shared by every value flowing through the engine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::context::Context;
use crate::error::DagqlError;
use crate::id::Id;
use crate::json_ext::Value;
use crate::literal::Literal;
use crate::selection::Selector;

mod id_ref;
mod scalars;
mod wrappers;

pub use id_ref::IdRef;
pub use id_ref::IdScalar;
pub use scalars::BooleanValue;
pub use scalars::BuiltinScalar;
pub use scalars::EnumType;
pub use scalars::EnumValue;
pub use scalars::FloatValue;
pub use scalars::IntValue;
pub use scalars::ScalarType;
pub use scalars::StringValue;
pub use wrappers::Array;
pub use wrappers::Optional;

/// A shared, type-erased value.
pub type TypedValue = Arc<dyn Typed>;

/// A reference to a GraphQL type, as written in SDL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(elem: TypeRef) -> Self {
        TypeRef::List(Box::new(elem))
    }

    /// Wraps the type as non-null. Already non-null types are returned as is.
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    /// The innermost named type.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// The type with any outer non-null marker removed.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), TypeRef::List(_))
    }

    /// The element type, if this is a list type.
    pub fn elem(&self) -> Option<&TypeRef> {
        match self.nullable() {
            TypeRef::List(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::List(elem) => write!(f, "[{elem}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Dynamic downcasting support for trait objects.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A value with a GraphQL type.
///
/// Scalars report their literal and JSON forms; object values leave the
/// defaults in place since they are only ever seen through their [`Id`].
pub trait Typed: AsAny + fmt::Debug {
    fn type_ref(&self) -> TypeRef;

    fn to_literal(&self) -> Literal {
        Literal::Null
    }

    fn to_json(&self) -> Value {
        Value::Null
    }

    /// Returns the value as a selectable object if it already is one.
    fn into_object(self: Arc<Self>) -> Option<Arc<dyn Object>> {
        None
    }

    fn as_enumerable(&self) -> Option<&dyn Enumerable> {
        None
    }

    fn as_nullable(&self) -> Option<&dyn Nullable> {
        None
    }
}

impl dyn Typed {
    pub fn downcast_ref<T: Typed>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Typed>(self: Arc<Self>) -> Option<Arc<T>> {
        self.into_any().downcast::<T>().ok()
    }

    /// Resolves a nullable wrapper to its inner value, or `None` for null.
    /// Values that are not nullable are returned unchanged.
    pub fn unwrap_nullable(self: Arc<Self>) -> Option<TypedValue> {
        match self.as_nullable() {
            Some(nullable) => nullable.value(),
            None => Some(self),
        }
    }
}

/// A Rust type that backs a GraphQL object type.
pub trait ObjectValue: Typed {
    const TYPE_NAME: &'static str;
}

/// A value that can be selected from: it has an identity and answers field calls.
#[async_trait]
pub trait Object: Typed {
    fn id(&self) -> &Id;

    async fn select(&self, ctx: &Context, selector: &Selector) -> Result<TypedValue, DagqlError>;
}

/// A list-shaped value.
pub trait Enumerable: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the 1-based `nth` element.
    fn nth(&self, nth: usize) -> Result<TypedValue, DagqlError>;
}

/// A value that may be absent.
pub trait Nullable: Send + Sync {
    fn value(&self) -> Option<TypedValue>;
}

/// Conversion into a [`TypedValue`].
pub trait IntoTyped {
    fn into_typed(self) -> TypedValue;
}

impl<T: Typed> IntoTyped for T {
    fn into_typed(self) -> TypedValue {
        Arc::new(self)
    }
}

impl IntoTyped for TypedValue {
    fn into_typed(self) -> TypedValue {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_display() {
        let ty = TypeRef::list(TypeRef::named("String").non_null()).non_null();
        assert_eq!(ty.to_string(), "[String!]!");
        assert_eq!(ty.name(), "String");
        assert!(ty.is_list());
        assert_eq!(ty.elem(), Some(&TypeRef::named("String").non_null()));
    }

    #[test]
    fn non_null_is_idempotent() {
        let ty = TypeRef::named("Int").non_null().non_null();
        assert_eq!(ty.to_string(), "Int!");
        assert_eq!(ty.nullable(), &TypeRef::named("Int"));
        assert!(!ty.is_list());
        assert_eq!(ty.elem(), None);
    }

    #[test]
    fn downcast_through_trait_object() {
        let value: TypedValue = StringValue::from("hi").into_typed();
        assert_eq!(
            value.downcast_ref::<StringValue>().map(StringValue::as_str),
            Some("hi")
        );
        assert!(value.downcast_ref::<IntValue>().is_none());
        assert!(value.clone().downcast_arc::<IntValue>().is_none());
        assert!(value.downcast_arc::<StringValue>().is_some());
    }

    #[test]
    fn unwrap_nullable_passes_plain_values_through() {
        let plain = IntValue(1).into_typed();
        assert!(plain.unwrap_nullable().is_some());
        let null = Optional::none(TypeRef::named("Int")).into_typed();
        assert!(null.unwrap_nullable().is_none());
        let some = Optional::some(IntValue(2).into_typed()).into_typed();
        let inner = some.unwrap_nullable().unwrap();
        assert_eq!(inner.downcast_ref::<IntValue>(), Some(&IntValue(2)));
    }
}
