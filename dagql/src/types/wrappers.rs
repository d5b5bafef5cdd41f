use crate::error::DagqlError;
use crate::json_ext::Value;
use crate::literal::Literal;
use crate::types::Enumerable;
use crate::types::Nullable;
use crate::types::TypeRef;
use crate::types::Typed;
use crate::types::TypedValue;

/// A list of values sharing an element type.
#[derive(Clone, Debug)]
pub struct Array {
    elem: TypeRef,
    items: Vec<TypedValue>,
}

impl Array {
    pub fn new(elem: TypeRef, items: Vec<TypedValue>) -> Self {
        Array { elem, items }
    }

    pub fn items(&self) -> &[TypedValue] {
        &self.items
    }
}

impl Typed for Array {
    fn type_ref(&self) -> TypeRef {
        TypeRef::list(self.elem.clone()).non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::List(self.items.iter().map(|item| item.to_literal()).collect())
    }

    fn to_json(&self) -> Value {
        Value::Array(self.items.iter().map(|item| item.to_json()).collect())
    }

    fn as_enumerable(&self) -> Option<&dyn Enumerable> {
        Some(self)
    }
}

impl Enumerable for Array {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn nth(&self, nth: usize) -> Result<TypedValue, DagqlError> {
        nth.checked_sub(1)
            .and_then(|index| self.items.get(index))
            .cloned()
            .ok_or(DagqlError::IndexOutOfRange {
                nth,
                len: self.items.len(),
            })
    }
}

/// A value that may be null.
#[derive(Clone, Debug)]
pub struct Optional {
    ty: TypeRef,
    value: Option<TypedValue>,
}

impl Optional {
    pub fn some(value: TypedValue) -> Self {
        Optional {
            ty: value.type_ref().nullable().clone(),
            value: Some(value),
        }
    }

    pub fn none(ty: TypeRef) -> Self {
        Optional {
            ty: ty.nullable().clone(),
            value: None,
        }
    }
}

impl Typed for Optional {
    fn type_ref(&self) -> TypeRef {
        self.ty.clone()
    }

    fn to_literal(&self) -> Literal {
        self.value
            .as_ref()
            .map(|value| value.to_literal())
            .unwrap_or(Literal::Null)
    }

    fn to_json(&self) -> Value {
        self.value
            .as_ref()
            .map(|value| value.to_json())
            .unwrap_or(Value::Null)
    }

    fn as_nullable(&self) -> Option<&dyn Nullable> {
        Some(self)
    }
}

impl Nullable for Optional {
    fn value(&self) -> Option<TypedValue> {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::types::IntValue;
    use crate::types::IntoTyped;
    use crate::types::StringValue;

    fn ints(values: &[i64]) -> Array {
        Array::new(
            TypeRef::named("Int").non_null(),
            values.iter().map(|i| IntValue(*i).into_typed()).collect(),
        )
    }

    #[test]
    fn nth_is_one_based() {
        let array = ints(&[3, 1, 2]);
        assert_eq!(array.len(), 3);
        let second = array.nth(2).unwrap();
        assert_eq!(second.downcast_ref::<IntValue>(), Some(&IntValue(1)));
        assert_eq!(
            array.nth(0).unwrap_err(),
            DagqlError::IndexOutOfRange { nth: 0, len: 3 }
        );
        assert_eq!(
            array.nth(4).unwrap_err(),
            DagqlError::IndexOutOfRange { nth: 4, len: 3 }
        );
    }

    #[test]
    fn array_forms() {
        let array = ints(&[3, 1, 2]);
        assert_eq!(array.type_ref().to_string(), "[Int!]!");
        assert_eq!(array.to_json(), json!([3, 1, 2]));
        assert_eq!(array.to_literal(), Literal::from(vec![3i64, 1, 2]));
    }

    #[test]
    fn optional_forms() {
        let some = Optional::some(StringValue::from("x").into_typed());
        assert_eq!(some.type_ref().to_string(), "String");
        assert_eq!(some.to_json(), json!("x"));

        let none = Optional::none(TypeRef::named("String").non_null());
        assert_eq!(none.type_ref().to_string(), "String");
        assert_eq!(none.to_literal(), Literal::Null);
        assert_eq!(none.to_json(), Value::Null);
    }
}
