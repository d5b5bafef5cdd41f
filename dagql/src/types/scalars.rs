use std::fmt;

use crate::error::DagqlError;
use crate::json_ext::float_to_value;
use crate::json_ext::Value;
use crate::literal::Literal;
use crate::types::IntoTyped;
use crate::types::TypeRef;
use crate::types::Typed;
use crate::types::TypedValue;

/// A scalar (or enum) type that knows how to decode literals of its kind.
pub trait ScalarType: Send + Sync {
    fn name(&self) -> &str;

    fn decode(&self, literal: &Literal) -> Result<TypedValue, DagqlError>;

    /// The SDL definition of this type, or `None` for built-in scalars.
    fn definition(&self) -> Option<String> {
        Some(format!("scalar {}", self.name()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntValue(pub i64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatValue(pub f64);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringValue(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BooleanValue(pub bool);

impl StringValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StringValue {
    fn from(s: &str) -> Self {
        StringValue(s.to_string())
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        StringValue(s)
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Typed for IntValue {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named("Int").non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::Int(self.0)
    }

    fn to_json(&self) -> Value {
        Value::Number(self.0.into())
    }
}

impl Typed for FloatValue {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named("Float").non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::Float(self.0)
    }

    fn to_json(&self) -> Value {
        float_to_value(self.0)
    }
}

impl Typed for StringValue {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named("String").non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::String(self.0.clone())
    }

    fn to_json(&self) -> Value {
        Value::String(self.0.as_str().into())
    }
}

impl Typed for BooleanValue {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named("Boolean").non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::Bool(self.0)
    }

    fn to_json(&self) -> Value {
        Value::Bool(self.0)
    }
}

/// The scalars every server knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinScalar {
    Int,
    Float,
    String,
    Boolean,
}

impl BuiltinScalar {
    pub const ALL: [BuiltinScalar; 4] = [
        BuiltinScalar::Int,
        BuiltinScalar::Float,
        BuiltinScalar::String,
        BuiltinScalar::Boolean,
    ];
}

impl ScalarType for BuiltinScalar {
    fn name(&self) -> &str {
        match self {
            BuiltinScalar::Int => "Int",
            BuiltinScalar::Float => "Float",
            BuiltinScalar::String => "String",
            BuiltinScalar::Boolean => "Boolean",
        }
    }

    fn decode(&self, literal: &Literal) -> Result<TypedValue, DagqlError> {
        match (self, literal) {
            (BuiltinScalar::Int, Literal::Int(i)) => Ok(IntValue(*i).into_typed()),
            (BuiltinScalar::Float, Literal::Float(x)) if x.is_finite() => {
                Ok(FloatValue(*x).into_typed())
            }
            (BuiltinScalar::Float, Literal::Int(i)) => Ok(FloatValue(*i as f64).into_typed()),
            (BuiltinScalar::String, Literal::String(s)) => {
                Ok(StringValue(s.clone()).into_typed())
            }
            (BuiltinScalar::Boolean, Literal::Bool(b)) => Ok(BooleanValue(*b).into_typed()),
            (scalar, literal) => Err(DagqlError::InvalidLiteral {
                reason: format!("expected {}, got {literal}", scalar.name()),
            }),
        }
    }

    fn definition(&self) -> Option<String> {
        None
    }
}

/// An enum type: a named set of allowed values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumType {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// A value of this enum, if `value` is one of its members.
    pub fn value(&self, value: &str) -> Option<EnumValue> {
        self.values.iter().any(|v| v == value).then(|| EnumValue {
            type_name: self.name.clone(),
            value: value.to_string(),
        })
    }
}

impl ScalarType for EnumType {
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, literal: &Literal) -> Result<TypedValue, DagqlError> {
        let value = match literal {
            Literal::Enum(value) | Literal::String(value) => value,
            other => {
                return Err(DagqlError::InvalidLiteral {
                    reason: format!("expected {}, got {other}", self.name),
                })
            }
        };
        self.value(value)
            .map(IntoTyped::into_typed)
            .ok_or_else(|| DagqlError::InvalidLiteral {
                reason: format!("{value} is not a valid {}", self.name),
            })
    }

    fn definition(&self) -> Option<String> {
        let mut sdl = format!("enum {} {{\n", self.name);
        for value in &self.values {
            sdl.push_str("  ");
            sdl.push_str(value);
            sdl.push('\n');
        }
        sdl.push('}');
        Some(sdl)
    }
}

/// A member of an [`EnumType`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub value: String,
}

impl Typed for EnumValue {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named(self.type_name.clone()).non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::Enum(self.value.clone())
    }

    fn to_json(&self) -> Value {
        Value::String(self.value.as_str().into())
    }
}
