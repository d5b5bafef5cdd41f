//! Input literals: the untyped form of argument values.
//!
//! Literals appear in two places: as arguments in inbound query documents, and
//! as the recorded arguments of an [`Id`]. Typed values are produced from them
//! by [`Server::decode_literal`](crate::Server::decode_literal) and turn back
//! into them through [`Typed::to_literal`](crate::types::Typed::to_literal).

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DagqlError;
use crate::id::Id;
use crate::json_ext::Object;
use crate::json_ext::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    Id(Box<Id>),
    List(Vec<Literal>),
    Object(Vec<(String, Literal)>),
    Variable(String),
}

impl Literal {
    /// Converts a JSON variable value into a literal.
    ///
    /// Whole numbers become [`Literal::Int`]; strings stay strings, since
    /// enum and ID values are recognised later against the argument type.
    pub fn from_json(value: &Value) -> Literal {
        match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Literal::String(s.as_str().to_string()),
            Value::Array(items) => Literal::List(items.iter().map(Literal::from_json).collect()),
            Value::Object(fields) => Literal::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), Literal::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Replaces every variable reference with its value from `variables`.
    pub fn substitute(&self, variables: &Object) -> Result<Literal, DagqlError> {
        Ok(match self {
            Literal::Variable(name) => variables
                .get(name.as_str())
                .map(Literal::from_json)
                .ok_or_else(|| DagqlError::UndefinedVariable(name.clone()))?,
            Literal::List(items) => Literal::List(
                items
                    .iter()
                    .map(|item| item.substitute(variables))
                    .collect::<Result<_, _>>()?,
            ),
            Literal::Object(fields) => Literal::Object(
                fields
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), value.substitute(variables)?)))
                    .collect::<Result<_, DagqlError>>()?,
            ),
            other => other.clone(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// False when a NaN or infinite float appears anywhere in the literal.
    pub fn is_finite(&self) -> bool {
        match self {
            Literal::Float(x) => x.is_finite(),
            Literal::List(items) => items.iter().all(Literal::is_finite),
            Literal::Object(fields) => fields.iter().all(|(_, value)| value.is_finite()),
            Literal::Id(id) => id
                .selectors()
                .iter()
                .flat_map(|selector| &selector.args)
                .all(|arg| arg.value.is_finite()),
            _ => true,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::String(s) => write_quoted(f, s),
            Literal::Enum(e) => write!(f, "{e}"),
            Literal::Id(id) => match id.encode() {
                Ok(encoded) => write_quoted(f, &encoded),
                Err(_) => write_quoted(f, &id.to_string()),
            },
            Literal::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Literal::Object(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Literal::Variable(name) => write!(f, "${name}"),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => write!(f, "{quoted}"),
        Err(_) => write!(f, "{s:?}"),
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Int(i.into())
    }
}

impl From<f64> for Literal {
    fn from(x: f64) -> Self {
        Literal::Float(x)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<Id> for Literal {
    fn from(id: Id) -> Self {
        Literal::Id(Box::new(id))
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(items: Vec<T>) -> Self {
        Literal::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn display_uses_graphql_syntax() {
        let literal = Literal::List(vec![
            Literal::Int(1),
            Literal::String("a \"b\"".to_string()),
            Literal::Enum("HAPPY".to_string()),
            Literal::Float(1.0),
            Literal::Null,
            Literal::Variable("name".to_string()),
            Literal::Object(vec![("x".to_string(), Literal::Bool(true))]),
        ]);
        assert_eq!(
            literal.to_string(),
            r#"[1, "a \"b\"", HAPPY, 1.0, null, $name, {x: true}]"#
        );
    }

    #[test]
    fn from_json_keeps_integers_integral() {
        assert_eq!(Literal::from_json(&json!(3)), Literal::Int(3));
        assert_eq!(Literal::from_json(&json!(3.5)), Literal::Float(3.5));
        assert_eq!(
            Literal::from_json(&json!(["a", null])),
            Literal::List(vec![Literal::from("a"), Literal::Null])
        );
    }

    #[test]
    fn substitute_replaces_nested_variables() {
        let mut variables = Object::new();
        variables.insert("who", json!("Ada"));
        let literal = Literal::List(vec![Literal::Variable("who".to_string()), Literal::Int(1)]);
        assert_eq!(
            literal.substitute(&variables).unwrap(),
            Literal::List(vec![Literal::from("Ada"), Literal::Int(1)])
        );
    }

    #[test]
    fn substitute_rejects_undefined_variables() {
        let err = Literal::Variable("missing".to_string())
            .substitute(&Object::new())
            .unwrap_err();
        assert_eq!(err, DagqlError::UndefinedVariable("missing".to_string()));
        assert_eq!(err.to_string(), r#"undefined variable: "$missing""#);
    }
}
