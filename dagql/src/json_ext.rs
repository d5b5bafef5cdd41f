//! JSON helpers shared by responses and errors.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = serde_json_bytes::Map<ByteString, Value>;

/// A path into a response, used to attribute errors.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

/// One element of a [`Path`]: an object key or a 0-based list index.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// A list index.
    Index(usize),

    /// An object key (alias or field name).
    Key(String),
}

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/")?;
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

/// Builds a JSON number from a float, mapping non-finite values to null.
pub(crate) fn float_to_value(float: f64) -> Value {
    serde_json::Number::from_f64(float)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display() {
        let path = Path(vec![
            PathElement::Key("container".to_string()),
            PathElement::Index(2),
            PathElement::Key("name".to_string()),
        ]);
        assert_eq!(path.to_string(), "/container/2/name");
        assert_eq!(Path::empty().to_string(), "");
    }

    #[test]
    fn path_serializes_untagged() {
        let path = Path(vec![
            PathElement::Key("items".to_string()),
            PathElement::Index(0),
        ]);
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#"["items",0]"#.to_string()
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float_to_value(f64::NAN), Value::Null);
        assert_eq!(float_to_value(1.5), serde_json_bytes::json!(1.5));
    }
}
