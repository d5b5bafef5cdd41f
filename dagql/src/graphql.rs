//! GraphQL request and response types.

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::query::Document;

/// A query to execute: a parsed document, the operation to run and its variables.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub document: Document,
    pub operation_name: Option<String>,
    pub variables: Object,
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(document: Document, operation_name: Option<String>, variables: Option<Object>) -> Self {
        Request {
            document,
            operation_name,
            variables: variables.unwrap_or_default(),
        }
    }
}

/// An error as it appears in a response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<Path>,

    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

/// The result of executing a [`Request`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,
}

#[buildstructor::buildstructor]
impl Response {
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>) -> Self {
        Response { data, errors }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::PathElement;

    #[test]
    fn response_omits_empty_errors() {
        let response = Response::builder()
            .data(json!({ "hello": "Hello, World!" }))
            .build();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "data": { "hello": "Hello, World!" } })
        );
    }

    #[test]
    fn response_with_error() {
        let response = Response::builder()
            .error(Error {
                message: "boom".to_string(),
                path: Some(Path(vec![PathElement::Key("hello".to_string())])),
                extensions: Object::new(),
            })
            .build();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "data": null,
                "errors": [{ "message": "boom", "path": ["hello"] }]
            })
        );
    }
}
