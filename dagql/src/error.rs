//! Engine errors.

use displaydoc::Display;
use serde_json_bytes::json;
use thiserror::Error;

use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;

/// Errors raised while registering types, decoding literals and resolving selections.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DagqlError {
    /// unknown type: "{0}"
    UnknownType(String),

    /// unknown field: "{field}" on type "{type_name}"
    UnknownField { type_name: String, field: String },

    /// unknown argument: "{argument}" for field "{field}"
    UnknownArgument { field: String, argument: String },

    /// missing required argument: "{argument}" for field "{field}"
    MissingArgument { field: String, argument: String },

    /// argument "{argument}" is not a {expected}
    ArgumentType { argument: String, expected: String },

    /// unknown scalar: "{0}"
    UnknownScalar(String),

    /// unknown fragment: "{0}"
    UnknownFragment(String),

    /// unknown operation: "{0}"
    UnknownOperation(String),

    /// fragment "{0}" spreads itself
    FragmentCycle(String),

    /// undefined variable: "${0}"
    UndefinedVariable(String),

    /// invalid literal: {reason}
    InvalidLiteral { reason: String },

    /// invalid ID: {reason}
    InvalidId { reason: String },

    /// not implemented: {0}
    NotImplemented(String),

    /// cannot sub-select {type_name}
    CannotSubselect { type_name: String },

    /// field "{field}" of type {type_name} must have a selection of subfields
    MissingSubselection { field: String, type_name: String },

    /// cannot select item {nth} from non-list {type_name}
    CannotIndex { nth: usize, type_name: String },

    /// index {nth} out of range for list of length {len}
    IndexOutOfRange { nth: usize, len: usize },

    /// {0} not supported
    UnsupportedOperation(String),

    /// selection depth limit ({limit}) exceeded
    RecursionLimitExceeded { limit: usize },

    /// type "{0}" is already registered by a different class
    ConflictingClass(String),

    /// context is not bound to a server
    NoServer,

    /// operation cancelled
    Cancelled,

    /// resolution task failed: {0}
    JoinError(String),

    /// unexpected result: {0}
    UnexpectedResult(String),

    /// {message}
    Field { message: String },

    /// {name}: {source}
    Selection {
        name: String,
        source: Box<DagqlError>,
    },

    /// item {nth}: {source}
    Element {
        nth: usize,
        source: Box<DagqlError>,
    },
}

impl DagqlError {
    /// An error raised by a field implementation.
    pub fn field(message: impl Into<String>) -> Self {
        DagqlError::Field {
            message: message.into(),
        }
    }

    pub(crate) fn in_selection(self, name: impl Into<String>) -> Self {
        DagqlError::Selection {
            name: name.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn in_element(self, nth: usize) -> Self {
        DagqlError::Element {
            nth,
            source: Box::new(self),
        }
    }

    /// The innermost error, once selection and element context is stripped.
    pub fn root_cause(&self) -> &DagqlError {
        match self {
            DagqlError::Selection { source, .. } | DagqlError::Element { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// The response path the error is attributed to.
    pub fn path(&self) -> Path {
        let mut path = Path::empty();
        let mut current = self;
        loop {
            match current {
                DagqlError::Selection { name, source } => {
                    path.push(PathElement::Key(name.clone()));
                    current = source;
                }
                DagqlError::Element { nth, source } => {
                    path.push(PathElement::Index(nth.saturating_sub(1)));
                    current = source;
                }
                _ => return path,
            }
        }
    }

    pub fn extension_code(&self) -> String {
        match self.root_cause() {
            DagqlError::UnknownType(_)
            | DagqlError::UnknownField { .. }
            | DagqlError::UnknownArgument { .. }
            | DagqlError::MissingArgument { .. }
            | DagqlError::UnknownScalar(_)
            | DagqlError::UnknownFragment(_)
            | DagqlError::FragmentCycle(_)
            | DagqlError::CannotSubselect { .. }
            | DagqlError::MissingSubselection { .. }
            | DagqlError::CannotIndex { .. } => "GRAPHQL_VALIDATION_FAILED",
            DagqlError::UnknownOperation(_) => "GRAPHQL_UNKNOWN_OPERATION_NAME",
            DagqlError::UndefinedVariable(_)
            | DagqlError::ArgumentType { .. }
            | DagqlError::InvalidLiteral { .. }
            | DagqlError::InvalidId { .. } => "BAD_USER_INPUT",
            DagqlError::UnsupportedOperation(_) | DagqlError::NotImplemented(_) => {
                "OPERATION_NOT_SUPPORTED"
            }
            DagqlError::RecursionLimitExceeded { .. } => "RECURSION_LIMIT_EXCEEDED",
            DagqlError::Cancelled => "CANCELLED",
            DagqlError::Field { .. } => "FIELD_ERROR",
            _ => "INTERNAL_SERVER_ERROR",
        }
        .to_string()
    }

    /// Convert the error to an appropriate GraphQL error.
    pub fn to_graphql_error(&self) -> graphql::Error {
        let path = self.path();
        let mut extensions = Object::new();
        extensions.insert("code", json!(self.extension_code()));
        graphql::Error {
            message: self.to_string(),
            path: (!path.is_empty()).then_some(path),
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_messages_name_every_selection() {
        let err = DagqlError::field("boom")
            .in_selection("hello")
            .in_element(2)
            .in_selection("greetings");
        assert_eq!(err.to_string(), "greetings: item 2: hello: boom");
        assert_eq!(err.root_cause(), &DagqlError::field("boom"));
    }

    #[test]
    fn path_uses_zero_based_indexes() {
        let err = DagqlError::Cancelled
            .in_selection("name")
            .in_element(3)
            .in_selection("items");
        assert_eq!(err.path().to_string(), "/items/2/name");
    }

    #[test]
    fn graphql_error_carries_code_and_path() {
        let err = DagqlError::UnknownField {
            type_name: "Query".to_string(),
            field: "nope".to_string(),
        }
        .in_selection("nope");
        let error = err.to_graphql_error();
        assert_eq!(
            error.message,
            r#"nope: unknown field: "nope" on type "Query""#
        );
        assert_eq!(error.extensions.get("code"), Some(&json!("GRAPHQL_VALIDATION_FAILED")));
        assert_eq!(error.path.map(|p| p.to_string()), Some("/nope".to_string()));
    }

    #[test]
    fn unsupported_operation_message() {
        let err = DagqlError::UnsupportedOperation("mutations".to_string());
        assert_eq!(err.to_string(), "mutations not supported");
        assert_eq!(err.extension_code(), "OPERATION_NOT_SUPPORTED");
    }
}
