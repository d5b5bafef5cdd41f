//! Parsed query documents, as handed to [`Server::execute`](crate::Server::execute).
//!
//! Argument values are kept as [`Literal`]s; they are typed against the
//! schema only when the document is executed.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::literal::Literal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// A set of operations and the fragments they may spread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub operations: Vec<Operation>,
    pub fragments: IndexMap<String, Fragment>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.insert(fragment.name.clone(), fragment);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub selection_set: Vec<Selection>,
}

impl Operation {
    pub fn query(selection_set: Vec<Selection>) -> Self {
        Operation {
            name: None,
            kind: OperationKind::Query,
            selection_set,
        }
    }

    pub fn mutation(selection_set: Vec<Selection>) -> Self {
        Operation {
            name: None,
            kind: OperationKind::Mutation,
            selection_set,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A named, reusable selection set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
    pub selection_set: Vec<Selection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Selection {
    Field(Field),
    FragmentSpread { name: String },
}

impl Selection {
    pub fn spread(name: impl Into<String>) -> Self {
        Selection::FragmentSpread { name: name.into() }
    }
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Literal)>,
    pub selection_set: Vec<Selection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Field {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            selection_set: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selection_set.push(selection.into());
        self
    }
}
