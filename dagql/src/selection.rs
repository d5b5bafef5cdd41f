//! Selections: the typed, already-decoded form of a query.

use crate::types::IntoTyped;
use crate::types::TypedValue;

/// A decoded argument value.
#[derive(Clone, Debug)]
pub struct NamedInput {
    pub name: String,
    pub value: TypedValue,
}

/// A single field call: the field name, its arguments and an optional
/// 1-based index into the list it returns.
#[derive(Clone, Debug)]
pub struct Selector {
    pub field: String,
    pub args: Vec<NamedInput>,
    pub nth: Option<usize>,
}

impl Selector {
    pub fn new(field: impl Into<String>) -> Self {
        Selector {
            field: field.into(),
            args: Vec::new(),
            nth: None,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl IntoTyped) -> Self {
        self.args.push(NamedInput {
            name: name.into(),
            value: value.into_typed(),
        });
        self
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = Some(nth);
        self
    }

    pub fn arg_value(&self, name: &str) -> Option<&TypedValue> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// A selector plus the selections to make on its result.
#[derive(Clone, Debug)]
pub struct Selection {
    pub alias: Option<String>,
    pub selector: Selector,
    pub subselections: Vec<Selection>,
}

impl Selection {
    pub fn new(field: impl Into<String>) -> Self {
        Selection::from(Selector::new(field))
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl IntoTyped) -> Self {
        self.selector = self.selector.arg(name, value);
        self
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.selector = self.selector.nth(nth);
        self
    }

    pub fn select(mut self, subselection: Selection) -> Self {
        self.subselections.push(subselection);
        self
    }

    /// The key the result is reported under: the alias if set, else the field name.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.selector.field)
    }

    /// The number of nested selection levels, counting this one.
    pub fn depth(&self) -> usize {
        1 + self
            .subselections
            .iter()
            .map(Selection::depth)
            .max()
            .unwrap_or(0)
    }
}

impl From<Selector> for Selection {
    fn from(selector: Selector) -> Self {
        Selection {
            alias: None,
            selector,
            subselections: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StringValue;

    #[test]
    fn name_prefers_alias() {
        let selection = Selection::new("hello");
        assert_eq!(selection.name(), "hello");
        let selection = selection.alias("hi");
        assert_eq!(selection.name(), "hi");
    }

    #[test]
    fn depth_counts_nesting() {
        let selection = Selection::new("a")
            .select(Selection::new("b").select(Selection::new("c")))
            .select(Selection::new("d"));
        assert_eq!(selection.depth(), 3);
        assert_eq!(Selection::new("leaf").depth(), 1);
    }

    #[test]
    fn selector_args() {
        let selector = Selector::new("greeting")
            .arg("name", StringValue::from("Ada"))
            .nth(2);
        assert_eq!(selector.nth, Some(2));
        let name = selector.arg_value("name").unwrap();
        assert_eq!(
            name.downcast_ref::<StringValue>().map(StringValue::as_str),
            Some("Ada")
        );
        assert!(selector.arg_value("other").is_none());
    }
}
