use std::sync::Arc;

use tracing::Instrument;

use crate::context::Context;
use crate::error::DagqlError;
use crate::id::Id;
use crate::id::IdSelector;
use crate::selection::NamedInput;
use crate::selection::Selection;
use crate::selection::Selector;
use crate::server::Resolved;
use crate::server::Server;
use crate::server::LOAD_SPAN_NAME;
use crate::types::Object;

impl Server {
    /// Rebuilds the object `id` refers to by replaying its field calls from the root.
    pub async fn load(&self, ctx: &Context, id: &Id) -> Result<Arc<dyn Object>, DagqlError> {
        let Some((first, rest)) = id.selectors().split_first() else {
            return Ok(self.root());
        };
        let span = tracing::info_span!(LOAD_SPAN_NAME, "otel.kind" = "INTERNAL", id = %id);
        async {
            let root = self.root();
            let root_type = root.type_ref().name().to_string();
            let selection = self.constructor_to_selection(&root_type, first, rest)?;
            let resolved = self.resolve(ctx, root, &[selection]).await?;

            let mut current: Option<&Resolved> = None;
            for selector in id.selectors() {
                let next = match current {
                    None => resolved.get(&selector.field),
                    Some(parent) => parent.get(&selector.field),
                };
                current = Some(next.ok_or_else(|| {
                    DagqlError::UnexpectedResult(format!(
                        "no result for {} while loading {id}",
                        selector.field
                    ))
                })?);
            }
            match current {
                Some(Resolved::Leaf(value)) => self.new_object(id.clone(), value.clone()),
                Some(Resolved::Null) => Err(DagqlError::UnexpectedResult(format!(
                    "{id} resolved to null"
                ))),
                _ => Err(DagqlError::UnexpectedResult(format!(
                    "{id} did not resolve to a value"
                ))),
            }
        }
        .instrument(span)
        .await
    }

    /// The selection that replays `first` on `type_name`, with `rest` nested beneath it.
    fn constructor_to_selection(
        &self,
        type_name: &str,
        first: &IdSelector,
        rest: &[IdSelector],
    ) -> Result<Selection, DagqlError> {
        let field = self.field_definition(type_name, &first.field)?;
        let mut selector = Selector::new(first.field.clone());
        selector.nth = first.nth;
        for arg in &first.args {
            let input = field
                .argument(&arg.name)
                .ok_or_else(|| DagqlError::UnknownArgument {
                    field: field.name.clone(),
                    argument: arg.name.clone(),
                })?;
            selector.args.push(NamedInput {
                name: arg.name.clone(),
                value: self.decode_literal(&arg.value, input)?,
            });
        }
        let mut selection = Selection::from(selector);
        if let Some((next, rest)) = rest.split_first() {
            selection
                .subselections
                .push(self.constructor_to_selection(field.ty.name(), next, rest)?);
        }
        Ok(selection)
    }
}
