use tracing::Instrument;

use crate::context::Context;
use crate::error::DagqlError;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::query;
use crate::query::Document;
use crate::query::OperationKind;
use crate::selection::NamedInput;
use crate::selection::Selection;
use crate::selection::Selector;
use crate::server::resolver::map_to_json;
use crate::server::Server;
use crate::server::EXECUTE_SPAN_NAME;

impl Server {
    /// Executes a query request against the root object.
    ///
    /// Errors never escape: they are reported in the response, and a failed
    /// request carries no data.
    pub async fn execute(&self, ctx: &Context, request: Request) -> Response {
        let span = tracing::info_span!(
            EXECUTE_SPAN_NAME,
            "otel.kind" = "INTERNAL",
            "graphql.operation.name" = request.operation_name.as_deref().unwrap_or_default(),
        );
        match self.execute_request(ctx, &request).instrument(span).await {
            Ok(data) => Response::builder().data(Value::Object(data)).build(),
            Err(err) => {
                tracing::debug!(error = %err, "query failed");
                Response::builder().error(err.to_graphql_error()).build()
            }
        }
    }

    async fn execute_request(&self, ctx: &Context, request: &Request) -> Result<Object, DagqlError> {
        let operation = select_operation(&request.document, request.operation_name.as_deref())?;
        match operation.kind {
            OperationKind::Query => {}
            OperationKind::Mutation => {
                return Err(DagqlError::UnsupportedOperation("mutations".to_string()))
            }
            OperationKind::Subscription => {
                return Err(DagqlError::UnsupportedOperation(
                    "subscriptions".to_string(),
                ))
            }
        }
        let root = self.root();
        let selections = self.parse_selections(
            root.type_ref().name(),
            &operation.selection_set,
            &request.document,
            &request.variables,
        )?;
        let resolved = self.resolve(ctx, root, &selections).await?;
        Ok(map_to_json(&resolved))
    }

    /// Types a document's selection set against `type_name`, substituting
    /// variables and inlining fragment spreads.
    pub fn parse_selections(
        &self,
        type_name: &str,
        selection_set: &[query::Selection],
        document: &Document,
        variables: &Object,
    ) -> Result<Vec<Selection>, DagqlError> {
        let mut parser = SelectionParser {
            server: self,
            document,
            variables,
            spreads: Vec::new(),
        };
        parser.selection_set(type_name, selection_set, 0)
    }
}

/// Walks a document's selection sets, tracking the fragments currently
/// being inlined.
struct SelectionParser<'a> {
    server: &'a Server,
    document: &'a Document,
    variables: &'a Object,
    spreads: Vec<&'a str>,
}

impl<'a> SelectionParser<'a> {
    fn selection_set(
        &mut self,
        type_name: &str,
        selection_set: &'a [query::Selection],
        depth: usize,
    ) -> Result<Vec<Selection>, DagqlError> {
        let limit = self.server.configuration().limits.max_depth;
        if depth >= limit {
            return Err(DagqlError::RecursionLimitExceeded { limit });
        }
        let mut selections = Vec::with_capacity(selection_set.len());
        for selection in selection_set {
            match selection {
                query::Selection::Field(field) => {
                    selections.push(self.field(type_name, field, depth)?)
                }
                query::Selection::FragmentSpread { name } => {
                    let document = self.document;
                    let fragment = document
                        .fragments
                        .get(name)
                        .ok_or_else(|| DagqlError::UnknownFragment(name.clone()))?;
                    if self.spreads.contains(&name.as_str()) {
                        return Err(DagqlError::FragmentCycle(name.clone()));
                    }
                    // a spread is inlined at the level it appears on
                    self.spreads.push(name);
                    let inlined = self.selection_set(type_name, &fragment.selection_set, depth);
                    self.spreads.pop();
                    selections.extend(inlined?);
                }
            }
        }
        Ok(selections)
    }

    fn field(
        &mut self,
        type_name: &str,
        field: &'a query::Field,
        depth: usize,
    ) -> Result<Selection, DagqlError> {
        let definition = self.server.field_definition(type_name, &field.name)?;
        let mut selector = Selector::new(field.name.clone());
        for (name, literal) in &field.arguments {
            let input = definition
                .argument(name)
                .ok_or_else(|| DagqlError::UnknownArgument {
                    field: field.name.clone(),
                    argument: name.clone(),
                })?;
            let literal = literal.substitute(self.variables)?;
            // null leaves the argument unset
            if literal.is_null() {
                continue;
            }
            selector.args.push(NamedInput {
                name: name.clone(),
                value: self.server.decode_literal(&literal, input)?,
            });
        }

        let result_type = definition.ty.name();
        let has_class = self.server.has_class(result_type);
        let subselections = match (field.selection_set.is_empty(), has_class) {
            (true, false) => Vec::new(),
            (true, true) => {
                return Err(DagqlError::MissingSubselection {
                    field: field.name.clone(),
                    type_name: definition.ty.to_string(),
                })
            }
            (false, false) => {
                return Err(DagqlError::CannotSubselect {
                    type_name: definition.ty.to_string(),
                })
            }
            (false, true) => self.selection_set(result_type, &field.selection_set, depth + 1)?,
        };

        Ok(Selection {
            alias: field.alias.clone(),
            selector,
            subselections,
        })
    }
}

fn select_operation<'a>(
    document: &'a Document,
    name: Option<&str>,
) -> Result<&'a query::Operation, DagqlError> {
    match name {
        Some(name) => document
            .operations
            .iter()
            .find(|operation| operation.name.as_deref() == Some(name))
            .ok_or_else(|| DagqlError::UnknownOperation(name.to_string())),
        None => document
            .operations
            .first()
            .ok_or_else(|| DagqlError::UnknownOperation(String::new())),
    }
}
