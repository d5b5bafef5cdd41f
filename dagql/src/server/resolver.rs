use std::sync::Arc;

use futures::future;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use futures::StreamExt;
use futures::TryFutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;
use tracing::Instrument;

use crate::class::FieldDefinition;
use crate::context::Context;
use crate::error::DagqlError;
use crate::id::Id;
use crate::json_ext::Object as JsonObject;
use crate::json_ext::Value;
use crate::selection::Selection;
use crate::selection::Selector;
use crate::server::Server;
use crate::server::SELECT_SPAN_NAME;
use crate::types::Object;
use crate::types::TypedValue;

/// Resolution results keyed by selection name, in selection order.
pub type ResolvedMap = IndexMap<String, Resolved>;

/// The result of resolving one selection.
#[derive(Clone, Debug)]
pub enum Resolved {
    Null,
    Leaf(TypedValue),
    Object(ResolvedMap),
    List(Vec<Resolved>),
}

impl Resolved {
    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null)
    }

    pub fn as_leaf(&self) -> Option<&TypedValue> {
        match self {
            Resolved::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// The nested result for `key`, if this is an object result.
    pub fn get(&self, key: &str) -> Option<&Resolved> {
        match self {
            Resolved::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Resolved::Null => Value::Null,
            Resolved::Leaf(value) => value.to_json(),
            Resolved::Object(map) => Value::Object(map_to_json(map)),
            Resolved::List(items) => Value::Array(items.iter().map(Resolved::to_json).collect()),
        }
    }
}

pub(crate) fn map_to_json(map: &ResolvedMap) -> JsonObject {
    map.iter()
        .map(|(key, value)| (key.as_str().into(), value.to_json()))
        .collect()
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Server {
    /// Resolves `selections` against `object`.
    ///
    /// Sibling selections run concurrently. The first failure is returned,
    /// naming the selection it came from; siblings still running are left to
    /// finish on their own.
    pub async fn resolve(
        &self,
        ctx: &Context,
        object: Arc<dyn Object>,
        selections: &[Selection],
    ) -> Result<ResolvedMap, DagqlError> {
        let limit = self.configuration().limits.max_depth;
        if selections.iter().map(Selection::depth).max().unwrap_or(0) > limit {
            tracing::error!(limit, "selection depth limit exceeded");
            return Err(DagqlError::RecursionLimitExceeded { limit });
        }
        self.resolve_selections(ctx.bind(self), object, selections.to_vec())
            .await
    }

    fn resolve_selections(
        &self,
        ctx: Context,
        object: Arc<dyn Object>,
        selections: Vec<Selection>,
    ) -> BoxFuture<'static, Result<ResolvedMap, DagqlError>> {
        let server = self.clone();
        async move {
            let count = selections.len();
            let mut in_flight: FuturesUnordered<_> = selections
                .into_iter()
                .enumerate()
                .map(|(index, selection)| {
                    let server = server.clone();
                    let ctx = ctx.clone();
                    let object = object.clone();
                    let task = tokio::spawn(
                        async move {
                            let name = selection.name().to_string();
                            match server.resolve_path(ctx, object, selection).await {
                                Ok(resolved) => Ok((name, resolved)),
                                Err(err) => Err(err.in_selection(name)),
                            }
                        }
                        .in_current_span(),
                    );
                    task.map(move |joined| (index, joined))
                })
                .collect();

            let mut results: Vec<Option<(String, Resolved)>> = (0..count).map(|_| None).collect();
            while let Some((index, joined)) = in_flight.next().await {
                let (name, resolved) =
                    joined.map_err(|err| DagqlError::JoinError(err.to_string()))??;
                results[index] = Some((name, resolved));
            }
            Ok(results.into_iter().flatten().collect())
        }
        .boxed()
    }

    fn resolve_path(
        &self,
        ctx: Context,
        object: Arc<dyn Object>,
        selection: Selection,
    ) -> BoxFuture<'static, Result<Resolved, DagqlError>> {
        let server = self.clone();
        async move {
            let type_name = object.type_ref().name().to_string();
            let field = server.field_definition(&type_name, &selection.selector.field)?;
            for arg in &selection.selector.args {
                if field.argument(&arg.name).is_none() {
                    return Err(DagqlError::UnknownArgument {
                        field: field.name.clone(),
                        argument: arg.name.clone(),
                    });
                }
                // IDs cannot carry NaN or infinities
                if !arg.value.to_literal().is_finite() {
                    return Err(DagqlError::InvalidLiteral {
                        reason: format!("argument {:?} is not a finite number", arg.name),
                    });
                }
            }

            let call_id = object.id().extend(&selection.selector, &field);
            let span = tracing::info_span!(
                SELECT_SPAN_NAME,
                "otel.kind" = "INTERNAL",
                "dagql.type" = %type_name,
                "dagql.field" = %field.name,
            );
            let value = server
                .call(&ctx, &object, &selection.selector, &field, &call_id)
                .instrument(span)
                .await?;
            let Some(value) = value.unwrap_nullable() else {
                return Ok(Resolved::Null);
            };

            let (value, id, ty) = match selection.selector.nth {
                Some(nth) => {
                    let enumerable =
                        value
                            .as_enumerable()
                            .ok_or_else(|| DagqlError::CannotIndex {
                                nth,
                                type_name: value.type_ref().to_string(),
                            })?;
                    let element = enumerable.nth(nth)?;
                    let Some(element) = element.unwrap_nullable() else {
                        return Ok(Resolved::Null);
                    };
                    let ty = field.ty.elem().unwrap_or(&field.ty).clone();
                    (element, call_id.nth(nth), ty)
                }
                None => (value, call_id, field.ty.clone()),
            };

            if selection.subselections.is_empty() {
                return Ok(Resolved::Leaf(value));
            }

            if ty.is_list() {
                let enumerable =
                    value
                        .as_enumerable()
                        .ok_or_else(|| DagqlError::CannotSubselect {
                            type_name: value.type_ref().to_string(),
                        })?;
                let mut elements = Vec::with_capacity(enumerable.len());
                for nth in 1..=enumerable.len() {
                    let element = enumerable.nth(nth).map_err(|err| err.in_element(nth))?;
                    let Some(element) = element.unwrap_nullable() else {
                        elements.push(future::ready(Ok(Resolved::Null)).boxed());
                        continue;
                    };
                    let node = server
                        .selectable(id.nth(nth), element)
                        .map_err(|err| err.in_element(nth))?;
                    elements.push(
                        server
                            .resolve_selections(ctx.clone(), node, selection.subselections.clone())
                            .map_ok(Resolved::Object)
                            .map_err(move |err| err.in_element(nth))
                            .boxed(),
                    );
                }
                return Ok(Resolved::List(future::try_join_all(elements).await?));
            }

            let node = server.selectable(id, value)?;
            let resolved = server
                .resolve_selections(ctx, node, selection.subselections)
                .await?;
            Ok(Resolved::Object(resolved))
        }
        .boxed()
    }

    /// Calls `field` on `object`, sharing the result between identical
    /// calls when memoization is enabled.
    async fn call(
        &self,
        ctx: &Context,
        object: &Arc<dyn Object>,
        selector: &Selector,
        field: &FieldDefinition,
        call_id: &Id,
    ) -> Result<TypedValue, DagqlError> {
        if ctx.is_cancelled() {
            return Err(DagqlError::Cancelled);
        }
        let memoize = self.configuration().cache.enabled
            && !field.tainted
            && !field.meta
            && !call_id.is_tainted();
        if !memoize {
            return object.select(ctx, selector).await;
        }
        let digest = call_id.digest();
        tracing::trace!(%digest, id = %call_id, "memoized call");
        let (ctx, object, selector) = (ctx.clone(), object.clone(), selector.clone());
        self.cache()
            .get_or_compute(digest, move || async move { object.select(&ctx, &selector).await })
            .await
    }

    /// Like [`Server::new_object`], but reports values with no class as
    /// impossible to sub-select.
    fn selectable(&self, id: Id, value: TypedValue) -> Result<Arc<dyn Object>, DagqlError> {
        if let Some(object) = value.clone().into_object() {
            return Ok(object);
        }
        if value.as_enumerable().is_some() || !self.has_class(value.type_ref().name()) {
            return Err(DagqlError::CannotSubselect {
                type_name: value.type_ref().to_string(),
            });
        }
        self.new_object(id, value)
    }
}
