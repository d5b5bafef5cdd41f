use std::future::Future;
use std::sync::Arc;

use derivative::Derivative;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;

use crate::class::Instance;
use crate::context::Context;
use crate::error::DagqlError;
use crate::literal::Literal;
use crate::selection::Selector;
use crate::server::Server;
use crate::types::Array;
use crate::types::BooleanValue;
use crate::types::FloatValue;
use crate::types::IdRef;
use crate::types::IntValue;
use crate::types::ObjectValue;
use crate::types::StringValue;
use crate::types::TypeRef;
use crate::types::Typed;
use crate::types::TypedValue;

/// The schema of one argument.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Literal>,
    pub description: Option<String>,
}

/// The schema of one field: its name, return type and arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub args: Vec<InputSpec>,
    pub description: Option<String>,
    pub deprecated: Option<String>,

    /// Calls are not repeatable and are never memoized.
    pub tainted: bool,

    /// Calls do not change the identity of the result.
    pub meta: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        FieldDefinition {
            name: name.into(),
            ty,
            args: Vec::new(),
            description: None,
            deprecated: None,
            tainted: false,
            meta: false,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&InputSpec> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

pub(crate) type FieldFunc<T> = Arc<
    dyn Fn(Context, Instance<T>, Arguments) -> BoxFuture<'static, Result<TypedValue, DagqlError>>
        + Send
        + Sync,
>;

/// A field of a class backed by `T`: its definition plus its implementation.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Field<T> {
    pub(crate) spec: Arc<FieldDefinition>,
    #[derivative(Debug = "ignore")]
    pub(crate) func: FieldFunc<T>,
}

impl<T: ObjectValue> Field<T> {
    /// A field named `name` returning `ty`, implemented by `func`.
    ///
    /// `func` receives the instance the field is selected on and its
    /// arguments, with defaults applied.
    pub fn new<F, Fut>(name: impl Into<String>, ty: TypeRef, func: F) -> Self
    where
        F: Fn(Context, Instance<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TypedValue, DagqlError>> + Send + 'static,
    {
        Field {
            spec: Arc::new(FieldDefinition::new(name, ty)),
            func: Arc::new(move |ctx, this, args| func(ctx, this, args).boxed()),
        }
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut FieldDefinition {
        Arc::make_mut(&mut self.spec)
    }

    pub fn arg(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.spec_mut().args.push(InputSpec {
            name: name.into(),
            ty,
            default: None,
            description: None,
        });
        self
    }

    pub fn arg_with_default(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        default: impl Into<Literal>,
    ) -> Self {
        self.spec_mut().args.push(InputSpec {
            name: name.into(),
            ty,
            default: Some(default.into()),
            description: None,
        });
        self
    }

    pub fn doc(mut self, description: impl Into<String>) -> Self {
        self.spec_mut().description = Some(description.into());
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.spec_mut().deprecated = Some(reason.into());
        self
    }

    pub fn tainted(mut self) -> Self {
        self.spec_mut().tainted = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.spec_mut().meta = true;
        self
    }
}

/// A set of fields to install on the class backed by `T`.
#[derive(Derivative)]
#[derivative(Debug, Default(bound = ""))]
pub struct Fields<T> {
    fields: Vec<Field<T>>,
}

impl<T: ObjectValue> Fields<T> {
    pub fn new() -> Self {
        Fields { fields: Vec::new() }
    }

    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Installs the fields on `server`, creating the class on first use.
    pub fn install(self, server: &Server) -> Result<(), DagqlError> {
        server.install(self)
    }
}

impl<T> IntoIterator for Fields<T> {
    type Item = Field<T>;
    type IntoIter = std::vec::IntoIter<Field<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// The arguments a field was called with, after defaults are applied.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    field: String,
    values: IndexMap<String, TypedValue>,
}

impl Arguments {
    /// Collects `selector`'s arguments, filling in declared defaults and
    /// rejecting absent non-null arguments.
    pub(crate) fn from_selector(
        field: &FieldDefinition,
        selector: &Selector,
        ctx: &Context,
    ) -> Result<Arguments, DagqlError> {
        let mut values: IndexMap<String, TypedValue> = selector
            .args
            .iter()
            .map(|arg| (arg.name.clone(), arg.value.clone()))
            .collect();
        for spec in &field.args {
            if values.contains_key(&spec.name) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    let server = ctx.server().ok_or(DagqlError::NoServer)?;
                    values.insert(spec.name.clone(), server.decode_literal(default, spec)?);
                }
                None if spec.ty.is_non_null() => {
                    return Err(DagqlError::MissingArgument {
                        field: field.name.clone(),
                        argument: spec.name.clone(),
                    })
                }
                None => {}
            }
        }
        Ok(Arguments {
            field: field.name.clone(),
            values,
        })
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument `name` as a `V`.
    pub fn get_as<V: Typed>(&self, name: &str) -> Result<&V, DagqlError> {
        self.optional(name)?
            .ok_or_else(|| DagqlError::MissingArgument {
                field: self.field.clone(),
                argument: name.to_string(),
            })
    }

    /// The argument `name` as a `V`, or `None` if it was not given or is null.
    pub fn optional<V: Typed>(&self, name: &str) -> Result<Option<&V>, DagqlError> {
        let Some(value) = self.values.get(name) else {
            return Ok(None);
        };
        if let Some(found) = value.downcast_ref::<V>() {
            return Ok(Some(found));
        }
        match value.as_nullable() {
            // An explicit null is the same as an absent argument.
            Some(nullable) if nullable.value().is_none() => Ok(None),
            _ => Err(DagqlError::ArgumentType {
                argument: name.to_string(),
                expected: short_type_name::<V>(),
            }),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str, DagqlError> {
        self.get_as::<StringValue>(name).map(StringValue::as_str)
    }

    pub fn int(&self, name: &str) -> Result<i64, DagqlError> {
        self.get_as::<IntValue>(name).map(|i| i.0)
    }

    pub fn float(&self, name: &str) -> Result<f64, DagqlError> {
        self.get_as::<FloatValue>(name).map(|x| x.0)
    }

    pub fn boolean(&self, name: &str) -> Result<bool, DagqlError> {
        self.get_as::<BooleanValue>(name).map(|b| b.0)
    }

    pub fn id(&self, name: &str) -> Result<&IdRef, DagqlError> {
        self.get_as::<IdRef>(name)
    }

    pub fn list(&self, name: &str) -> Result<&Array, DagqlError> {
        self.get_as::<Array>(name)
    }
}

fn short_type_name<V>() -> String {
    let full = std::any::type_name::<V>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}
