use std::sync::Arc;

use derivative::Derivative;
use tokio::sync::OnceCell;

use crate::class::Instance;
use crate::context::Context;
use crate::error::DagqlError;
use crate::id::Id;
use crate::json_ext::Value;
use crate::literal::Literal;
use crate::types::IntoTyped;
use crate::types::Object;
use crate::types::ObjectValue;
use crate::types::ScalarType;
use crate::types::TypeRef;
use crate::types::Typed;
use crate::types::TypedValue;

/// A reference to an object by [`Id`], typed as `<Type>ID`.
///
/// The object is loaded lazily and at most once per reference.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct IdRef {
    id: Id,
    #[derivative(Debug = "ignore")]
    loaded: OnceCell<Arc<dyn Object>>,
}

impl IdRef {
    pub fn new(id: Id) -> Self {
        IdRef {
            id,
            loaded: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Loads the referenced object through the server bound to `ctx`.
    pub async fn load(&self, ctx: &Context) -> Result<Arc<dyn Object>, DagqlError> {
        self.loaded
            .get_or_try_init(|| async {
                let server = ctx.server().ok_or(DagqlError::NoServer)?;
                server.load(ctx, &self.id).await
            })
            .await
            .cloned()
    }

    /// Loads the referenced object as an instance of the class backed by `T`.
    pub async fn load_instance<T: ObjectValue>(
        &self,
        ctx: &Context,
    ) -> Result<Instance<T>, DagqlError> {
        self.load(ctx)
            .await?
            .into_any()
            .downcast::<Instance<T>>()
            .map(|instance| instance.as_ref().clone())
            .map_err(|_| {
                DagqlError::UnexpectedResult(format!("{} is not a {}", self.id, T::TYPE_NAME))
            })
    }
}

impl Clone for IdRef {
    fn clone(&self) -> Self {
        IdRef::new(self.id.clone())
    }
}

impl Typed for IdRef {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named(id_type_name(self.id.type_ref().name())).non_null()
    }

    fn to_literal(&self) -> Literal {
        Literal::Id(Box::new(self.id.clone()))
    }

    fn to_json(&self) -> Value {
        match self.id.encode() {
            Ok(encoded) => Value::String(encoded.into()),
            Err(err) => {
                tracing::error!(id = %self.id, error = %err, "cannot encode ID");
                Value::Null
            }
        }
    }
}

pub(crate) fn id_type_name(type_name: &str) -> String {
    format!("{type_name}ID")
}

/// The `<Type>ID` scalar registered alongside every object type.
///
/// Accepts ID literals and their encoded string form.
#[derive(Clone, Debug)]
pub struct IdScalar {
    name: String,
    type_name: String,
}

impl IdScalar {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        IdScalar {
            name: id_type_name(&type_name),
            type_name,
        }
    }
}

impl ScalarType for IdScalar {
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, literal: &Literal) -> Result<TypedValue, DagqlError> {
        let id = match literal {
            Literal::Id(id) => id.as_ref().clone(),
            Literal::String(encoded) => Id::decode(encoded)?,
            other => {
                return Err(DagqlError::InvalidLiteral {
                    reason: format!("expected {}, got {other}", self.name),
                })
            }
        };
        if id.type_ref().name() != self.type_name {
            return Err(DagqlError::InvalidId {
                reason: format!(
                    "expected ID of type {}, got {}",
                    self.type_name,
                    id.type_ref().name()
                ),
            });
        }
        Ok(IdRef::new(id).into_typed())
    }
}
