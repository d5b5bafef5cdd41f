//! Object types and their fields.
//!
//! A [`Class`] is the registry entry for an object type backed by a Rust
//! type `T`. Its field table can be extended after creation; instances look
//! fields up on every call, so newly installed fields are visible to objects
//! created earlier.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use derivative::Derivative;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::context::Context;
use crate::error::DagqlError;
use crate::id::Id;
use crate::json_ext::Value;
use crate::literal::Literal;
use crate::selection::Selector;
use crate::types::AsAny;
use crate::types::IdRef;
use crate::types::IntoTyped;
use crate::types::Object;
use crate::types::ObjectValue;
use crate::types::TypeRef;
use crate::types::Typed;
use crate::types::TypedValue;

mod fields;

pub use fields::Arguments;
pub use fields::Field;
pub use fields::FieldDefinition;
pub use fields::Fields;
pub use fields::InputSpec;

/// The registry entry for an object type.
pub trait ObjectType: AsAny {
    fn type_name(&self) -> &str;

    fn description(&self) -> Option<String> {
        None
    }

    fn field_definition(&self, name: &str) -> Option<Arc<FieldDefinition>>;

    /// All fields, in installation order.
    fn field_definitions(&self) -> Vec<Arc<FieldDefinition>>;

    /// Wraps `value` as a selectable object identified by `id`.
    fn new_instance(&self, id: Id, value: TypedValue) -> Result<Arc<dyn Object>, DagqlError>;

    /// A reference to an object of this type by `id`.
    fn new_id(&self, id: Id) -> TypedValue {
        IdRef::new(id).into_typed()
    }
}

/// An object type backed by the Rust type `T`.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Class<T> {
    name: String,
    description: Option<String>,
    #[derivative(Debug = "ignore")]
    me: Weak<Class<T>>,
    #[derivative(Debug = "ignore")]
    fields: RwLock<IndexMap<String, Arc<Field<T>>>>,
}

impl<T: ObjectValue> Class<T> {
    pub fn new() -> Arc<Self> {
        Class::with_description(None)
    }

    pub fn with_description(description: Option<String>) -> Arc<Self> {
        let class = Arc::new_cyclic(|me| Class {
            name: T::TYPE_NAME.to_string(),
            description,
            me: me.clone(),
            fields: RwLock::new(IndexMap::new()),
        });
        class.install(Fields::new().field(id_field::<T>()));
        class
    }

    /// Adds `fields`, replacing any existing fields with the same names.
    pub fn install(&self, fields: Fields<T>) {
        let mut table = self.fields.write();
        for field in fields {
            tracing::trace!(class = %self.name, field = %field.spec.name, "installing field");
            table.insert(field.spec.name.clone(), Arc::new(field));
        }
    }

    pub fn field(&self, name: &str) -> Option<Arc<Field<T>>> {
        self.fields.read().get(name).cloned()
    }

    /// An instance of this class wrapping `value`.
    pub fn instance(self: &Arc<Self>, id: Id, value: Arc<T>) -> Instance<T> {
        Instance {
            id,
            value,
            class: self.clone(),
        }
    }
}

fn id_field<T: ObjectValue>() -> Field<T> {
    Field::new(
        "id",
        TypeRef::named(format!("{}ID", T::TYPE_NAME)).non_null(),
        |_ctx, this: Instance<T>, _args| async move { Ok(IdRef::new(this.id().clone()).into_typed()) },
    )
    .doc(format!("A unique identifier for this {}.", T::TYPE_NAME))
    .meta()
}

impl<T: ObjectValue> ObjectType for Class<T> {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    fn field_definition(&self, name: &str) -> Option<Arc<FieldDefinition>> {
        self.fields.read().get(name).map(|field| field.spec.clone())
    }

    fn field_definitions(&self) -> Vec<Arc<FieldDefinition>> {
        self.fields
            .read()
            .values()
            .map(|field| field.spec.clone())
            .collect()
    }

    fn new_instance(&self, id: Id, value: TypedValue) -> Result<Arc<dyn Object>, DagqlError> {
        let class = self.me.upgrade().ok_or_else(|| {
            DagqlError::UnexpectedResult(format!("class {} was dropped", self.name))
        })?;
        let value = value.downcast_arc::<T>().ok_or_else(|| {
            DagqlError::UnexpectedResult(format!("expected a {} value", self.name))
        })?;
        Ok(Arc::new(class.instance(id, value)))
    }
}

/// A value of type `T` paired with its identity and class.
#[derive(Derivative)]
#[derivative(Debug, Clone(bound = ""))]
pub struct Instance<T> {
    id: Id,
    value: Arc<T>,
    #[derivative(Debug = "ignore")]
    class: Arc<Class<T>>,
}

impl<T> Instance<T> {
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }
}

impl<T> Deref for Instance<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ObjectValue> Typed for Instance<T> {
    fn type_ref(&self) -> TypeRef {
        TypeRef::named(T::TYPE_NAME).non_null()
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

    fn into_object(self: Arc<Self>) -> Option<Arc<dyn Object>> {
        Some(self)
    }
}

#[async_trait]
impl<T: ObjectValue> Object for Instance<T> {
    fn id(&self) -> &Id {
        &self.id
    }

    async fn select(&self, ctx: &Context, selector: &Selector) -> Result<TypedValue, DagqlError> {
        let field = self
            .class
            .field(&selector.field)
            .ok_or_else(|| DagqlError::UnknownField {
                type_name: self.class.name.clone(),
                field: selector.field.clone(),
            })?;
        let args = Arguments::from_selector(&field.spec, selector, ctx)?;
        (field.func)(ctx.clone(), self.clone(), args).await
    }
}
