//! The server: a registry of object and scalar types plus a root object to
//! resolve selections against.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::cache::CacheMap;
use crate::class::Class;
use crate::class::FieldDefinition;
use crate::class::Fields;
use crate::class::ObjectType;
use crate::configuration::Configuration;
use crate::error::DagqlError;
use crate::id::Digest;
use crate::id::Id;
use crate::types::BuiltinScalar;
use crate::types::IdScalar;
use crate::types::Object;
use crate::types::ObjectValue;
use crate::types::ScalarType;
use crate::types::TypeRef;
use crate::types::TypedValue;

mod decode;
mod execute;
mod load;
mod resolver;
mod schema;

pub use resolver::Resolved;
pub use resolver::ResolvedMap;

pub(crate) const SELECT_SPAN_NAME: &str = "dagql.select";
pub(crate) const LOAD_SPAN_NAME: &str = "dagql.load";
pub(crate) const EXECUTE_SPAN_NAME: &str = "dagql.execute";

/// A schema of object and scalar types, a root object, and the memo table
/// shared by every resolution against it.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    root: Arc<dyn Object>,
    classes: DashMap<String, Arc<dyn ObjectType>>,
    scalars: DashMap<String, Arc<dyn ScalarType>>,
    cache: CacheMap<Digest, TypedValue, DagqlError>,
    install_lock: Mutex<()>,
    configuration: Arc<Configuration>,
}

impl Server {
    /// A server whose root object is `root`.
    pub fn new<T: ObjectValue>(root: T) -> Self {
        Server::with_configuration(root, Configuration::default())
    }

    pub fn with_configuration<T: ObjectValue>(root: T, configuration: Configuration) -> Self {
        let class = Class::<T>::new();
        let root = class.instance(Id::root(TypeRef::named(T::TYPE_NAME).non_null()), Arc::new(root));
        let server = Server {
            inner: Arc::new(Inner {
                root: Arc::new(root),
                classes: DashMap::new(),
                scalars: DashMap::new(),
                cache: CacheMap::new(),
                install_lock: Mutex::new(()),
                configuration: Arc::new(configuration),
            }),
        };
        for scalar in BuiltinScalar::ALL {
            server.install_scalar(Arc::new(scalar));
        }
        server.register_class(class);
        server
    }

    pub fn root(&self) -> Arc<dyn Object> {
        self.inner.root.clone()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    pub(crate) fn ptr_eq(&self, other: &Server) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn cache(&self) -> &CacheMap<Digest, TypedValue, DagqlError> {
        &self.inner.cache
    }

    /// Installs `fields` on the class backed by `T`, creating it on first use.
    ///
    /// Fields with the same name as an existing field replace it.
    pub fn install<T: ObjectValue>(&self, fields: Fields<T>) -> Result<(), DagqlError> {
        let _guard = self.inner.install_lock.lock();
        let existing = self
            .inner
            .classes
            .get(T::TYPE_NAME)
            .map(|class| class.value().clone());
        let class = match existing {
            Some(existing) => existing
                .into_any()
                .downcast::<Class<T>>()
                .map_err(|_| DagqlError::ConflictingClass(T::TYPE_NAME.to_string()))?,
            None => {
                let class = Class::<T>::new();
                self.register_class(class.clone());
                class
            }
        };
        class.install(fields);
        Ok(())
    }

    /// Registers an object type, along with the scalar for its IDs.
    ///
    /// Returns false, leaving the registry unchanged, if a type with the same
    /// name is already registered.
    pub fn install_class(&self, class: Arc<dyn ObjectType>) -> bool {
        let _guard = self.inner.install_lock.lock();
        if self.inner.classes.contains_key(class.type_name()) {
            return false;
        }
        self.register_class(class);
        true
    }

    fn register_class(&self, class: Arc<dyn ObjectType>) {
        let name = class.type_name().to_string();
        tracing::debug!(class = %name, "registering class");
        self.install_scalar(Arc::new(IdScalar::new(name.clone())));
        self.inner.classes.insert(name, class);
    }

    /// Registers a scalar or enum type, replacing any type with the same name.
    pub fn install_scalar(&self, scalar: Arc<dyn ScalarType>) {
        self.inner
            .scalars
            .insert(scalar.name().to_string(), scalar);
    }

    pub fn class(&self, type_name: &str) -> Result<Arc<dyn ObjectType>, DagqlError> {
        self.inner
            .classes
            .get(type_name)
            .map(|class| class.value().clone())
            .ok_or_else(|| DagqlError::UnknownType(type_name.to_string()))
    }

    pub fn scalar(&self, name: &str) -> Result<Arc<dyn ScalarType>, DagqlError> {
        self.inner
            .scalars
            .get(name)
            .map(|scalar| scalar.value().clone())
            .ok_or_else(|| DagqlError::UnknownScalar(name.to_string()))
    }

    pub fn has_class(&self, type_name: &str) -> bool {
        self.inner.classes.contains_key(type_name)
    }

    pub fn field_definition(
        &self,
        type_name: &str,
        field: &str,
    ) -> Result<Arc<FieldDefinition>, DagqlError> {
        self.class(type_name)?
            .field_definition(field)
            .ok_or_else(|| DagqlError::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })
    }

    /// Turns `value` into a selectable object identified by `id`.
    ///
    /// Values that are already objects are returned as they are; other
    /// values are wrapped by the class registered for their type.
    pub fn new_object(&self, id: Id, value: TypedValue) -> Result<Arc<dyn Object>, DagqlError> {
        if let Some(object) = value.clone().into_object() {
            return Ok(object);
        }
        let type_name = value.type_ref().name().to_string();
        self.class(&type_name)?.new_instance(id, value)
    }
}
