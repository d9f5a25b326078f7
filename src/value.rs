//! Type-erased values and declared parameter types.
//!
//! Handler methods are described by builder calls rather than discovered
//! through reflection, so every argument travels through the engine as a
//! [`Value`]: an `Arc<dyn Any>` plus the Rust type name for diagnostics.
//! [`ParamType`] records what a handler parameter was declared as, including
//! the monomorphised collector that turns converted elements into a typed
//! `Vec<T>` or `HashMap<String, T>`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An immutable, cheaply cloneable, type-erased value.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap an already shared value without re-allocating.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// The concrete `TypeId` of the wrapped value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the erased value, e.g. to hand a handler instance to a method body.
    #[must_use]
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.type_name)
    }
}

/// Identity of a declared type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name (`my_app::PetController` → `PetController`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Builds the typed container for a list-shaped parameter.
pub type ListCollector = fn(Vec<Value>) -> Option<Value>;
/// Builds the typed container for a map-shaped parameter.
pub type MapCollector = fn(Vec<(String, Value)>) -> Option<Value>;

/// How a parameter's raw string values are shaped into one argument.
#[derive(Clone, Copy)]
pub enum Shape {
    Scalar,
    List(ListCollector),
    Map(MapCollector),
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("Scalar"),
            Shape::List(_) => f.write_str("List"),
            Shape::Map(_) => f.write_str("Map"),
        }
    }
}

/// The declared type of one handler parameter.
///
/// `element` is the type each raw string converts to: the parameter type itself
/// for scalars, `T` for `Vec<T>` and `HashMap<String, T>`.
#[derive(Debug, Clone, Copy)]
pub struct ParamType {
    declared: TypeKey,
    element: TypeKey,
    shape: Shape,
}

impl ParamType {
    #[must_use]
    pub fn of<T: Any + Send + Sync>() -> Self {
        let key = TypeKey::of::<T>();
        Self {
            declared: key,
            element: key,
            shape: Shape::Scalar,
        }
    }

    /// A `Vec<T>` parameter fed by every value of a multi-valued source.
    #[must_use]
    pub fn list_of<T: Any + Send + Sync + Clone>() -> Self {
        Self {
            declared: TypeKey::of::<Vec<T>>(),
            element: TypeKey::of::<T>(),
            shape: Shape::List(collect_list::<T>),
        }
    }

    /// A `HashMap<String, T>` parameter fed by `name:key` / `name[key]` entries.
    #[must_use]
    pub fn map_of<T: Any + Send + Sync + Clone>() -> Self {
        Self {
            declared: TypeKey::of::<HashMap<String, T>>(),
            element: TypeKey::of::<T>(),
            shape: Shape::Map(collect_map::<T>),
        }
    }

    #[must_use]
    pub fn declared(&self) -> TypeKey {
        self.declared
    }

    #[must_use]
    pub fn element(&self) -> TypeKey {
        self.element
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.shape, Shape::Scalar)
    }
}

fn collect_list<T: Any + Send + Sync + Clone>(items: Vec<Value>) -> Option<Value> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(item.downcast_ref::<T>()?.clone());
    }
    Some(Value::new(out))
}

fn collect_map<T: Any + Send + Sync + Clone>(entries: Vec<(String, Value)>) -> Option<Value> {
    let mut out = HashMap::with_capacity(entries.len());
    for (key, item) in entries {
        out.insert(key, item.downcast_ref::<T>()?.clone());
    }
    Some(Value::new(out))
}
