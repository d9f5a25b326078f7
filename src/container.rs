//! Handler and service container.
//!
//! The engine does not construct handlers, interceptors or injected services
//! itself. It asks a [`Container`] for instances by type (plus an optional
//! qualifier) and an [`InterceptorFactory`] for interceptors by id.
//! [`ServiceContainer`] implements both with an in-memory `TypeId` map.
//!
//! ```rust
//! use brrtrouter_mvc::container::{Container, ServiceContainer};
//! use brrtrouter_mvc::value::TypeKey;
//!
//! struct Clock;
//!
//! let mut services = ServiceContainer::new();
//! services.bind_instance(Clock);
//! services.bind_named("greeting", String::from("hello"));
//! services.bind_provider(|| Vec::<u8>::new());
//!
//! assert!(services.provides(TypeKey::of::<Clock>(), None));
//! assert!(services.provides(TypeKey::of::<String>(), Some("greeting")));
//! assert!(!services.provides(TypeKey::of::<String>(), None));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::intercept::{Interceptor, InterceptorFactory, InterceptorId};
use crate::request::Request;
use crate::value::{TypeKey, Value};

/// Instance lookup by type and optional qualifier.
pub trait Container: Send + Sync {
    /// Whether a binding exists. Consulted at registration.
    fn provides(&self, key: TypeKey, qualifier: Option<&str>) -> bool;

    /// An instance for this call, or `None` when nothing is bound.
    fn instance(&self, key: TypeKey, qualifier: Option<&str>) -> Option<Value>;
}

type Provider = Arc<dyn Fn() -> Value + Send + Sync>;
type InterceptorProvider = Arc<dyn Fn(&dyn Request) -> Arc<dyn Interceptor> + Send + Sync>;

#[derive(Clone)]
enum Binding {
    Singleton(Value),
    Provider(Provider),
}

impl Binding {
    fn get(&self) -> Value {
        match self {
            Binding::Singleton(v) => v.clone(),
            Binding::Provider(p) => p(),
        }
    }
}

#[derive(Clone)]
enum InterceptorBinding {
    Singleton(Arc<dyn Interceptor>),
    PerCall(InterceptorProvider),
}

/// In-memory [`Container`] and [`InterceptorFactory`].
#[derive(Clone, Default)]
pub struct ServiceContainer {
    bindings: HashMap<(TypeId, Option<String>), Binding>,
    interceptors: HashMap<InterceptorId, InterceptorBinding>,
}

impl ServiceContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a shared instance of `T`.
    pub fn bind_instance<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.bind(TypeId::of::<T>(), None, Binding::Singleton(Value::new(value)))
    }

    /// Bind a shared instance of `T` under a qualifier.
    pub fn bind_named<T: Any + Send + Sync>(&mut self, qualifier: &str, value: T) -> &mut Self {
        self.bind(
            TypeId::of::<T>(),
            Some(qualifier.to_string()),
            Binding::Singleton(Value::new(value)),
        )
    }

    /// Bind a provider called for every lookup of `T`.
    pub fn bind_provider<T, F>(&mut self, provider: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bind(
            TypeId::of::<T>(),
            None,
            Binding::Provider(Arc::new(move || Value::new(provider()))),
        )
    }

    fn bind(&mut self, id: TypeId, qualifier: Option<String>, binding: Binding) -> &mut Self {
        self.bindings.insert((id, qualifier), binding);
        self
    }

    /// Bind one interceptor instance shared by every call.
    pub fn bind_interceptor<I: Interceptor + 'static>(
        &mut self,
        id: InterceptorId,
        interceptor: I,
    ) -> &mut Self {
        self.interceptors
            .insert(id, InterceptorBinding::Singleton(Arc::new(interceptor)));
        self
    }

    /// Bind an interceptor built afresh for every call.
    pub fn bind_interceptor_provider<F>(&mut self, id: InterceptorId, provider: F) -> &mut Self
    where
        F: Fn(&dyn Request) -> Arc<dyn Interceptor> + Send + Sync + 'static,
    {
        self.interceptors
            .insert(id, InterceptorBinding::PerCall(Arc::new(provider)));
        self
    }
}

impl Container for ServiceContainer {
    fn provides(&self, key: TypeKey, qualifier: Option<&str>) -> bool {
        self.bindings
            .contains_key(&(key.id(), qualifier.map(str::to_string)))
    }

    fn instance(&self, key: TypeKey, qualifier: Option<&str>) -> Option<Value> {
        let found = self
            .bindings
            .get(&(key.id(), qualifier.map(str::to_string)))
            .map(Binding::get);
        if found.is_none() {
            debug!(type_name = key.name(), qualifier, "No container binding");
        }
        found
    }
}

impl InterceptorFactory for ServiceContainer {
    fn provides_interceptor(&self, id: InterceptorId) -> bool {
        self.interceptors.contains_key(&id)
    }

    fn interceptor(&self, id: InterceptorId, request: &dyn Request) -> Option<Arc<dyn Interceptor>> {
        match self.interceptors.get(&id)? {
            InterceptorBinding::Singleton(i) => Some(Arc::clone(i)),
            InterceptorBinding::PerCall(p) => Some(p(request)),
        }
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("bindings", &self.bindings.len())
            .field("interceptors", &self.interceptors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_singleton_and_qualified_bindings() {
        let mut c = ServiceContainer::new();
        c.bind_instance(5_u32).bind_named("max", 10_u32);

        let plain = c.instance(TypeKey::of::<u32>(), None).unwrap();
        let max = c.instance(TypeKey::of::<u32>(), Some("max")).unwrap();
        assert_eq!(plain.downcast_ref::<u32>(), Some(&5));
        assert_eq!(max.downcast_ref::<u32>(), Some(&10));
        assert!(c.instance(TypeKey::of::<u32>(), Some("min")).is_none());
        assert!(c.instance(TypeKey::of::<u64>(), None).is_none());
    }

    #[test]
    fn test_provider_runs_per_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut c = ServiceContainer::new();
        c.bind_provider(move || counter.fetch_add(1, Ordering::SeqCst));

        let key = TypeKey::of::<usize>();
        assert_eq!(c.instance(key, None).unwrap().downcast_ref::<usize>(), Some(&0));
        assert_eq!(c.instance(key, None).unwrap().downcast_ref::<usize>(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
