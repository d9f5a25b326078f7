use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::call::{Caller, Outcome};
use crate::container::Container;
use crate::controller::{select, Candidate, HandlerClass, HandlerRegistry, Invocation};
use crate::convert::{ConversionService, Conversions};
use crate::error::{CallError, ConfigError};
use crate::exception::{Category, ExceptionDispatcher, ExceptionHandler};
use crate::intercept::InterceptorFactory;
use crate::request::Request;
use crate::runtime_config::RuntimeConfig;
use crate::value::TypeKey;

use super::mounts::MountTable;

/// Target of a reentrant call.
#[derive(Debug, Clone, Copy)]
pub(crate) enum HandlerRef<'a> {
    Type(TypeKey),
    Name(&'a str),
}

/// Registration phase. Everything is validated here; [`build`](Self::build)
/// freezes the result into an [`Engine`].
pub struct EngineBuilder {
    container: Arc<dyn Container>,
    interceptor_factory: Arc<dyn InterceptorFactory>,
    conversions: Arc<dyn ConversionService>,
    config: RuntimeConfig,
    registries: Vec<Arc<HandlerRegistry>>,
    mounts: MountTable,
    exceptions: ExceptionDispatcher,
}

impl EngineBuilder {
    /// Use `container` for handler instances, injected services and interceptors.
    pub fn new<C>(container: C) -> Self
    where
        C: Container + InterceptorFactory + 'static,
    {
        let shared = Arc::new(container);
        let interceptor_factory: Arc<dyn InterceptorFactory> = Arc::clone(&shared) as _;
        Self::with_parts(shared, interceptor_factory)
    }

    /// Separate handler/service container and interceptor factory.
    pub fn with_parts(
        container: Arc<dyn Container>,
        interceptor_factory: Arc<dyn InterceptorFactory>,
    ) -> Self {
        Self {
            container,
            interceptor_factory,
            conversions: Arc::new(Conversions::default()),
            config: RuntimeConfig::default(),
            registries: Vec::new(),
            mounts: MountTable::new(),
            exceptions: ExceptionDispatcher::new(),
        }
    }

    /// Replace the built-in conversions.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConversionsAfterRegistration`] once a handler class has
    /// been compiled against the current conversions.
    pub fn with_conversions<S: ConversionService + 'static>(
        mut self,
        conversions: S,
    ) -> Result<Self, ConfigError> {
        if !self.registries.is_empty() {
            return Err(ConfigError::ConversionsAfterRegistration {
                registered: self.registries.len(),
            });
        }
        self.conversions = Arc::new(conversions);
        Ok(self)
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile a handler class.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateHandler`] and [`ConfigError::NoHandlerInstance`]
    /// for the class itself, or any error compiling one of its methods.
    pub fn register_handler_class(
        &mut self,
        class: HandlerClass,
    ) -> Result<Arc<HandlerRegistry>, ConfigError> {
        if self
            .registries
            .iter()
            .any(|r| r.name() == class.name() || r.key() == class.key())
        {
            return Err(ConfigError::DuplicateHandler {
                handler: class.name().to_string(),
            });
        }
        if !self.container.provides(class.key(), None) {
            return Err(ConfigError::NoHandlerInstance {
                handler: class.key().name().to_string(),
            });
        }
        let registry = Arc::new(HandlerRegistry::build(
            class,
            self.conversions.as_ref(),
            self.interceptor_factory.as_ref(),
        )?);
        self.registries.push(Arc::clone(&registry));
        Ok(registry)
    }

    /// Serve `registry` below `prefix` (`""` for the root).
    ///
    /// Registries on the same prefix compete in the order they were mounted.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMount`] unless `prefix` is empty or starts with
    /// `/` and does not end with `/`.
    pub fn mount(&mut self, prefix: &str, registry: &Arc<HandlerRegistry>) -> Result<(), ConfigError> {
        self.mounts.mount(prefix, registry)
    }

    /// Append an exception handler.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnreachableHandler`] when an earlier handler already
    /// covers `category`.
    pub fn register_exception_handler<H>(
        &mut self,
        category: &'static Category,
        handler: H,
    ) -> Result<(), ConfigError>
    where
        H: ExceptionHandler + 'static,
    {
        self.exceptions.register(category, handler)
    }

    /// Freeze the registration.
    #[must_use]
    pub fn build(self) -> Engine {
        let by_type = self
            .registries
            .iter()
            .map(|r| (r.key().id(), Arc::clone(r)))
            .collect();
        let by_name = self
            .registries
            .iter()
            .map(|r| (r.name().to_string(), Arc::clone(r)))
            .collect();

        info!(
            handlers = self.registries.len(),
            mounts = self.mounts.len(),
            exception_handlers = self.exceptions.len(),
            max_call_depth = self.config.max_call_depth,
            "Engine built"
        );

        Engine {
            container: self.container,
            interceptor_factory: self.interceptor_factory,
            conversions: self.conversions,
            config: self.config,
            registries: self.registries,
            by_type,
            by_name,
            mounts: self.mounts,
            exceptions: self.exceptions,
            lookup_cache: DashMap::new(),
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("registries", &self.registries.len())
            .field("mounts", &self.mounts)
            .field("exceptions", &self.exceptions)
            .finish()
    }
}

/// The frozen dispatch engine, shared by every request.
pub struct Engine {
    container: Arc<dyn Container>,
    interceptor_factory: Arc<dyn InterceptorFactory>,
    conversions: Arc<dyn ConversionService>,
    config: RuntimeConfig,
    registries: Vec<Arc<HandlerRegistry>>,
    by_type: HashMap<TypeId, Arc<HandlerRegistry>>,
    by_name: HashMap<String, Arc<HandlerRegistry>>,
    mounts: MountTable,
    exceptions: ExceptionDispatcher,
    /// (handler, method) -> invocation, filled on first reentrant use
    lookup_cache: DashMap<(String, String), Arc<Invocation>>,
}

impl Engine {
    /// Route `request` to the best invocation below the longest matching mount.
    ///
    /// A handled failure is reported as [`CallError::Handled`] so the transport
    /// knows a response was already produced.
    ///
    /// # Errors
    ///
    /// [`CallError::NotFound`] when no mount or invocation matches, otherwise
    /// whatever the call produces.
    pub fn dispatch(&self, request: &dyn Request) -> Outcome {
        if let Some((prefix, registries, info)) =
            self.mounts.resolve(request, self.config.strip_jsessionid)
        {
            debug!(
                request_id = %request.request_id(),
                method = %request.method(),
                path = request.path(),
                prefix,
                "Mount matched"
            );
            return self.select_and_invoke(&info, registries);
        }
        debug!(
            request_id = %request.request_id(),
            method = %request.method(),
            path = request.path(),
            "No mount for request"
        );
        Err(CallError::NotFound {
            method: request.method().clone(),
            path: request.path().to_string(),
        })
    }

    /// Select the best invocation among `registries` and run it.
    ///
    /// # Errors
    ///
    /// [`CallError::NotFound`] when nothing matches, otherwise whatever the call produces.
    pub fn select_and_invoke(
        &self,
        request: &dyn Request,
        registries: &[Arc<HandlerRegistry>],
    ) -> Outcome {
        let Some(candidate) = select(registries.iter().map(Arc::as_ref), request) else {
            debug!(
                request_id = %request.request_id(),
                method = %request.method(),
                path = request.path(),
                "No invocation matched"
            );
            return Err(CallError::NotFound {
                method: request.method().clone(),
                path: request.path().to_string(),
            });
        };
        let caller = self.caller(request);
        caller.execute(candidate.invocation(), candidate.frame(), &[], true)
    }

    /// The invocation [`dispatch`](Self::dispatch) would run, without running it.
    ///
    /// Paths are matched relative to the mount, as handlers see them.
    #[must_use]
    pub fn select(&self, request: &dyn Request) -> Option<Candidate<'_>> {
        self.mounts
            .select(request, self.config.strip_jsessionid)
            .map(|(_, candidate)| candidate)
    }

    /// A caller for programmatic calls on behalf of `request`.
    #[must_use]
    pub fn caller<'e>(&'e self, request: &'e dyn Request) -> Caller<'e> {
        Caller::new(self, request)
    }

    /// Find `method` on a registered handler class.
    pub(crate) fn lookup(
        &self,
        handler: HandlerRef<'_>,
        method: &str,
    ) -> Result<Arc<Invocation>, CallError> {
        let registry = match handler {
            HandlerRef::Type(key) => self.by_type.get(&key.id()).ok_or_else(|| {
                CallError::NoSuchHandler {
                    handler: key.short_name().to_string(),
                }
            })?,
            HandlerRef::Name(name) => {
                self.by_name
                    .get(name)
                    .ok_or_else(|| CallError::NoSuchHandler {
                        handler: name.to_string(),
                    })?
            }
        };

        let key = (registry.name().to_string(), method.to_string());
        if let Some(hit) = self.lookup_cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }
        let invocation = registry
            .invocation(method)
            .cloned()
            .ok_or_else(|| CallError::NoSuchMethod {
                handler: registry.name().to_string(),
                method: method.to_string(),
            })?;
        // Racing inserts store the same Arc contents; either one may win.
        self.lookup_cache.insert(key, Arc::clone(&invocation));
        Ok(invocation)
    }

    /// The registry of handler type `H`.
    #[must_use]
    pub fn registry<H: Any>(&self) -> Option<&Arc<HandlerRegistry>> {
        self.by_type.get(&TypeId::of::<H>())
    }

    #[must_use]
    pub fn registry_named(&self, name: &str) -> Option<&Arc<HandlerRegistry>> {
        self.by_name.get(name)
    }

    /// All registries in registration order.
    #[must_use]
    pub fn registries(&self) -> &[Arc<HandlerRegistry>] {
        &self.registries
    }

    /// Mount prefixes, longest first.
    pub fn mounts(&self) -> impl Iterator<Item = &str> + '_ {
        self.mounts.prefixes()
    }

    #[must_use]
    pub fn mount_table(&self) -> &MountTable {
        &self.mounts
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn exceptions(&self) -> &ExceptionDispatcher {
        &self.exceptions
    }

    #[must_use]
    pub fn conversions(&self) -> &dyn ConversionService {
        self.conversions.as_ref()
    }

    #[must_use]
    pub fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    #[must_use]
    pub fn interceptor_factory(&self) -> &dyn InterceptorFactory {
        self.interceptor_factory.as_ref()
    }

    /// Entries currently in the reentrant lookup cache.
    #[must_use]
    pub fn cached_lookups(&self) -> usize {
        self.lookup_cache.len()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registries", &self.registries)
            .field("mounts", &self.mounts)
            .field("exceptions", &self.exceptions)
            .field("config", &self.config)
            .finish()
    }
}
