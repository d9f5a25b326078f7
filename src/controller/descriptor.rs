use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::call::{CallContext, Outcome};
use crate::exception::{categories, Thrown};
use crate::fetchers::ParamSpec;
use crate::intercept::{Marker, TypeMarkers};
use crate::router::RequestMapping;
use crate::value::TypeKey;

use super::args::Args;

/// A type-erased method body: receives the handler instance, the call context
/// and the resolved arguments.
pub type MethodBody =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &CallContext<'_>, &Args) -> Outcome + Send + Sync>;

/// One method of a handler class.
pub struct MethodDef {
    name: Cow<'static, str>,
    handler: TypeKey,
    mapping: Option<RequestMapping>,
    params: Vec<ParamSpec>,
    markers: Vec<Marker>,
    body: MethodBody,
}

impl MethodDef {
    /// A method on handler type `H`. Without [`mapping`](Self::mapping) it is
    /// reachable only through reentrant calls.
    pub fn new<H, F>(name: impl Into<Cow<'static, str>>, body: F) -> Self
    where
        H: Any + Send + Sync,
        F: Fn(&H, &CallContext<'_>, &Args) -> Outcome + Send + Sync + 'static,
    {
        let body: MethodBody = Arc::new(
            move |instance: &(dyn Any + Send + Sync), cx: &CallContext<'_>, args: &Args| -> Outcome {
                let handler = instance.downcast_ref::<H>().ok_or_else(|| {
                    Thrown::new(
                        &categories::ILLEGAL_ARGUMENT,
                        format!("handler instance is not {}", std::any::type_name::<H>()),
                    )
                })?;
                body(handler, cx, args)
            },
        );
        Self {
            name: name.into(),
            handler: TypeKey::of::<H>(),
            mapping: None,
            params: Vec::new(),
            markers: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn mapping(mut self, mapping: RequestMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Append the next formal parameter.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    #[must_use]
    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Cow<'static, str>,
        TypeKey,
        Option<RequestMapping>,
        Vec<ParamSpec>,
        Vec<Marker>,
        MethodBody,
    ) {
        (
            self.name,
            self.handler,
            self.mapping,
            self.params,
            self.markers,
            self.body,
        )
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("mapping", &self.mapping)
            .field("params", &self.params.len())
            .finish()
    }
}

/// The description of one handler class.
#[derive(Debug)]
pub struct HandlerClass {
    key: TypeKey,
    name: String,
    markers: Option<Arc<TypeMarkers>>,
    methods: Vec<MethodDef>,
}

impl HandlerClass {
    /// Describe handler type `H`, named after its type.
    #[must_use]
    pub fn new<H: Any + Send + Sync>() -> Self {
        let key = TypeKey::of::<H>();
        Self {
            key,
            name: key.short_name().to_string(),
            markers: None,
            methods: Vec::new(),
        }
    }

    /// Override the name used for reentrant calls and logs.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Type-level markers, with their ancestor chain.
    #[must_use]
    pub fn markers(mut self, markers: Arc<TypeMarkers>) -> Self {
        self.markers = Some(markers);
        self
    }

    #[must_use]
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (TypeKey, String, Option<Arc<TypeMarkers>>, Vec<MethodDef>) {
        (self.key, self.name, self.markers, self.methods)
    }
}
