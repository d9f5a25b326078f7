use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::call::{CallContext, Outcome};
use crate::controller::Args;
use crate::request::Request;
use crate::value::Value;

/// Identity of an interceptor, resolved through an [`InterceptorFactory`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(&'static str);

impl InterceptorId {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterceptorId({})", self.0)
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Declarative metadata attached to a method, a type, or another marker.
#[derive(Debug, Clone)]
pub enum Marker {
    /// Wrap the invocation with these interceptors, the first one innermost.
    InterceptWith(Vec<InterceptorId>),
    /// A named marker that carries markers of its own.
    Composite(Arc<CompositeMarker>),
}

impl Marker {
    pub fn intercept_with(ids: impl IntoIterator<Item = InterceptorId>) -> Self {
        Marker::InterceptWith(ids.into_iter().collect())
    }
}

impl From<CompositeMarker> for Marker {
    fn from(marker: CompositeMarker) -> Self {
        Marker::Composite(Arc::new(marker))
    }
}

/// A marker made of other markers, e.g. `Secured` = intercept with `auth` and `audit`.
#[derive(Debug)]
pub struct CompositeMarker {
    name: &'static str,
    markers: Vec<Marker>,
}

impl CompositeMarker {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            markers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Markers declared on a handler type, linked to those of its ancestor.
#[derive(Debug, Default)]
pub struct TypeMarkers {
    name: &'static str,
    markers: Vec<Marker>,
    parent: Option<Arc<TypeMarkers>>,
}

impl TypeMarkers {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: Arc<TypeMarkers>) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<TypeMarkers>> {
        self.parent.as_ref()
    }
}

fn walk(markers: &[Marker], seen: &mut HashSet<&'static str>, out: &mut Vec<InterceptorId>) {
    for marker in markers {
        match marker {
            Marker::InterceptWith(ids) => out.extend(ids.iter().copied()),
            Marker::Composite(composite) => {
                if seen.insert(composite.name) {
                    walk(&composite.markers, seen, out);
                }
            }
        }
    }
}

/// Flatten every interceptor reachable from a method, closest first.
///
/// Order: the method's markers (recursing through composites, in declaration
/// order), then the type's markers, then each ancestor's. A composite reached
/// twice within one level is walked once.
#[must_use]
pub fn collect_interceptors(method: &[Marker], ty: Option<&TypeMarkers>) -> Vec<InterceptorId> {
    let mut out = Vec::new();
    walk(method, &mut HashSet::new(), &mut out);
    let mut level = ty;
    while let Some(t) = level {
        walk(&t.markers, &mut HashSet::new(), &mut out);
        level = t.parent.as_deref();
    }
    out
}

/// Wraps an invocation.
///
/// Call `next.proceed(call)` to continue the chain; return without calling it
/// to short-circuit.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, call: &mut InterceptedCall<'_>, next: Next<'_>) -> Outcome;
}

impl<F> Interceptor for F
where
    F: Fn(&mut InterceptedCall<'_>, Next<'_>) -> Outcome + Send + Sync,
{
    fn intercept(&self, call: &mut InterceptedCall<'_>, next: Next<'_>) -> Outcome {
        self(call, next)
    }
}

/// Resolves interceptor instances by id.
pub trait InterceptorFactory: Send + Sync {
    /// Whether `id` can ever be resolved. Consulted at registration.
    fn provides_interceptor(&self, id: InterceptorId) -> bool;

    /// An instance for this call.
    fn interceptor(&self, id: InterceptorId, request: &dyn Request) -> Option<Arc<dyn Interceptor>>;
}

/// The invocation as seen by an interceptor: its context and live arguments.
pub struct InterceptedCall<'a> {
    cx: &'a CallContext<'a>,
    args: &'a mut Args,
}

impl<'a> InterceptedCall<'a> {
    pub(crate) fn new(cx: &'a CallContext<'a>, args: &'a mut Args) -> Self {
        Self { cx, args }
    }

    #[must_use]
    pub fn context(&self) -> &CallContext<'a> {
        self.cx
    }

    #[must_use]
    pub fn request(&self) -> &dyn Request {
        self.cx.request()
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.cx.handler_name()
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        self.cx.method_name()
    }

    #[must_use]
    pub fn args(&self) -> &Args {
        &*self.args
    }

    pub fn args_mut(&mut self) -> &mut Args {
        &mut *self.args
    }

    /// Fill every parameter declared as intercepted under `key`.
    ///
    /// Returns `false` when the method has no such parameter.
    pub fn set_intercepted(&mut self, key: &str, value: Value) -> bool {
        let mut found = false;
        for position in self.cx.invocation().intercepted_positions(key) {
            self.args.set(position, value.clone());
            found = true;
        }
        found
    }
}

/// The rest of the chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Interceptor>],
    body: &'a dyn Fn(&mut InterceptedCall<'_>) -> Outcome,
}

impl<'a> Next<'a> {
    /// `chain[0]` runs first; `body` runs after the last interceptor proceeds.
    pub(crate) fn new(
        chain: &'a [Arc<dyn Interceptor>],
        body: &'a dyn Fn(&mut InterceptedCall<'_>) -> Outcome,
    ) -> Self {
        Self { chain, body }
    }

    /// Continue with the next interceptor, or the handler body if none is left.
    ///
    /// # Errors
    ///
    /// Whatever the inner interceptors or the handler body return.
    pub fn proceed(self, call: &mut InterceptedCall<'_>) -> Outcome {
        match self.chain.split_first() {
            Some((head, rest)) => head.intercept(
                call,
                Next {
                    chain: rest,
                    body: self.body,
                },
            ),
            None => (self.body)(call),
        }
    }

    /// Interceptors still ahead, not counting the body.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}
