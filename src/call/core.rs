use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::controller::Invocation;
use crate::dispatcher::{Engine, HandlerRef};
use crate::error::CallError;
use crate::fetchers::{CalltimeFetcher, FetchContext};
use crate::intercept::{InterceptedCall, Next};
use crate::request::Request;
use crate::scope::{ScopeFrame, ScopeStack};
use crate::value::{TypeKey, Value};

/// What a call produces: the handler's return value, or why there is none.
pub type Outcome = Result<Option<Value>, CallError>;

/// Per-request entry point for handler calls.
///
/// Owns the request's [`ScopeStack`]. Create one per request with
/// [`Engine::caller`]; never share it between requests.
pub struct Caller<'e> {
    engine: &'e Engine,
    request: &'e dyn Request,
    scope: ScopeStack,
}

impl<'e> Caller<'e> {
    pub(crate) fn new(engine: &'e Engine, request: &'e dyn Request) -> Self {
        Self {
            engine,
            request,
            scope: ScopeStack::new(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    #[must_use]
    pub fn request(&self) -> &'e dyn Request {
        self.request
    }

    /// Number of calls currently running on this caller.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scope.depth()
    }

    /// Path variables of the innermost running call.
    #[must_use]
    pub fn current_frame(&self) -> Option<Rc<ScopeFrame>> {
        self.scope.current()
    }

    /// Prepare a call of `method` on the handler class registered for `H`.
    pub fn call<'c, H: Any>(&'c self, method: &'c str) -> CallBuilder<'c, 'e> {
        CallBuilder::new(self, HandlerRef::Type(TypeKey::of::<H>()), method)
    }

    /// Prepare a call of `method` on the handler class registered as `handler`.
    pub fn call_named<'c>(&'c self, handler: &'c str, method: &'c str) -> CallBuilder<'c, 'e> {
        CallBuilder::new(self, HandlerRef::Name(handler), method)
    }

    /// Run `invocation` with `frame` as its path variables.
    ///
    /// The frame is popped before a failure is offered to the exception
    /// dispatcher. Only a fresh [`CallError::Thrown`] is dispatched; a
    /// [`CallError::Handled`] coming out of a nested call passes through.
    pub(crate) fn execute(
        &self,
        invocation: &Invocation,
        frame: ScopeFrame,
        calltime: &[&dyn CalltimeFetcher],
        throw_when_handled: bool,
    ) -> Outcome {
        let limit = self.engine.config().max_call_depth;
        if self.scope.depth() >= limit {
            warn!(
                request_id = %self.request.request_id(),
                handler = invocation.handler_name(),
                method = invocation.method_name(),
                limit,
                "Call depth limit reached"
            );
            return Err(CallError::CallDepthExceeded { limit });
        }

        let start = Instant::now();
        let result = {
            let guard = self.scope.push(frame);
            trace!(
                request_id = %self.request.request_id(),
                handler = invocation.handler_name(),
                method = invocation.method_name(),
                depth = guard.depth(),
                "Call start"
            );
            self.run(invocation, calltime)
        };

        debug!(
            request_id = %self.request.request_id(),
            handler = invocation.handler_name(),
            method = invocation.method_name(),
            depth = self.scope.depth(),
            ok = result.is_ok(),
            duration_us = start.elapsed().as_micros() as u64,
            "Call complete"
        );

        match result {
            Err(CallError::Thrown(thrown)) => {
                if self.engine.exceptions().dispatch(&thrown, self.request) {
                    if throw_when_handled {
                        Err(CallError::Handled(thrown))
                    } else {
                        Ok(None)
                    }
                } else {
                    warn!(
                        request_id = %self.request.request_id(),
                        handler = invocation.handler_name(),
                        method = invocation.method_name(),
                        category = thrown.category().name(),
                        error = %thrown,
                        "Unhandled failure"
                    );
                    Err(CallError::Thrown(thrown))
                }
            }
            other => other,
        }
    }

    /// Everything between the frame push and pop.
    fn run(&self, invocation: &Invocation, calltime: &[&dyn CalltimeFetcher]) -> Outcome {
        let frame = self
            .scope
            .current()
            .unwrap_or_else(|| Rc::new(ScopeFrame::new()));
        let engine = self.engine;

        let fetch_cx = FetchContext::new(
            self.request,
            &frame,
            engine.conversions(),
            engine.container(),
        );
        let mut args = invocation.resolve(&fetch_cx, calltime)?;

        let instance = engine
            .container()
            .instance(invocation.handler(), None)
            .ok_or_else(|| CallError::NoHandlerInstance {
                handler: invocation.handler_name().to_string(),
            })?;

        // Furthest first: the closest interceptor wraps innermost.
        let chain = invocation
            .interceptors()
            .iter()
            .rev()
            .map(|id| {
                engine
                    .interceptor_factory()
                    .interceptor(*id, self.request)
                    .ok_or(CallError::InterceptorUnavailable {
                        interceptor: id.name(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cx = CallContext {
            caller: self,
            invocation,
            frame,
        };
        let body = |call: &mut InterceptedCall<'_>| -> Outcome {
            (invocation.body())(instance.as_any(), call.context(), call.args())
        };
        let mut call = InterceptedCall::new(&cx, &mut args);
        Next::new(&chain, &body).proceed(&mut call)
    }
}

impl fmt::Debug for Caller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("request_id", &self.request.request_id())
            .field("depth", &self.scope.depth())
            .finish()
    }
}

/// A reentrant call being prepared.
///
/// ```rust,ignore
/// let total = cx
///     .call::<Cart>("total")
///     .path_variables([("cart", "42")])
///     .fetcher(&Provided::by_type(Currency::Eur))
///     .invoke()?;
/// ```
#[must_use = "a call does nothing until invoke() runs it"]
pub struct CallBuilder<'c, 'e> {
    caller: &'c Caller<'e>,
    handler: HandlerRef<'c>,
    method: &'c str,
    frame: ScopeFrame,
    fetchers: Vec<&'c dyn CalltimeFetcher>,
    throw_when_handled: bool,
}

impl<'c, 'e> CallBuilder<'c, 'e> {
    fn new(caller: &'c Caller<'e>, handler: HandlerRef<'c>, method: &'c str) -> Self {
        Self {
            caller,
            handler,
            method,
            frame: ScopeFrame::new(),
            fetchers: Vec::new(),
            throw_when_handled: caller.engine.config().throw_when_handled,
        }
    }

    /// Path variables for the inner call. Without them it sees none.
    pub fn path_variables<K, V, I>(mut self, vars: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.frame = vars.into_iter().collect();
        self
    }

    /// Add a call-time fetcher; earlier ones are asked first.
    pub fn fetcher(mut self, fetcher: &'c dyn CalltimeFetcher) -> Self {
        self.fetchers.push(fetcher);
        self
    }

    /// Report a handled failure as [`CallError::Handled`] instead of `Ok(None)`.
    pub fn throw_when_handled(mut self, throw: bool) -> Self {
        self.throw_when_handled = throw;
        self
    }

    /// Look up the method and run it.
    ///
    /// # Errors
    ///
    /// [`CallError::NoSuchHandler`] or [`CallError::NoSuchMethod`] when the
    /// target does not exist, otherwise whatever the call produces.
    pub fn invoke(self) -> Outcome {
        let invocation = self.caller.engine.lookup(self.handler, self.method)?;
        debug!(
            request_id = %self.caller.request.request_id(),
            handler = invocation.handler_name(),
            method = invocation.method_name(),
            depth = self.caller.depth(),
            calltime_fetchers = self.fetchers.len(),
            "Reentrant call"
        );
        self.caller.execute(
            &invocation,
            self.frame,
            &self.fetchers,
            self.throw_when_handled,
        )
    }
}

/// What a handler body sees of the call it is running in.
pub struct CallContext<'a> {
    caller: &'a Caller<'a>,
    invocation: &'a Invocation,
    frame: Rc<ScopeFrame>,
}

impl<'a> CallContext<'a> {
    #[must_use]
    pub fn request(&self) -> &'a dyn Request {
        self.caller.request
    }

    #[must_use]
    pub fn caller(&self) -> &'a Caller<'a> {
        self.caller
    }

    #[must_use]
    pub fn invocation(&self) -> &'a Invocation {
        self.invocation
    }

    #[must_use]
    pub fn handler_name(&self) -> &'a str {
        self.invocation.handler_name()
    }

    #[must_use]
    pub fn method_name(&self) -> &'a str {
        self.invocation.method_name()
    }

    /// This call's path variables.
    #[must_use]
    pub fn frame(&self) -> &ScopeFrame {
        &self.frame
    }

    #[must_use]
    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.frame.get(name)
    }

    /// Shortcut for [`Caller::call`].
    pub fn call<H: Any>(&self, method: &'a str) -> CallBuilder<'a, 'a> {
        self.caller.call::<H>(method)
    }

    /// Shortcut for [`Caller::call_named`].
    pub fn call_named(&self, handler: &'a str, method: &'a str) -> CallBuilder<'a, 'a> {
        self.caller.call_named(handler, method)
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("handler", &self.invocation.handler_name())
            .field("method", &self.invocation.method_name())
            .field("frame", &self.frame)
            .finish()
    }
}
