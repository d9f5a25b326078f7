//! Error types for the registration phase and for calls.
//!
//! [`ConfigError`] is raised while handler classes, mounts and exception
//! handlers are registered; it must abort startup. [`CallError`] is the
//! per-request outcome of anything other than a normal return.

use std::fmt;

use http::Method;

use crate::exception::Thrown;

/// Registration-time configuration error.
///
/// Every variant is detected while the engine is being built. None of them
/// can occur once [`crate::dispatcher::Engine`] exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A route template could not be compiled.
    MalformedTemplate {
        /// The template as declared
        template: String,
        /// What is wrong with it
        reason: String,
    },
    /// A parameter's declared type has no registered converter.
    NoConverter {
        handler: String,
        method: String,
        position: usize,
        type_name: &'static str,
    },
    /// A parameter source cannot feed the declared shape (e.g. a map from a path variable).
    UnsupportedShape {
        handler: String,
        method: String,
        position: usize,
        source: &'static str,
    },
    /// A declared default value does not convert to the parameter type.
    InvalidDefault {
        handler: String,
        method: String,
        position: usize,
        value: String,
        reason: String,
    },
    /// A path-variable marker names a variable no template of the method declares.
    NoSuchPathVariable {
        handler: String,
        method: String,
        name: String,
    },
    /// An exception handler could never be selected.
    UnreachableHandler {
        /// Category of the rejected handler
        category: &'static str,
        /// Category of the earlier, broader entry that shadows it
        shadowed_by: &'static str,
    },
    /// Two methods of one handler class share a name.
    DuplicateMethod { handler: String, method: String },
    /// Two handler classes share a name.
    DuplicateHandler { handler: String },
    /// A method body was written for a different handler type than its class.
    HandlerTypeMismatch {
        handler: String,
        method: String,
        expected: &'static str,
        found: &'static str,
    },
    /// An interceptor marker names an id the interceptor factory cannot provide.
    UnknownInterceptor {
        handler: String,
        method: String,
        interceptor: &'static str,
    },
    /// The container has no binding for a handler class.
    NoHandlerInstance { handler: String },
    /// A mount prefix is not a valid path prefix.
    InvalidMount { prefix: String },
    /// Conversions were replaced after handler classes had been compiled with the old ones.
    ConversionsAfterRegistration { registered: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MalformedTemplate { template, reason } => {
                write!(f, "malformed route template '{template}': {reason}")
            }
            ConfigError::NoConverter {
                handler,
                method,
                position,
                type_name,
            } => write!(
                f,
                "{handler}::{method} parameter {position}: no converter registered for {type_name}"
            ),
            ConfigError::UnsupportedShape {
                handler,
                method,
                position,
                source,
            } => write!(
                f,
                "{handler}::{method} parameter {position}: {source} cannot feed a map-shaped parameter"
            ),
            ConfigError::InvalidDefault {
                handler,
                method,
                position,
                value,
                reason,
            } => write!(
                f,
                "{handler}::{method} parameter {position}: default value '{value}' is invalid: {reason}"
            ),
            ConfigError::NoSuchPathVariable {
                handler,
                method,
                name,
            } => write!(
                f,
                "{handler}::{method} references path variable '{name}' which no route template declares"
            ),
            ConfigError::UnreachableHandler {
                category,
                shadowed_by,
            } => write!(
                f,
                "exception handler for {category} is unreachable: the handler for {shadowed_by} is checked first"
            ),
            ConfigError::DuplicateMethod { handler, method } => {
                write!(f, "{handler} declares method '{method}' more than once")
            }
            ConfigError::DuplicateHandler { handler } => {
                write!(f, "handler class '{handler}' is registered more than once")
            }
            ConfigError::HandlerTypeMismatch {
                handler,
                method,
                expected,
                found,
            } => write!(
                f,
                "{handler}::{method} is bound to {found} but the class describes {expected}"
            ),
            ConfigError::UnknownInterceptor {
                handler,
                method,
                interceptor,
            } => write!(
                f,
                "{handler}::{method} is intercepted by '{interceptor}' which the interceptor factory does not provide"
            ),
            ConfigError::NoHandlerInstance { handler } => {
                write!(f, "no container binding provides an instance of {handler}")
            }
            ConfigError::InvalidMount { prefix } => {
                write!(f, "invalid mount prefix '{prefix}': must be empty or start with '/' and not end with '/'")
            }
            ConfigError::ConversionsAfterRegistration { registered } => write!(
                f,
                "conversions must be set before registering handler classes ({registered} already compiled)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Why a call did not return normally.
#[derive(Debug)]
pub enum CallError {
    /// No invocation structurally matched the request.
    NotFound { method: Method, path: String },
    /// A required argument had no value and no default.
    MissingParameter {
        name: String,
        /// Where it was looked up (`"path variables"`, `"query parameters"`, ...)
        source: &'static str,
    },
    /// An argument value could not be converted to its declared type.
    InvalidParameter {
        name: String,
        source: &'static str,
        reason: String,
    },
    /// No container binding for an injected argument.
    Unresolvable {
        type_name: &'static str,
        qualifier: Option<String>,
    },
    /// A reentrant call named a handler class that is not registered.
    NoSuchHandler { handler: String },
    /// A reentrant call named a method the handler class does not have.
    NoSuchMethod { handler: String, method: String },
    /// The container returned no handler instance at call time.
    NoHandlerInstance { handler: String },
    /// The interceptor factory returned no instance at call time.
    InterceptorUnavailable { interceptor: &'static str },
    /// Reentrant calls nested deeper than `RuntimeConfig::max_call_depth`.
    CallDepthExceeded { limit: usize },
    /// A registered exception handler dealt with the failure.
    Handled(Thrown),
    /// Nothing handled the failure.
    Thrown(Thrown),
}

impl CallError {
    /// The HTTP status a transport layer should answer with.
    ///
    /// `None` for [`CallError::Handled`]: the exception handler already took
    /// care of the response.
    #[must_use]
    pub fn status_hint(&self) -> Option<u16> {
        match self {
            CallError::NotFound { .. } => Some(404),
            CallError::MissingParameter { .. } | CallError::InvalidParameter { .. } => Some(400),
            CallError::Handled(_) => None,
            _ => Some(500),
        }
    }

    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, CallError::Handled(_))
    }

    /// The underlying failure for `Handled` and `Thrown`.
    #[must_use]
    pub fn thrown(&self) -> Option<&Thrown> {
        match self {
            CallError::Handled(t) | CallError::Thrown(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::NotFound { method, path } => write!(f, "no handler for {method} {path}"),
            CallError::MissingParameter { name, source } => {
                write!(f, "missing required parameter '{name}' in {source}")
            }
            CallError::InvalidParameter {
                name,
                source,
                reason,
            } => write!(f, "invalid value for parameter '{name}' in {source}: {reason}"),
            CallError::Unresolvable {
                type_name,
                qualifier: Some(q),
            } => write!(f, "no binding for {type_name} qualified '{q}'"),
            CallError::Unresolvable {
                type_name,
                qualifier: None,
            } => write!(f, "no binding for {type_name}"),
            CallError::NoSuchHandler { handler } => write!(f, "no handler class named '{handler}'"),
            CallError::NoSuchMethod { handler, method } => {
                write!(f, "{handler} has no method '{method}'")
            }
            CallError::NoHandlerInstance { handler } => {
                write!(f, "container returned no instance of {handler}")
            }
            CallError::InterceptorUnavailable { interceptor } => {
                write!(f, "interceptor '{interceptor}' could not be resolved")
            }
            CallError::CallDepthExceeded { limit } => {
                write!(f, "reentrant call depth exceeded the limit of {limit}")
            }
            CallError::Handled(t) => write!(f, "handled: {t}"),
            CallError::Thrown(t) => write!(f, "{t}"),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Handled(t) | CallError::Thrown(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Thrown> for CallError {
    fn from(thrown: Thrown) -> Self {
        CallError::Thrown(thrown)
    }
}
