//! # Intercept Module
//!
//! Interceptors wrap handler invocations. They are attached declaratively with
//! [`Marker`]s on a method, on a composite marker that the method carries, on
//! the handler type, or on one of its ancestors.
//!
//! ## Chain order
//!
//! Markers are flattened once, at registration, into a list ordered from the
//! closest (method) to the furthest (oldest ancestor). The closest interceptor
//! wraps innermost: when the chain runs, the furthest interceptor is entered
//! first and each one decides whether to call [`Next::proceed`]. Returning
//! without proceeding short-circuits the remaining interceptors and the
//! handler body.
//!
//! ## Resolution
//!
//! Markers name interceptors by [`InterceptorId`]. Instances come from an
//! [`InterceptorFactory`] on every call, so an interceptor may be request
//! scoped. Ids the factory does not know are rejected at registration.

mod core;
#[cfg(test)]
mod tests;

pub use core::{
    collect_interceptors, CompositeMarker, InterceptedCall, Interceptor, InterceptorFactory,
    InterceptorId, Marker, Next, TypeMarkers,
};
