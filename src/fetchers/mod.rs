//! # Fetchers Module
//!
//! Every formal parameter of a handler method is described by a [`ParamSpec`]
//! and resolved, once per call, by an [`ArgumentFetcher`].
//!
//! ## Resolution order
//!
//! 1. The call-time fetchers handed to a reentrant call are asked first. The
//!    first one whose [`CalltimeFetcher::can_fetch`] answers yes supplies the value.
//! 2. Otherwise the fetcher chosen at registration runs. The choice follows the
//!    parameter's markers in a fixed precedence: path variable, query
//!    parameter, request attribute, session attribute, header, intercepted
//!    parameter, and finally injection from the container by type (and
//!    optional qualifier).
//!
//! Path variables, query parameters and headers are strings converted through
//! the [`crate::convert::ConversionService`]. Attributes are returned as
//! stored. Intercepted parameters always start out absent; an interceptor is
//! expected to fill them with [`crate::intercept::InterceptedCall::set_intercepted`].

mod core;
mod sources;

pub use core::{
    ArgumentFetcher, CalltimeFetcher, FetchContext, ParamInfo, ParamMarker, ParamSpec, Provided,
};
pub(crate) use sources::{fetcher_for, Site};
