//! # Request Module
//!
//! The engine never talks to a transport directly. It reads requests through
//! the [`Request`] trait: verb, path, headers, query parameters, content type
//! and two attribute bags (request-scoped and session-scoped).
//!
//! [`HttpRequest`] is the in-memory implementation used by tests, the probe
//! CLI and transports that already parsed their input. [`PathInfo`] is the
//! view handed to handlers once a mount prefix has been stripped.

mod core;

pub use core::{
    media_type, strip_jsessionid, AttributeBag, HeaderVec, HttpRequest, ParamVec, PathInfo,
    Request, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
