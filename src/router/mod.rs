//! # Router Module
//!
//! Compiles declarative path templates and evaluates the constraints that
//! decide whether a handler method can serve a request.
//!
//! ## Templates
//!
//! A template is a literal path with `{name}` placeholders. Placeholders may
//! sit anywhere inside a segment (`/foo-{bar}/plop`) and match any run of
//! characters other than `/`. Everything else matches literally.
//!
//! ```rust
//! use brrtrouter_mvc::router::RoutePattern;
//!
//! let pattern = RoutePattern::compile("/users/{user}/posts/{post-id}").unwrap();
//! let caps = pattern.captures("/users/ada/posts/42").unwrap();
//! assert_eq!(pattern.index_of("post-id"), Some(2));
//! assert_eq!(caps.get(2), Some("42"));
//! assert!(pattern.captures("/users/ada/posts/42/extra").is_none());
//! ```
//!
//! ## Constraints and confidence
//!
//! Beyond the path, a [`RequestMapping`] may require an HTTP verb, query
//! parameters, headers, a body content type (`consumes`) and an acceptable
//! response type (`produces`). Each declared constraint is a hard filter; each
//! one satisfied adds 1 to the match confidence used to rank candidates.

mod constraints;
mod core;

pub use constraints::{accept_contains, MatchConstraints, RequestMapping};
pub use core::{RouteCaptures, RoutePattern};
