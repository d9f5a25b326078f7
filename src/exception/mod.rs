//! # Exception Module
//!
//! Handler bodies, interceptors and call-time fetchers fail by raising a
//! [`Thrown`]: a message tagged with a static [`Category`]. Categories form a
//! single-inheritance tree (`FILE_NOT_FOUND` is an `IO` failure, which is an
//! `EXCEPTION`), so one handler can cover a whole branch.
//!
//! The [`ExceptionDispatcher`] keeps handlers in registration order and picks
//! the first one whose category covers the failure. Because lookup is
//! earliest-first, registering a narrower category after a broader one would
//! produce a handler that can never run; [`ExceptionDispatcher::register`]
//! rejects that with [`crate::ConfigError::UnreachableHandler`].
//!
//! ```rust
//! use brrtrouter_mvc::exception::{categories, ExceptionDispatcher, Thrown};
//! use brrtrouter_mvc::request::Request;
//!
//! let mut exceptions = ExceptionDispatcher::new();
//! exceptions
//!     .register(&categories::FILE_NOT_FOUND, |_: &Thrown, _: &dyn Request| true)
//!     .unwrap();
//! exceptions
//!     .register(&categories::IO, |_: &Thrown, _: &dyn Request| true)
//!     .unwrap();
//! // The other way round fails: the IO handler would shadow FILE_NOT_FOUND.
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{categories, Category, ExceptionDispatcher, ExceptionHandler, Thrown};
