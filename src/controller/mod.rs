//! # Controller Module
//!
//! Handler classes are described with builder calls instead of being
//! discovered by reflection. A [`HandlerClass`] lists its [`MethodDef`]s; each
//! method carries an optional [`crate::router::RequestMapping`], its
//! [`crate::fetchers::ParamSpec`]s, interceptor markers and a body closure.
//!
//! Registration compiles every method into an immutable [`Invocation`]:
//! route patterns, match constraints, one fetcher per parameter and the
//! flattened interceptor list. The invocations of one class form a
//! [`HandlerRegistry`].
//!
//! ## Selection
//!
//! [`select`] walks every registry bound to a mount and keeps the best
//! [`Candidate`]:
//!
//! 1. A route pattern must match the path, or the invocation is out.
//! 2. Every declared constraint must hold, or the invocation is out. Each one
//!    that holds adds 1 to the confidence.
//! 3. Fewer captured path variables beats more (`/item/special` beats `/item/{id}`).
//! 4. Then higher confidence wins.
//! 5. On a complete tie the candidate registered first wins.
//!
//! ```rust
//! use brrtrouter_mvc::controller::{HandlerClass, MethodDef};
//! use brrtrouter_mvc::fetchers::ParamSpec;
//! use brrtrouter_mvc::router::RequestMapping;
//! use brrtrouter_mvc::value::Value;
//!
//! struct Items;
//!
//! let class = HandlerClass::new::<Items>().method(
//!     MethodDef::new("show", |_: &Items, _, args| {
//!         let id: &u64 = args.get(0)?;
//!         Ok(Some(Value::new(format!("item {id}"))))
//!     })
//!     .mapping(RequestMapping::path("/item/{id}"))
//!     .param(ParamSpec::path_variable::<u64>("id")),
//! );
//! assert_eq!(class.name(), "Items");
//! ```

mod args;
mod descriptor;
mod invocation;
mod registry;
#[cfg(test)]
mod tests;

pub use args::Args;
pub use descriptor::{HandlerClass, MethodBody, MethodDef};
pub use invocation::{Invocation, MatchResult};
pub use registry::{select, Candidate, HandlerRegistry};
