//! # Dispatcher Module
//!
//! Ties the engine together in two phases.
//!
//! ## Registration
//!
//! [`EngineBuilder`] is used once, single-threaded, at startup. It compiles
//! handler classes into [`crate::controller::HandlerRegistry`]s, mounts them
//! below path prefixes and registers exception handlers. Every configuration
//! problem surfaces here as a [`crate::ConfigError`]; a service should refuse
//! to start on any of them.
//!
//! ## Dispatch
//!
//! [`EngineBuilder::build`] freezes everything into an [`Engine`], which is
//! `Send + Sync` and shared read-only by all request workers. For each
//! request [`Engine::dispatch`]:
//!
//! 1. Picks the longest mount prefix the path lies below and strips it
//!    (plus any `;jsessionid=` segment when configured).
//! 2. Selects the best invocation across the registries on that mount.
//! 3. Runs it through a fresh [`crate::call::Caller`].
//!
//! Reentrant calls look methods up by handler and name; the result is kept in
//! a concurrent cache so repeated calls skip the scan.
//!
//! ```rust
//! use brrtrouter_mvc::container::ServiceContainer;
//! use brrtrouter_mvc::controller::{HandlerClass, MethodDef};
//! use brrtrouter_mvc::dispatcher::EngineBuilder;
//! use brrtrouter_mvc::fetchers::ParamSpec;
//! use brrtrouter_mvc::request::HttpRequest;
//! use brrtrouter_mvc::router::RequestMapping;
//! use brrtrouter_mvc::value::Value;
//!
//! struct Items;
//!
//! let mut services = ServiceContainer::new();
//! services.bind_instance(Items);
//!
//! let mut builder = EngineBuilder::new(services);
//! let items = builder
//!     .register_handler_class(
//!         HandlerClass::new::<Items>().method(
//!             MethodDef::new("show", |_: &Items, _, args| {
//!                 let id: &u64 = args.get(0)?;
//!                 Ok(Some(Value::new(*id * 2)))
//!             })
//!             .mapping(RequestMapping::path("/item/{id}"))
//!             .param(ParamSpec::path_variable::<u64>("id")),
//!         ),
//!     )
//!     .unwrap();
//! builder.mount("/api", &items).unwrap();
//! let engine = builder.build();
//!
//! let out = engine.dispatch(&HttpRequest::get("/api/item/21")).unwrap().unwrap();
//! assert_eq!(out.downcast_ref::<u64>(), Some(&42));
//! assert!(engine.dispatch(&HttpRequest::get("/other/item/21")).is_err());
//! ```

mod core;
mod mounts;

pub(crate) use core::HandlerRef;
pub use core::{Engine, EngineBuilder};
pub use mounts::MountTable;
