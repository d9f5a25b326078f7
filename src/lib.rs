//! # BRRTRouter MVC
//!
//! **BRRTRouter MVC** is a declarative request-dispatch engine. Handler classes
//! describe their methods once, at startup; the engine then picks the most
//! specific method for each request, resolves its arguments from the request
//! and the service container, runs it inside its interceptor chain and routes
//! failures to ordered exception handlers.
//!
//! ## Architecture
//!
//! - **[`router`]** - Route templates (`/item/{id}`) and request constraints
//! - **[`fetchers`]** - One argument fetcher per handler parameter
//! - **[`controller`]** - Handler descriptions, compiled invocations, candidate selection
//! - **[`call`]** - The executor and the reentrant [`call::Caller`]
//! - **[`scope`]** - Per-request stack of path-variable frames
//! - **[`intercept`]** - Interceptor markers and chains
//! - **[`exception`]** - Failure categories and the ordered exception dispatcher
//! - **[`dispatcher`]** - The registration phase and the frozen [`Engine`]
//! - **[`container`]** - Handler, service and interceptor instances
//! - **[`convert`]** - String-to-type conversions for path, query and header values
//! - **[`request`]** - The request abstraction the engine reads from
//!
//! ## Request Flow
//!
//! ```text
//! request ─► longest mount prefix ─► candidate selection ─► Caller
//!                                                            │
//!            push frame ◄────────────────────────────────────┘
//!                │
//!                ▼
//!   resolve arguments ─► interceptors (furthest first) ─► handler body
//!                                                            │
//!            pop frame ◄────────────────────────────────────┘
//!                │
//!                ▼
//!   Thrown? ─► exception dispatcher ─► Handled / Thrown / value
//! ```
//!
//! ## Selection
//!
//! Every invocation whose route template matches and whose declared
//! constraints (verb, required parameters and headers, consumes, produces)
//! all hold is a candidate. Fewer captured path variables wins, then more
//! satisfied constraints; on a complete tie the first registered wins.
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_mvc::container::ServiceContainer;
//! use brrtrouter_mvc::controller::{HandlerClass, MethodDef};
//! use brrtrouter_mvc::dispatcher::EngineBuilder;
//! use brrtrouter_mvc::fetchers::ParamSpec;
//! use brrtrouter_mvc::request::HttpRequest;
//! use brrtrouter_mvc::router::RequestMapping;
//! use brrtrouter_mvc::value::Value;
//! use brrtrouter_mvc::CallError;
//!
//! struct Pets;
//!
//! let mut services = ServiceContainer::new();
//! services.bind_instance(Pets);
//!
//! let mut builder = EngineBuilder::new(services);
//! let pets = builder
//!     .register_handler_class(
//!         HandlerClass::new::<Pets>()
//!             .method(
//!                 MethodDef::new("by_id", |_: &Pets, _, args| {
//!                     let id: &u32 = args.get(0)?;
//!                     Ok(Some(Value::new(format!("pet {id}"))))
//!                 })
//!                 .mapping(RequestMapping::path("/pets/{id}"))
//!                 .param(ParamSpec::path_variable::<u32>("id")),
//!             )
//!             .method(
//!                 MethodDef::new("list", |_: &Pets, _, args| {
//!                     let limit: &u32 = args.get(0)?;
//!                     Ok(Some(Value::new(format!("{limit} pets"))))
//!                 })
//!                 .mapping(RequestMapping::path("/pets"))
//!                 .param(ParamSpec::query::<u32>("limit").default_value("10")),
//!             ),
//!     )
//!     .unwrap();
//! builder.mount("", &pets).unwrap();
//! let engine = builder.build();
//!
//! let out = engine.dispatch(&HttpRequest::get("/pets/7")).unwrap().unwrap();
//! assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("pet 7"));
//!
//! let out = engine.dispatch(&HttpRequest::get("/pets")).unwrap().unwrap();
//! assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("10 pets"));
//!
//! let err = engine.dispatch(&HttpRequest::get("/pets/seven")).unwrap_err();
//! assert!(matches!(err, CallError::InvalidParameter { .. }));
//! assert_eq!(err.status_hint(), Some(400));
//! ```
//!
//! ## Configuration
//!
//! [`runtime_config::RuntimeConfig`] is read from `BRRTR_*` environment
//! variables or a YAML file; logging is set up with [`otel::init_logging_with_config`].

pub mod call;
pub mod cli;
pub mod container;
pub mod controller;
pub mod convert;
pub mod dispatcher;
mod error;
pub mod exception;
pub mod fetchers;
pub mod ids;
pub mod intercept;
pub mod otel;
pub mod request;
pub mod router;
pub mod runtime_config;
pub mod scope;
pub mod value;

pub use call::{Caller, Outcome};
pub use dispatcher::{Engine, EngineBuilder};
pub use error::{CallError, ConfigError};
pub use exception::{Category, Thrown};
pub use value::Value;
