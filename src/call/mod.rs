//! # Call Module
//!
//! Runs handler methods. A [`Caller`] is created per request and owns that
//! request's [`crate::scope::ScopeStack`]; route dispatch and programmatic
//! reentrant calls both go through it.
//!
//! ## One call
//!
//! 1. Refuse when the stack is already `max_call_depth` frames deep.
//! 2. Push the call's path variables as a new frame.
//! 3. Resolve every argument: call-time fetchers first, then the fetcher
//!    chosen at registration.
//! 4. Ask the container for the handler instance and the interceptor factory
//!    for every interceptor, afresh.
//! 5. Run the interceptor chain around the method body.
//! 6. Pop the frame, whatever happened.
//! 7. Offer a [`crate::exception::Thrown`] failure to the exception
//!    dispatcher. A handled failure becomes `Ok(None)`, or
//!    [`crate::CallError::Handled`] when the call asked for it.
//!
//! ## Reentrant calls
//!
//! A handler body receives a [`CallContext`] and can call any other
//! registered method through it, bypassing route matching:
//!
//! ```rust
//! use brrtrouter_mvc::container::ServiceContainer;
//! use brrtrouter_mvc::controller::{HandlerClass, MethodDef};
//! use brrtrouter_mvc::dispatcher::EngineBuilder;
//! use brrtrouter_mvc::fetchers::ParamSpec;
//! use brrtrouter_mvc::request::HttpRequest;
//! use brrtrouter_mvc::value::Value;
//!
//! struct Greeter;
//!
//! let mut services = ServiceContainer::new();
//! services.bind_instance(Greeter);
//!
//! let mut builder = EngineBuilder::new(services);
//! builder
//!     .register_handler_class(
//!         HandlerClass::new::<Greeter>()
//!             .method(
//!                 MethodDef::new("name", |_: &Greeter, _, args| {
//!                     let who: &String = args.get(0)?;
//!                     Ok(Some(Value::new(who.to_uppercase())))
//!                 })
//!                 .param(ParamSpec::path_variable::<String>("who")),
//!             )
//!             .method(MethodDef::new("greet", |_: &Greeter, cx, _| {
//!                 let name = cx
//!                     .call::<Greeter>("name")
//!                     .path_variables([("who", "ada")])
//!                     .invoke()?;
//!                 let name = name.as_ref().and_then(|v| v.downcast_ref::<String>());
//!                 Ok(Some(Value::new(format!("hello {}", name.map_or("?", String::as_str)))))
//!             })),
//!     )
//!     .unwrap();
//! let engine = builder.build();
//!
//! let request = HttpRequest::get("/");
//! let caller = engine.caller(&request);
//! let out = caller.call::<Greeter>("greet").invoke().unwrap().unwrap();
//! assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("hello ADA"));
//! ```

mod core;

pub use core::{CallBuilder, CallContext, Caller, Outcome};
