#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use brrtrouter_mvc::container::ServiceContainer;
use brrtrouter_mvc::controller::{HandlerClass, MethodDef};
use brrtrouter_mvc::dispatcher::{Engine, EngineBuilder};
use brrtrouter_mvc::fetchers::ParamSpec;
use brrtrouter_mvc::router::RequestMapping;
use brrtrouter_mvc::runtime_config::RuntimeConfig;
use brrtrouter_mvc::{Outcome, Value};
use http::Method;

/// Handler class of the pet store fixture.
pub struct Pets;

/// Injected into `Pets::stats`.
pub struct PetRepo {
    pub reads: AtomicUsize,
}

impl PetRepo {
    pub fn count(&self) -> usize {
        self.reads.fetch_add(1, Ordering::SeqCst);
        3
    }
}

pub fn pets_class() -> HandlerClass {
    HandlerClass::new::<Pets>()
        .method(
            MethodDef::new("by_id", |_: &Pets, _, args| {
                let id: &u64 = args.get(0)?;
                Ok(Some(Value::new(format!("pet {id}"))))
            })
            .mapping(RequestMapping::path("/pets/{id}").method(Method::GET))
            .param(ParamSpec::path_variable::<u64>("id")),
        )
        .method(
            MethodDef::new("featured", |_: &Pets, _, _| {
                Ok(Some(Value::new("featured".to_string())))
            })
            .mapping(RequestMapping::path("/pets/featured").method(Method::GET)),
        )
        .method(
            MethodDef::new("list", |_: &Pets, _, args| {
                let limit: &u32 = args.get(0)?;
                Ok(Some(Value::new(format!("list {limit}"))))
            })
            .mapping(RequestMapping::path("/pets").method(Method::GET))
            .param(ParamSpec::query::<u32>("limit").default_value("10")),
        )
        .method(
            MethodDef::new("search", |_: &Pets, _, args| {
                let q: &String = args.get(0)?;
                Ok(Some(Value::new(format!("search {q}"))))
            })
            .mapping(RequestMapping::path("/pets").method(Method::GET).param("q"))
            .param(ParamSpec::query::<String>("q")),
        )
        .method(
            MethodDef::new("create", |_: &Pets, _, _| {
                Ok(Some(Value::new("created".to_string())))
            })
            .mapping(
                RequestMapping::path("/pets")
                    .method(Method::POST)
                    .consumes("application/json"),
            ),
        )
        .method(
            MethodDef::new("stats", |_: &Pets, _, args| {
                let repo: &PetRepo = args.get(0)?;
                Ok(Some(Value::new(format!("{} pets", repo.count()))))
            })
            .mapping(RequestMapping::path("/stats"))
            .param(ParamSpec::inject::<PetRepo>()),
        )
}

pub fn pets_services() -> ServiceContainer {
    let mut services = ServiceContainer::new();
    services.bind_instance(Pets).bind_instance(PetRepo {
        reads: AtomicUsize::new(0),
    });
    services
}

/// The pet store mounted at `/api`.
pub fn pets_engine() -> Engine {
    pets_engine_with(RuntimeConfig::default())
}

pub fn pets_engine_with(config: RuntimeConfig) -> Engine {
    let mut builder = EngineBuilder::new(pets_services()).with_config(config);
    let pets = builder.register_handler_class(pets_class()).unwrap();
    builder.mount("/api", &pets).unwrap();
    builder.build()
}

/// The `String` a successful call returned, or `""`.
pub fn text(outcome: Outcome) -> String {
    outcome
        .unwrap()
        .and_then(|v| v.downcast_ref::<String>().cloned())
        .unwrap_or_default()
}

/// Counts how often an exception handler ran.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub mod temp_files {
    use super::*;

    /// A YAML file that lives as long as the returned handle.
    pub fn yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brrtmvc_test_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
