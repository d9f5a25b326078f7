use std::sync::{Arc, Mutex};

use super::{
    collect_interceptors, CompositeMarker, InterceptedCall, InterceptorId, Marker, Next,
    TypeMarkers,
};
use crate::call::Outcome;
use crate::container::ServiceContainer;
use crate::controller::{HandlerClass, MethodDef};
use crate::dispatcher::EngineBuilder;
use crate::fetchers::ParamSpec;
use crate::request::{HttpRequest, Request};
use crate::value::Value;

const AUTH: InterceptorId = InterceptorId::new("auth");
const AUDIT: InterceptorId = InterceptorId::new("audit");
const TX: InterceptorId = InterceptorId::new("tx");
const TIMING: InterceptorId = InterceptorId::new("timing");

fn names(ids: &[InterceptorId]) -> Vec<&'static str> {
    ids.iter().map(InterceptorId::name).collect()
}

#[test]
fn test_collect_closest_first() {
    let base = Arc::new(TypeMarkers::new("Base").marker(Marker::intercept_with([TIMING])));
    let ty = TypeMarkers::new("Orders")
        .marker(Marker::intercept_with([TX]))
        .extends(base);
    let method = [Marker::intercept_with([AUTH, AUDIT])];

    let ids = collect_interceptors(&method, Some(&ty));
    assert_eq!(names(&ids), ["auth", "audit", "tx", "timing"]);
}

#[test]
fn test_composite_markers_expand_in_place() {
    let secured: Marker = CompositeMarker::new("Secured")
        .with(Marker::intercept_with([AUTH]))
        .with(CompositeMarker::new("Audited").with(Marker::intercept_with([AUDIT])).into())
        .into();
    let method = [
        Marker::intercept_with([TX]),
        secured.clone(),
        secured,
        Marker::intercept_with([TIMING]),
    ];

    let ids = collect_interceptors(&method, None);
    assert_eq!(names(&ids), ["tx", "auth", "audit", "timing"]);
}

#[test]
fn test_same_composite_on_method_and_type_counts_twice() {
    let secured: Marker = CompositeMarker::new("Secured")
        .with(Marker::intercept_with([AUTH]))
        .into();
    let ty = TypeMarkers::new("Orders").marker(secured.clone());
    let ids = collect_interceptors(&[secured], Some(&ty));
    assert_eq!(names(&ids), ["auth", "auth"]);
}

#[test]
fn test_no_markers() {
    assert!(collect_interceptors(&[], None).is_empty());
    let ty = TypeMarkers::new("Plain");
    assert!(collect_interceptors(&[], Some(&ty)).is_empty());
    assert_eq!(ty.name(), "Plain");
    assert!(ty.parent().is_none());
}

struct Orders;

type Log = Arc<Mutex<Vec<String>>>;

fn recording(
    log: &Log,
    name: &'static str,
) -> impl Fn(&mut InterceptedCall<'_>, Next<'_>) -> Outcome + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |call: &mut InterceptedCall<'_>, next: Next<'_>| {
        log.lock().unwrap().push(format!("{name}>"));
        let out = next.proceed(call);
        log.lock().unwrap().push(format!("<{name}"));
        out
    }
}

#[test]
fn test_chain_runs_furthest_first_and_unwinds() {
    let log: Log = Arc::default();
    let mut services = ServiceContainer::new();
    services.bind_instance(Orders);
    services.bind_interceptor(AUTH, recording(&log, "auth"));
    services.bind_interceptor(TX, recording(&log, "tx"));
    services.bind_interceptor(TIMING, recording(&log, "timing"));

    let base = Arc::new(TypeMarkers::new("Base").marker(Marker::intercept_with([TIMING])));
    let markers = Arc::new(
        TypeMarkers::new("Orders")
            .marker(Marker::intercept_with([TX]))
            .extends(base),
    );
    let body_log = Arc::clone(&log);
    let mut builder = EngineBuilder::new(services);
    builder
        .register_handler_class(
            HandlerClass::new::<Orders>().markers(markers).method(
                MethodDef::new("place", move |_: &Orders, _, _| {
                    body_log.lock().unwrap().push("body".to_string());
                    Ok(None)
                })
                .marker(Marker::intercept_with([AUTH])),
            ),
        )
        .unwrap();
    let engine = builder.build();

    let request = HttpRequest::get("/");
    engine.caller(&request).call::<Orders>("place").invoke().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        ["timing>", "tx>", "auth>", "body", "<auth", "<tx", "<timing"]
    );
}

#[test]
fn test_short_circuit_skips_inner_and_body() {
    let log: Log = Arc::default();
    let mut services = ServiceContainer::new();
    services.bind_instance(Orders);
    services.bind_interceptor(AUTH, recording(&log, "auth"));
    services.bind_interceptor(
        TX,
        |call: &mut InterceptedCall<'_>, next: Next<'_>| -> Outcome {
            assert_eq!(next.remaining(), 1);
            if call.request().header("x-deny").is_some() {
                return Ok(Some(Value::new("denied")));
            }
            next.proceed(call)
        },
    );

    let mut builder = EngineBuilder::new(services);
    builder
        .register_handler_class(
            HandlerClass::new::<Orders>().method(
                MethodDef::new("place", |_: &Orders, _, _| Ok(Some(Value::new("placed"))))
                    .marker(Marker::intercept_with([AUTH, TX])),
            ),
        )
        .unwrap();
    let engine = builder.build();

    let denied = HttpRequest::get("/").with_header("X-Deny", "1");
    let out = engine.caller(&denied).call::<Orders>("place").invoke().unwrap().unwrap();
    assert_eq!(out.downcast_ref::<&'static str>(), Some(&"denied"));
    assert!(log.lock().unwrap().is_empty());

    let allowed = HttpRequest::get("/");
    let out = engine.caller(&allowed).call::<Orders>("place").invoke().unwrap().unwrap();
    assert_eq!(out.downcast_ref::<&'static str>(), Some(&"placed"));
    assert_eq!(*log.lock().unwrap(), ["auth>", "<auth"]);
}

#[test]
fn test_interceptor_supplies_and_rewrites_arguments() {
    #[derive(Debug, Clone, PartialEq)]
    struct Principal(String);

    let mut services = ServiceContainer::new();
    services.bind_instance(Orders);
    services.bind_interceptor(
        AUTH,
        |call: &mut InterceptedCall<'_>, next: Next<'_>| -> Outcome {
            assert_eq!(call.method_name(), "place");
            assert_eq!(call.handler_name(), "Orders");
            assert!(call.args().opt::<Principal>(0).is_none());
            assert!(call.set_intercepted("principal", Value::new(Principal("ada".into()))));
            assert!(!call.set_intercepted("unknown", Value::new(0_u8)));
            let doubled = call.args().get::<u32>(1).map(|n| n * 2)?;
            call.args_mut().set(1, Value::new(doubled));
            next.proceed(call)
        },
    );

    let mut builder = EngineBuilder::new(services);
    builder
        .register_handler_class(
            HandlerClass::new::<Orders>().method(
                MethodDef::new("place", |_: &Orders, _, args| {
                    let who: &Principal = args.get(0)?;
                    let qty: &u32 = args.get(1)?;
                    Ok(Some(Value::new(format!("{} x{qty}", who.0))))
                })
                .param(ParamSpec::intercepted::<Principal>("principal"))
                .param(ParamSpec::query::<u32>("qty"))
                .marker(Marker::intercept_with([AUTH])),
            ),
        )
        .unwrap();
    let engine = builder.build();

    let request = HttpRequest::get("/?qty=3");
    let out = engine.caller(&request).call::<Orders>("place").invoke().unwrap().unwrap();
    assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("ada x6"));
}

#[test]
fn test_per_call_interceptor_provider() {
    let built = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&built);
    let mut services = ServiceContainer::new();
    services.bind_instance(Orders);
    services.bind_interceptor_provider(AUDIT, move |request: &dyn Request| {
        *counter.lock().unwrap() += 1;
        let path = request.path().to_string();
        Arc::new(move |call: &mut InterceptedCall<'_>, next: Next<'_>| -> Outcome {
            assert_eq!(call.request().path(), path);
            next.proceed(call)
        })
    });

    let mut builder = EngineBuilder::new(services);
    builder
        .register_handler_class(
            HandlerClass::new::<Orders>().method(
                MethodDef::new("list", |_: &Orders, _, _| Ok(None))
                    .marker(Marker::intercept_with([AUDIT])),
            ),
        )
        .unwrap();
    let engine = builder.build();

    for path in ["/a", "/b"] {
        let request = HttpRequest::get(path);
        assert!(engine.caller(&request).call::<Orders>("list").invoke().unwrap().is_none());
    }
    assert_eq!(*built.lock().unwrap(), 2);
}
