use http::Method;

use super::{select, Args, HandlerClass, HandlerRegistry, MethodDef};
use crate::call::{CallContext, Outcome};
use crate::container::ServiceContainer;
use crate::convert::Conversions;
use crate::error::ConfigError;
use crate::exception::categories;
use crate::fetchers::ParamSpec;
use crate::intercept::{InterceptedCall, InterceptorId, Marker, Next};
use crate::request::HttpRequest;
use crate::router::RequestMapping;
use crate::value::Value;

struct Items;
struct Special;

fn noop(_: &Items, _: &CallContext<'_>, _: &Args) -> Outcome {
    Ok(None)
}

fn special_noop(_: &Special, _: &CallContext<'_>, _: &Args) -> Outcome {
    Ok(None)
}

fn method(name: &'static str, mapping: RequestMapping) -> MethodDef {
    MethodDef::new(name, noop).mapping(mapping)
}

fn build(class: HandlerClass) -> Result<HandlerRegistry, ConfigError> {
    HandlerRegistry::build(class, &Conversions::default(), &ServiceContainer::new())
}

fn selected<'a>(registries: &'a [&'a HandlerRegistry], request: &HttpRequest) -> Option<&'a str> {
    select(registries.iter().copied(), request).map(|c| c.invocation().method_name())
}

#[test]
fn test_literal_beats_placeholder() {
    let registry = build(
        HandlerClass::new::<Items>()
            .method(
                method("show", RequestMapping::path("/item/{id}"))
                    .param(ParamSpec::path_variable::<String>("id")),
            )
            .method(method("special", RequestMapping::path("/item/special"))),
    )
    .unwrap();
    let registries = [&registry];

    assert_eq!(selected(&registries, &HttpRequest::get("/item/special")), Some("special"));
    assert_eq!(selected(&registries, &HttpRequest::get("/item/7")), Some("show"));
    assert_eq!(selected(&registries, &HttpRequest::get("/item/7/more")), None);
}

#[test]
fn test_verb_constraint_scores_and_eliminates() {
    let registry = build(
        HandlerClass::new::<Items>()
            .method(method("any", RequestMapping::path("/x")))
            .method(method("post_only", RequestMapping::path("/x").method(Method::POST))),
    )
    .unwrap();
    let registries = [&registry];

    assert_eq!(selected(&registries, &HttpRequest::post("/x")), Some("post_only"));
    assert_eq!(selected(&registries, &HttpRequest::get("/x")), Some("any"));

    let candidate = select(registries.iter().copied(), &HttpRequest::post("/x")).unwrap();
    assert_eq!(candidate.matched().confidence(), 1);
    assert_eq!(candidate.matched().group_count(), 0);
}

#[test]
fn test_fewer_groups_beat_higher_confidence() {
    let registry = build(
        HandlerClass::new::<Items>()
            .method(method(
                "confident",
                RequestMapping::path("/a/{b}")
                    .method(Method::GET)
                    .header("x-client"),
            ))
            .method(method("literal", RequestMapping::path("/a/b"))),
    )
    .unwrap();
    let request = HttpRequest::get("/a/b").with_header("X-Client", "cli");
    assert_eq!(selected(&[&registry], &request), Some("literal"));
}

#[test]
fn test_constraints_each_add_confidence() {
    let registry = build(
        HandlerClass::new::<Items>()
            .method(method("plain", RequestMapping::path("/q")))
            .method(method("with_param", RequestMapping::path("/q").param("term")))
            .method(method(
                "negotiated",
                RequestMapping::path("/q")
                    .param("term")
                    .consumes("application/json")
                    .produces("application/json"),
            )),
    )
    .unwrap();
    let registries = [&registry];

    assert_eq!(selected(&registries, &HttpRequest::get("/q")), Some("plain"));
    assert_eq!(selected(&registries, &HttpRequest::get("/q?term=x")), Some("with_param"));

    let json = HttpRequest::post("/q?term=x")
        .with_header("Content-Type", "application/json; charset=utf-8")
        .with_header("Accept", "text/html, application/*;q=0.8");
    let candidate = select(registries.iter().copied(), &json).unwrap();
    assert_eq!(candidate.invocation().method_name(), "negotiated");
    assert_eq!(candidate.matched().confidence(), 3);
}

#[test]
fn test_tie_keeps_first_registered() {
    let first = build(
        HandlerClass::new::<Items>().method(method("first", RequestMapping::path("/same"))),
    )
    .unwrap();
    let second = build(
        HandlerClass::new::<Special>()
            .method(MethodDef::new("second", special_noop).mapping(RequestMapping::path("/same"))),
    )
    .unwrap();

    let request = HttpRequest::get("/same");
    for _ in 0..10 {
        assert_eq!(selected(&[&first, &second], &request), Some("first"));
        assert_eq!(selected(&[&second, &first], &request), Some("second"));
    }
}

#[test]
fn test_templates_tried_in_declaration_order() {
    let registry = build(HandlerClass::new::<Items>().method(
        method(
            "multi",
            RequestMapping::path("/v1/{id}").and_path("/v2/{id}/{rev}"),
        )
        .param(ParamSpec::path_variable::<String>("id")),
    ))
    .unwrap();
    let candidate = select([&registry], &HttpRequest::get("/v2/9/3")).unwrap();
    assert_eq!(candidate.matched().pattern_index(), 1);
    let frame = candidate.frame();
    assert_eq!(frame.get("id"), Some("9"));
    assert_eq!(frame.get("rev"), Some("3"));
}

#[test]
fn test_unmapped_method_is_not_routable() {
    let registry = build(
        HandlerClass::new::<Items>()
            .method(MethodDef::new("helper", noop))
            .method(method("root", RequestMapping::path("/"))),
    )
    .unwrap();
    assert!(!registry.invocation("helper").unwrap().is_routable());
    assert!(registry.invocation("missing").is_none());
    assert_eq!(selected(&[&registry], &HttpRequest::get("/")), Some("root"));
}

#[test]
fn test_registration_errors() {
    let err = build(
        HandlerClass::new::<Items>()
            .method(MethodDef::new("dup", noop))
            .method(MethodDef::new("dup", noop)),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateMethod { ref method, .. } if method == "dup"));

    let err = build(HandlerClass::new::<Items>().method(MethodDef::new("wrong", special_noop)))
        .unwrap_err();
    assert!(matches!(err, ConfigError::HandlerTypeMismatch { .. }));

    let err = build(
        HandlerClass::new::<Items>().method(method("bad", RequestMapping::path("item/{id}"))),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MalformedTemplate { .. }));

    let err = build(
        HandlerClass::new::<Items>().method(
            method("show", RequestMapping::path("/item/{id}"))
                .param(ParamSpec::path_variable::<u32>("ident")),
        ),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::NoSuchPathVariable { ref name, .. } if name == "ident"));

    let err = build(
        HandlerClass::new::<Items>().method(
            MethodDef::new("guarded", noop)
                .marker(Marker::intercept_with([InterceptorId::new("auth")])),
        ),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownInterceptor { interceptor: "auth", .. }));
}

#[test]
fn test_known_interceptor_is_accepted() {
    let mut factory = ServiceContainer::new();
    factory.bind_interceptor(
        InterceptorId::new("auth"),
        |call: &mut InterceptedCall<'_>, next: Next<'_>| next.proceed(call),
    );
    let registry = HandlerRegistry::build(
        HandlerClass::new::<Items>().method(
            MethodDef::new("guarded", noop)
                .marker(Marker::intercept_with([InterceptorId::new("auth")])),
        ),
        &Conversions::default(),
        &factory,
    )
    .unwrap();
    let invocation = registry.invocation("guarded").unwrap();
    assert_eq!(invocation.interceptors(), [InterceptorId::new("auth")]);
}

#[test]
fn test_args_typed_access() {
    let args = Args::new(vec![Some(Value::new(5_u32)), None]);
    assert_eq!(args.get::<u32>(0).unwrap(), &5);
    assert!(args.opt::<u32>(1).is_none());

    let absent = args.get::<u32>(1).unwrap_err();
    assert!(absent.is(&categories::ILLEGAL_ARGUMENT));
    let wrong = args.get::<String>(0).unwrap_err();
    assert!(wrong.message().contains("u32"));

    let mut args = args;
    args.set(1, Value::new("x"));
    assert!(args.opt::<&'static str>(1).is_some());
    args.set(9, Value::new(0_u8));
    assert_eq!(args.len(), 2);
    args.clear(0);
    assert!(args.value(0).is_none());
}
