use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{categories, Category, ExceptionDispatcher, Thrown};
use crate::error::ConfigError;
use crate::request::{HttpRequest, Request};

static VALIDATION: Category = Category::child("ValidationException", &categories::ILLEGAL_ARGUMENT);
/// Unrelated to `categories::IO` apart from its display name.
static REMOTE_IO: Category = Category::child("IOException", &categories::RUNTIME);

fn handled(_: &Thrown, _: &dyn Request) -> bool {
    true
}

#[test]
fn test_category_hierarchy() {
    assert!(categories::FILE_NOT_FOUND.is_a(&categories::IO));
    assert!(categories::FILE_NOT_FOUND.is_a(&categories::EXCEPTION));
    assert!(categories::IO.is_a(&categories::IO));
    assert!(!categories::IO.is_a(&categories::FILE_NOT_FOUND));
    assert!(!categories::IO.is_a(&categories::RUNTIME));
    assert!(VALIDATION.is_a(&categories::RUNTIME));
    assert_eq!(VALIDATION.parent().map(Category::name), Some("IllegalArgumentException"));
}

#[test]
fn test_categories_sharing_a_name_stay_distinct() {
    assert_eq!(REMOTE_IO.name(), categories::IO.name());
    assert_ne!(REMOTE_IO, categories::IO);
    assert!(!REMOTE_IO.is_a(&categories::IO));
    assert!(!categories::FILE_NOT_FOUND.is_a(&REMOTE_IO));
    assert!(REMOTE_IO.is_a(&categories::RUNTIME));

    let local_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&local_hits);
    let mut exceptions = ExceptionDispatcher::new();
    exceptions
        .register(&categories::IO, move |_: &Thrown, _: &dyn Request| {
            hits.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();
    exceptions.register(&REMOTE_IO, handled).unwrap();
    assert_eq!(exceptions.len(), 2);

    let request = HttpRequest::get("/");
    assert!(exceptions.dispatch(&Thrown::new(&REMOTE_IO, "socket closed"), &request));
    assert_eq!(local_hits.load(Ordering::SeqCst), 0);
    assert!(exceptions.dispatch(&Thrown::new(&categories::FILE_NOT_FOUND, "a.txt"), &request));
    assert_eq!(local_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_narrow_after_broad_is_unreachable() {
    let mut exceptions = ExceptionDispatcher::new();
    exceptions.register(&categories::IO, handled).unwrap();
    let err = exceptions
        .register(&categories::FILE_NOT_FOUND, handled)
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnreachableHandler {
            category: "FileNotFoundException",
            shadowed_by: "IOException",
        }
    );
    assert_eq!(exceptions.len(), 1);
}

#[test]
fn test_same_category_twice_is_unreachable() {
    let mut exceptions = ExceptionDispatcher::new();
    exceptions.register(&categories::RUNTIME, handled).unwrap();
    assert!(matches!(
        exceptions.register(&categories::RUNTIME, handled),
        Err(ConfigError::UnreachableHandler { .. })
    ));
}

#[test]
fn test_narrow_first_selects_most_specific() {
    let fnf_hits = Arc::new(AtomicUsize::new(0));
    let io_hits = Arc::new(AtomicUsize::new(0));

    let mut exceptions = ExceptionDispatcher::new();
    let hits = Arc::clone(&fnf_hits);
    exceptions
        .register(&categories::FILE_NOT_FOUND, move |_: &Thrown, _: &dyn Request| {
            hits.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();
    let hits = Arc::clone(&io_hits);
    exceptions
        .register(&categories::IO, move |_: &Thrown, _: &dyn Request| {
            hits.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

    let request = HttpRequest::get("/");
    let fnf = Thrown::new(&categories::FILE_NOT_FOUND, "missing.txt");
    let io = Thrown::new(&categories::IO, "disk full");
    assert!(exceptions.dispatch(&fnf, &request));
    assert!(exceptions.dispatch(&io, &request));
    assert_eq!(fnf_hits.load(Ordering::SeqCst), 1);
    assert_eq!(io_hits.load(Ordering::SeqCst), 1);

    let names: Vec<_> = exceptions.categories().map(Category::name).collect();
    assert_eq!(names, ["FileNotFoundException", "IOException"]);
}

#[test]
fn test_unregistered_category_is_not_handled() {
    let mut exceptions = ExceptionDispatcher::new();
    exceptions.register(&categories::IO, handled).unwrap();
    let request = HttpRequest::get("/");
    assert!(!exceptions.dispatch(&Thrown::new(&categories::RUNTIME, "boom"), &request));
    assert!(exceptions.handler_for(&categories::ILLEGAL_ARGUMENT).is_none());
    assert!(exceptions.handler_for(&categories::FILE_NOT_FOUND).is_some());
}

#[test]
fn test_handler_may_decline() {
    let mut exceptions = ExceptionDispatcher::new();
    exceptions
        .register(&categories::RUNTIME, |t: &Thrown, _: &dyn Request| {
            t.message() != "decline"
        })
        .unwrap();
    let request = HttpRequest::get("/");
    assert!(exceptions.dispatch(&Thrown::new(&VALIDATION, "ok"), &request));
    assert!(!exceptions.dispatch(&Thrown::new(&VALIDATION, "decline"), &request));
}

#[test]
fn test_thrown_wraps_source_error() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml");
    let thrown = Thrown::from_error(&categories::FILE_NOT_FOUND, io);
    assert!(thrown.is(&categories::IO));
    assert_eq!(thrown.to_string(), "FileNotFoundException: config.yaml");
    let source = thrown.source_as::<std::io::Error>().unwrap();
    assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    assert!(std::error::Error::source(&thrown).is_some());
}
