//! Unit tests for the probe CLI

use std::io::Write;

use clap::Parser;

use crate::cli::{run, Cli, Commands, RouteTable};
use crate::error::ConfigError;
use crate::request::HttpRequest;

const TABLE: &str = r#"
handlers:
  - name: Items
    methods:
      - name: show
        paths: ["/item/{id}"]
      - name: special
        paths: ["/item/special"]
      - name: create
        paths: ["/item"]
        verbs: [POST]
      - name: list
        paths: ["/item"]
      - name: helper
mounts:
  - prefix: /api
    handlers: [Items]
"#;

fn table_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_select_command_parses_headers() {
    let cli = Cli::try_parse_from([
        "brrtmvc-probe",
        "select",
        "--table",
        "routes.yaml",
        "--method",
        "post",
        "--path",
        "/api/item",
        "-H",
        "accept: application/json",
        "-H",
        "x-tenant: a",
    ])
    .unwrap();

    match cli.command {
        Commands::Select {
            table,
            method,
            path,
            headers,
            keep_jsessionid,
        } => {
            assert_eq!(table.to_string_lossy(), "routes.yaml");
            assert_eq!(method, "post");
            assert_eq!(path, "/api/item");
            assert_eq!(headers.len(), 2);
            assert!(!keep_jsessionid);
        }
        _ => panic!("Expected Select command"),
    }
}

#[test]
fn test_check_summarises_table() {
    let compiled = RouteTable::from_yaml_str(TABLE).unwrap().compile().unwrap();
    let summary = compiled.summary();
    assert_eq!(summary.handlers, 1);
    assert_eq!(summary.methods, 5);
    assert_eq!(summary.routable, 4);
    assert_eq!(summary.mounts, vec!["/api".to_string()]);
}

#[test]
fn test_select_prefers_literal_then_confidence() {
    let compiled = RouteTable::from_yaml_str(TABLE).unwrap().compile().unwrap();

    let special = compiled
        .select(&HttpRequest::get("/api/item/special"), true)
        .unwrap();
    assert_eq!(special.method, "special");
    assert_eq!(special.groups, 0);

    let show = compiled.select(&HttpRequest::get("/api/item/7"), true).unwrap();
    assert_eq!(show.method, "show");
    assert_eq!(show.pattern, "/item/{id}");
    assert_eq!(show.path_variables.get("id").map(String::as_str), Some("7"));

    let create = compiled.select(&HttpRequest::post("/api/item"), true).unwrap();
    assert_eq!(create.method, "create");
    assert_eq!(create.confidence, 1);

    let list = compiled.select(&HttpRequest::get("/api/item"), true).unwrap();
    assert_eq!(list.method, "list");

    assert!(compiled.select(&HttpRequest::get("/item/7"), true).is_none());
}

#[test]
fn test_compile_rejects_bad_tables() {
    let duplicate = "handlers:\n  - name: A\n  - name: A\n";
    assert!(RouteTable::from_yaml_str(duplicate).unwrap().compile().is_err());

    let malformed = "handlers:\n  - name: A\n    methods:\n      - name: m\n        paths: [\"/a/{b\"]\n";
    assert!(RouteTable::from_yaml_str(malformed).unwrap().compile().is_err());

    let unknown = "mounts:\n  - prefix: /x\n    handlers: [Nope]\n";
    let err = RouteTable::from_yaml_str(unknown).unwrap().compile().unwrap_err();
    assert!(err.to_string().contains("Nope"));

    let trailing = "handlers:\n  - name: A\nmounts:\n  - prefix: /x/\n    handlers: [A]\n";
    let err = RouteTable::from_yaml_str(trailing).unwrap().compile().unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::InvalidMount {
            prefix: "/x/".to_string()
        })
    );

    let empty_mount = "mounts:\n  - prefix: api\n    handlers: []\n";
    assert!(RouteTable::from_yaml_str(empty_mount).unwrap().compile().is_err());

    assert!(RouteTable::from_yaml_str("routes: []\n").is_err());
}

#[test]
fn test_longest_mount_wins_without_fallback() {
    let table = r#"
handlers:
  - name: Root
    methods:
      - name: home
        paths: ["/", "/admin/users", "/admin/other"]
  - name: Admin
    methods:
      - name: users
        paths: ["/users"]
mounts:
  - prefix: ""
    handlers: [Root]
  - prefix: /admin
    handlers: [Admin]
"#;
    let compiled = RouteTable::from_yaml_str(table).unwrap().compile().unwrap();
    assert_eq!(compiled.summary().mounts, vec!["/admin".to_string(), String::new()]);

    let users = compiled.select(&HttpRequest::get("/admin/users"), true).unwrap();
    assert_eq!(users.mount, "/admin");
    assert_eq!(users.handler, "Admin");
    assert_eq!(users.method, "users");
    assert!(compiled.select(&HttpRequest::get("/admin/other"), true).is_none());

    let home = compiled.select(&HttpRequest::get("/"), true).unwrap();
    assert_eq!((home.mount.as_str(), home.method.as_str()), ("", "home"));
}

#[test]
fn test_run_select_writes_json() {
    let file = table_file(TABLE);
    let command = Commands::Select {
        table: file.path().to_path_buf(),
        method: "GET".to_string(),
        path: "/api/item/42;jsessionid=ABC?x=1".to_string(),
        headers: vec![],
        keep_jsessionid: false,
    };
    let mut out = Vec::new();
    run(&command, &mut out).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["handler"], "Items");
    assert_eq!(json["method"], "show");
    assert_eq!(json["path_variables"]["id"], "42");
    assert_eq!(json["mount"], "/api");
}

#[test]
fn test_run_select_without_match_fails() {
    let file = table_file(TABLE);
    let command = Commands::Select {
        table: file.path().to_path_buf(),
        method: "GET".to_string(),
        path: "/elsewhere".to_string(),
        headers: vec![],
        keep_jsessionid: false,
    };
    let mut out = Vec::new();
    let err = run(&command, &mut out).unwrap_err();
    assert!(err.to_string().contains("/elsewhere"));
    assert!(out.is_empty());
}
