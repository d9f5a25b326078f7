//! Runtime configuration from YAML files and the environment, applied to a
//! running engine.

mod common;

use brrtrouter_mvc::request::HttpRequest;
use brrtrouter_mvc::runtime_config::RuntimeConfig;
use common::temp_files;
use common::{pets_engine_with, text};

#[test]
fn test_load_yaml_file() {
    let file = temp_files::yaml("max_call_depth: 3\nstrip_jsessionid: false\n");
    let config = RuntimeConfig::load(file.path()).unwrap();
    assert_eq!(
        config,
        RuntimeConfig {
            max_call_depth: 3,
            strip_jsessionid: false,
            throw_when_handled: false,
        }
    );
}

#[test]
fn test_load_reports_path_and_cause() {
    let file = temp_files::yaml("max_call_depth: deep\n");
    let err = RuntimeConfig::load(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains(&file.path().display().to_string()), "{message}");
    assert!(message.contains("invalid runtime configuration"), "{message}");

    let missing = RuntimeConfig::load("/definitely/not/here.yaml").unwrap_err();
    assert!(missing.to_string().contains("failed to read"));
}

#[test]
fn test_zero_depth_and_empty_document() {
    let zero = RuntimeConfig::from_yaml_str("max_call_depth: 0\n");
    assert!(zero.is_err());
    let empty = RuntimeConfig::from_yaml_str("{}").unwrap();
    assert_eq!(empty, RuntimeConfig::default());
}

#[test]
fn test_environment_overrides() {
    std::env::set_var("BRRTR_MAX_CALL_DEPTH", "7");
    std::env::set_var("BRRTR_STRIP_JSESSIONID", "off");
    std::env::set_var("BRRTR_THROW_WHEN_HANDLED", "yes");
    let config = RuntimeConfig::from_env();
    assert_eq!(config.max_call_depth, 7);
    assert!(!config.strip_jsessionid);
    assert!(config.throw_when_handled);

    std::env::set_var("BRRTR_MAX_CALL_DEPTH", "0");
    std::env::set_var("BRRTR_STRIP_JSESSIONID", "maybe");
    let config = RuntimeConfig::from_env();
    assert_eq!(config.max_call_depth, 32);
    assert!(config.strip_jsessionid);

    std::env::remove_var("BRRTR_MAX_CALL_DEPTH");
    std::env::remove_var("BRRTR_STRIP_JSESSIONID");
    std::env::remove_var("BRRTR_THROW_WHEN_HANDLED");
}

#[test]
fn test_engine_honours_jsessionid_setting() {
    let request = HttpRequest::get("/api/pets/3;jsessionid=XYZ");

    let stripping = pets_engine_with(RuntimeConfig::default());
    assert_eq!(text(stripping.dispatch(&request)), "pet 3");

    let file = temp_files::yaml("strip_jsessionid: false\n");
    let keeping = pets_engine_with(RuntimeConfig::load(file.path()).unwrap());
    assert_eq!(keeping.config().max_call_depth, 32);
    assert!(keeping.dispatch(&request).is_err());
}
