//! Integration tests for DocumentService against in-memory and real filesystems

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use yamlx::application::services::{DocumentFormat, DocumentService};
use yamlx::application::ApplicationError;
use yamlx::config::Settings;
use yamlx::domain::{Detection, DomainError, ResolveOptions, Value};
use yamlx::infrastructure::traits::{FileSystem, InMemoryFileSystem, RealFileSystem};
use yamlx::infrastructure::ServiceContainer;
use yamlx::util::testing;

const SERVER_YAML: &str = r#"
server:
  host: localhost
  port: 8000
  workers: 4
limits:
  connections: ${server.workers} * 256
  next_port: ${server.port} + 1
"#;

fn memory_service(files: &[(&str, &str)]) -> (Arc<InMemoryFileSystem>, DocumentService) {
    testing::init_test_setup();
    let fs = files
        .iter()
        .fold(InMemoryFileSystem::new(), |fs, (path, content)| {
            fs.with_file(*path, *content)
        });
    let fs = Arc::new(fs);
    let service = DocumentService::new(fs.clone(), ResolveOptions::default());
    (fs, service)
}

fn at<'a>(value: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(value, |node, segment| node.child(segment))
        .unwrap_or_else(|| panic!("no value at {path}"))
}

// ============================================================
// load / resolve_file
// ============================================================

#[test]
fn given_yaml_document_when_resolve_file_then_expressions_evaluated() {
    // Arrange
    let (_, service) = memory_service(&[("server.ymx", SERVER_YAML)]);

    // Act
    let resolved = service.resolve_file(Path::new("server.ymx")).unwrap();

    // Assert
    assert_eq!(at(&resolved, "limits.connections"), &Value::Float(1024.0));
    assert_eq!(at(&resolved, "limits.next_port"), &Value::Float(8001.0));
    assert_eq!(at(&resolved, "server.host"), &Value::from("localhost"));
    assert_eq!(at(&resolved, "server.port"), &Value::Integer(8000));
}

#[test]
fn given_json_document_when_resolve_file_then_expressions_evaluated() {
    let json = r#"{"a": {"b": 3}, "c": "${a.b} ** 2"}"#;
    let (_, service) = memory_service(&[("conf.json", json)]);

    let resolved = service.resolve_file(Path::new("conf.json")).unwrap();

    assert_eq!(at(&resolved, "c"), &Value::Float(9.0));
}

#[test]
fn given_missing_file_when_load_then_document_not_found() {
    let (_, service) = memory_service(&[]);

    let err = service.load(Path::new("nope.yaml")).unwrap_err();

    assert!(matches!(err, ApplicationError::DocumentNotFound(p) if p == PathBuf::from("nope.yaml")));
}

#[test]
fn given_malformed_yaml_when_load_then_document_error_names_file() {
    let (_, service) = memory_service(&[("bad.yaml", "a: [1, 2\n")]);

    let err = service.load(Path::new("bad.yaml")).unwrap_err();

    match err {
        ApplicationError::Document { path, .. } => assert_eq!(path, PathBuf::from("bad.yaml")),
        other => panic!("expected document error, got {other:?}"),
    }
}

#[test]
fn given_unresolvable_reference_when_resolve_file_then_domain_error_with_location() {
    let (_, service) = memory_service(&[("conf.yaml", "a:\n  b: ${a.c} + 1\n")]);

    let err = service.resolve_file(Path::new("conf.yaml")).unwrap_err();

    match err {
        ApplicationError::Domain(e) => {
            assert_eq!(e.to_string(), "a.b: invalid key: a.c");
            assert!(matches!(e.root_cause(), DomainError::MissingKey { .. }));
        }
        other => panic!("expected domain error, got {other:?}"),
    }
}

// ============================================================
// evaluate
// ============================================================

#[test]
fn given_context_document_when_evaluate_then_uses_its_values() {
    let (_, service) = memory_service(&[("server.ymx", SERVER_YAML)]);

    let value = service
        .evaluate("${limits.connections} // 1000", Some(Path::new("server.ymx")))
        .unwrap();

    assert_eq!(value, 1.0);
}

#[test]
fn given_no_context_when_evaluate_then_literals_work_and_variables_missing() {
    let (_, service) = memory_service(&[]);

    assert_eq!(service.evaluate("2 + 3 * 4", None).unwrap(), 14.0);
    let err = service.evaluate("${a} + 1", None).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MissingKey { .. })
    ));
}

// ============================================================
// render / write
// ============================================================

#[test]
fn given_resolved_document_when_render_json_then_key_order_kept() {
    let (_, service) = memory_service(&[("c.yaml", "zeta: 1\nalpha: ${zeta} + 1\n")]);
    let resolved = service.resolve_file(Path::new("c.yaml")).unwrap();

    let text = service.render(&resolved, DocumentFormat::Json).unwrap();

    assert_eq!(text, "{\n  \"zeta\": 1,\n  \"alpha\": 2.0\n}\n");
}

#[test]
fn given_resolved_document_when_render_yaml_then_reloads_equal() {
    let (_, service) = memory_service(&[("server.ymx", SERVER_YAML)]);
    let resolved = service.resolve_file(Path::new("server.ymx")).unwrap();

    let text = service.render(&resolved, DocumentFormat::Yaml).unwrap();
    let reloaded = DocumentFormat::Yaml.deserialize(&text).unwrap();

    assert_eq!(reloaded, resolved);
}

#[test]
fn given_overflowing_result_when_render_json_then_render_error() {
    // Arrange
    let (fs, service) = memory_service(&[("big.yaml", "limits:\n  huge: 1e308 * 10\n")]);
    let resolved = service.resolve_file(Path::new("big.yaml")).unwrap();

    // Act
    let json = service.render(&resolved, DocumentFormat::Json);
    let written = service.write(Path::new("big.json"), &resolved, DocumentFormat::Json);

    // Assert
    match json {
        Err(ApplicationError::Render { message }) => assert!(message.starts_with("limits.huge:")),
        other => panic!("expected render error, got {other:?}"),
    }
    assert!(written.is_err());
    assert_eq!(fs.content(Path::new("big.json")), None);
    assert!(service.render(&resolved, DocumentFormat::Yaml).is_ok());
}

#[test]
fn given_in_memory_fs_when_write_then_content_stored() {
    let (fs, service) = memory_service(&[("in.yaml", "a: 1 + 1\n")]);
    let resolved = service.resolve_file(Path::new("in.yaml")).unwrap();

    service
        .write(Path::new("out.json"), &resolved, DocumentFormat::Json)
        .unwrap();

    assert_eq!(
        fs.content(Path::new("out.json")).as_deref(),
        Some("{\n  \"a\": 2.0\n}\n")
    );
}

#[test]
fn given_real_fs_when_resolve_and_write_then_file_created_in_new_dir() {
    // Arrange
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("server.yaml");
    let output = temp.path().join("build/server.json");
    fs::write(&input, SERVER_YAML).unwrap();
    let service = DocumentService::new(Arc::new(RealFileSystem), ResolveOptions::default());

    // Act
    let resolved = service.resolve_file(&input).unwrap();
    service.write(&output, &resolved, DocumentFormat::Json).unwrap();

    // Assert
    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, resolved);
    assert!(RealFileSystem.exists(&output));
}

// ============================================================
// ServiceContainer wiring
// ============================================================

#[test]
fn given_strict_settings_when_container_built_then_service_uses_them() {
    // Arrange
    let fs: Arc<dyn FileSystem> = Arc::new(
        InMemoryFileSystem::new().with_file("c.yaml", "name: my-service\nsum: 1 + 2\n"),
    );
    let settings = Settings {
        detection: Detection::Strict,
        ..Default::default()
    };

    // Act
    let container = ServiceContainer::with_deps(settings, fs);
    let resolved = container.documents.resolve_file(Path::new("c.yaml")).unwrap();

    // Assert
    assert_eq!(container.documents.resolver().options().detection, Detection::Strict);
    assert_eq!(at(&resolved, "name"), &Value::from("my-service"));
    assert_eq!(at(&resolved, "sum"), &Value::Float(3.0));
}
