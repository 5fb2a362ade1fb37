//! Loader tests: fetching modules over http and validating their exports
//!
//! Modules are served by a wiremock server and executed by the scripted
//! backend from `common`.

mod common;

use common::{EventLog, RecordingPlugin, scripted_host, serve_module};
use jin_core::{HostError, LoadError, PluginFactory, PluginHostConfig, PluginState};
use jin_plugin_api::{Capability, Plugin, PluginManifest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_error(err: HostError) -> LoadError {
    match err {
        HostError::Load(load) => load,
        other => panic!("expected a load error, got {other:?}"),
    }
}

#[tokio::test]
async fn loaded_module_activates_and_disposes() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/hello.so", "activate\ndeactivate\n").await;
    let (host, log) = scripted_host(PluginHostConfig::default());

    let manifest = PluginManifest::new("hello", "Hello", "0.1.0").with_url(&url);
    host.register_plugin(manifest, None).await.unwrap();
    host.activate_plugin("hello").await.unwrap();
    host.deactivate_plugin("hello").await.unwrap();

    assert_eq!(
        log.events(),
        vec!["activate:hello", "deactivate", "dispose:hello"]
    );
}

#[tokio::test]
async fn not_found_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.so"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let url = format!("{}/missing.so", server.uri());
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(host.load_plugin(&url).await.err().unwrap());

    assert!(matches!(err, LoadError::Status { status: 404, .. }));
    assert!(err.to_string().contains("404"));
    assert_eq!(err.url(), url);
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = host
        .load_plugin(&format!("{}/broken.so", server.uri()))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unreachable_server_is_fetch_error() {
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(
        host.load_plugin("http://127.0.0.1:1/unreachable.so")
            .await
            .err()
            .unwrap(),
    );
    assert!(matches!(err, LoadError::Fetch { .. }));
}

#[tokio::test]
async fn module_without_activate_is_rejected() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/empty.so", "value name \"empty\"\n").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(host.load_plugin(&url).await.err().unwrap());

    assert!(matches!(err, LoadError::MissingActivate { .. }));
    assert!(err.to_string().contains("does not export an activate function"));
}

#[tokio::test]
async fn reassigned_exports_are_used() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/reassign.so", "reassign\nactivate\nvalue kind \"module\"\n").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let plugin = host.load_plugin(&url).await.unwrap();

    assert_eq!(plugin.url(), url);
    assert_eq!(
        plugin.exported_values().get("kind").unwrap().as_value(),
        Some(&serde_json::json!("module"))
    );
}

#[tokio::test]
async fn original_exports_are_ignored_after_reassignment() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/alias.so", "reassign\nalias-activate\n").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(host.load_plugin(&url).await.err().unwrap());
    assert!(matches!(err, LoadError::MissingActivate { .. }));
}

#[tokio::test]
async fn original_exports_are_used_without_reassignment() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/alias.so", "alias-activate\n").await;
    let (host, log) = scripted_host(PluginHostConfig::default());

    let plugin = host.load_plugin(&url).await.unwrap();
    let ctx = jin_plugin_api::PluginContext::new("direct", Default::default());
    plugin.activate(&ctx).await.unwrap();

    assert_eq!(log.events(), vec!["activate:direct"]);
}

#[tokio::test]
async fn require_resolves_registered_modules_only() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/require.so", "require ui-kit\nrequire lodash\nactivate\n").await;
    let (host, log) = scripted_host(PluginHostConfig::default());
    host.register_module("ui-kit", Capability::service(String::from("ui")));

    host.load_plugin(&url).await.unwrap();

    assert_eq!(
        log.events(),
        vec!["require:ui-kit:true", "require:lodash:false"]
    );
}

#[tokio::test]
async fn module_error_becomes_execution_error() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/throws.so", "activate\nthrow window is not defined\n").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(host.load_plugin(&url).await.err().unwrap());

    assert!(matches!(err, LoadError::Execution { .. }));
    assert!(err.to_string().contains("window is not defined"));
    assert!(err.to_string().contains(&url));
}

#[tokio::test]
async fn module_panic_becomes_execution_error() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/panics.so", "panic\n").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let err = load_error(host.load_plugin(&url).await.err().unwrap());
    assert!(matches!(err, LoadError::Execution { .. }));
    assert!(err.to_string().contains("script panicked"));
}

#[tokio::test]
async fn failed_load_does_not_register() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/empty.so", "").await;
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let manifest = PluginManifest::new("empty", "Empty", "0.1.0").with_url(&url);
    let err = host.register_plugin(manifest, None).await.unwrap_err();

    assert!(matches!(err, HostError::Load(LoadError::MissingActivate { .. })));
    assert!(!host.contains("empty"));
}

#[tokio::test]
async fn url_wins_over_factory() {
    let server = MockServer::start().await;
    let url = serve_module(&server, "/both.so", "activate\n").await;
    let (host, log) = scripted_host(PluginHostConfig::default());
    let factory_log = EventLog::default();

    let manifest = PluginManifest::new("both", "Both", "0.1.0").with_url(&url);
    host.register_plugin(
        manifest,
        Some(PluginFactory::from_plugin(RecordingPlugin::new(factory_log.clone()))),
    )
    .await
    .unwrap();
    host.activate_plugin("both").await.unwrap();

    assert_eq!(log.events(), vec!["activate:both"]);
    assert!(factory_log.events().is_empty());
}

#[tokio::test]
async fn register_pending_keeps_going_after_failures() {
    let server = MockServer::start().await;
    let good = serve_module(&server, "/good.so", "activate\n").await;
    let bad = format!("{}/absent.so", server.uri());
    let (host, _log) = scripted_host(PluginHostConfig::default());

    let failures = host
        .register_pending(vec![
            PluginManifest::new("bad", "Bad", "0.1.0").with_url(&bad),
            PluginManifest::new("no-url", "No url", "0.1.0"),
            PluginManifest::new("good", "Good", "0.1.0").with_url(&good),
        ])
        .await;

    let failed: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["bad", "no-url"]);
    assert!(matches!(failures[1].1, HostError::Registration { .. }));
    assert_eq!(host.plugin_state("good"), Some(PluginState::Registered));
}
