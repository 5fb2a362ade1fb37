//! Shared test utilities for jin-core integration tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jin_core::{ExecutionBackend, LoadError, ModuleHandle, PluginHost, PluginHostConfig};
use jin_plugin_api::{
    Capability, ModuleScope, Plugin, PluginContext, PluginError, disposable,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ordered record of what plugins and modules did
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

/// Backend that treats the module source as a line-based script:
///
/// - `activate` / `deactivate`: export hooks that log, `activate` also
///   subscribes a disposable that logs on dispose
/// - `alias-activate`: export `activate` on the original exports object
/// - `reassign`: replace the module's exports with a fresh object
/// - `value <name> <json>`: export a value
/// - `require <name>`: resolve a host module and log whether it was found
/// - `throw <message>`: report a module error
/// - `panic`: panic while executing
pub struct ScriptedBackend {
    log: EventLog,
}

impl ScriptedBackend {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn execute(
        &self,
        url: &str,
        source: Vec<u8>,
        scope: &mut ModuleScope,
    ) -> Result<ModuleHandle, LoadError> {
        let script = String::from_utf8_lossy(&source).into_owned();

        for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (directive, rest) = line.split_once(' ').unwrap_or((line, ""));
            match directive {
                "activate" => {
                    let log = self.log.clone();
                    scope.module_exports().set_activate(move |ctx| {
                        let log = log.clone();
                        async move { scripted_activate(&log, &ctx) }
                    });
                }
                "alias-activate" => {
                    let log = self.log.clone();
                    scope.exports().set_activate(move |ctx| {
                        let log = log.clone();
                        async move { scripted_activate(&log, &ctx) }
                    });
                }
                "deactivate" => {
                    let log = self.log.clone();
                    scope.module_exports().set_deactivate(move || {
                        let log = log.clone();
                        async move {
                            log.push("deactivate");
                            Ok(())
                        }
                    });
                }
                "reassign" => scope.set_module_exports(Default::default()),
                "value" => {
                    let (name, json) = rest.split_once(' ').unwrap_or((rest, "null"));
                    let value: serde_json::Value = serde_json::from_str(json).unwrap();
                    scope.module_exports().insert(name, Capability::value(value));
                }
                "require" => {
                    let found = !scope.require(rest).is_empty();
                    self.log.push(format!("require:{rest}:{found}"));
                }
                "throw" => {
                    scope.fail(PluginError::custom(rest));
                    break;
                }
                "panic" => panic!("script panicked"),
                other => {
                    return Err(LoadError::Execution {
                        url: url.to_string(),
                        message: format!("unknown directive '{other}'"),
                    });
                }
            }
        }

        Ok(Box::new(()))
    }
}

fn scripted_activate(log: &EventLog, ctx: &PluginContext) -> Result<(), PluginError> {
    log.push(format!("activate:{}", ctx.plugin_id()));
    let on_dispose = log.clone();
    let id = ctx.plugin_id().to_string();
    ctx.subscribe(disposable(move || {
        on_dispose.push(format!("dispose:{id}"));
        Ok(())
    }));
    Ok(())
}

/// Host backed by the scripted backend
#[allow(dead_code)]
pub fn scripted_host(config: PluginHostConfig) -> (PluginHost, EventLog) {
    let log = EventLog::default();
    let host = PluginHost::with_backend(config, Arc::new(ScriptedBackend::new(log.clone())));
    (host, log)
}

/// Serve a module script at `route`, returning its url
#[allow(dead_code)]
pub async fn serve_module(server: &MockServer, route: &str, script: &str) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(script))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

/// In-process plugin that logs its hooks and registers `resources`
/// disposables on activation
#[allow(dead_code)]
pub struct RecordingPlugin {
    pub log: EventLog,
    pub resources: usize,
    pub activate_delay: Option<Duration>,
    pub fail_deactivate: bool,
}

#[allow(dead_code)]
impl RecordingPlugin {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            resources: 1,
            activate_delay: None,
            fail_deactivate: false,
        }
    }

    pub fn with_resources(mut self, resources: usize) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_activate_delay(mut self, delay: Duration) -> Self {
        self.activate_delay = Some(delay);
        self
    }

    pub fn failing_deactivate(mut self) -> Self {
        self.fail_deactivate = true;
        self
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        if let Some(delay) = self.activate_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.push(format!(
            "activate:{}:{}",
            ctx.plugin_id(),
            ctx.subscription_count()
        ));
        for index in 0..self.resources {
            let log = self.log.clone();
            let id = ctx.plugin_id().to_string();
            ctx.subscribe(disposable(move || {
                log.push(format!("dispose:{id}:{index}"));
                Ok(())
            }));
        }
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), PluginError> {
        self.log.push("deactivate");
        if self.fail_deactivate {
            return Err(PluginError::custom("deactivate refused"));
        }
        Ok(())
    }
}
