//! Route table published to plugins as the `routerRegister` capability

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use jin_plugin_api::{Disposable, PluginError, RouteRegistrar, RouteSpec, disposable};

/// Routes registered by plugins, in registration order
#[derive(Default)]
pub struct RouteTable {
    routes: Arc<Mutex<Vec<RegisteredRoute>>>,
    next_id: AtomicU64,
}

/// A route registered by a plugin
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    id: u64,
    /// Route as registered by the plugin
    pub spec: RouteSpec,
    /// Compiled path matcher
    matcher: PathMatcher,
}

/// Simple path matcher supporting :param patterns
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathMatcher {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param,
}

impl PathMatcher {
    fn new(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with(':') {
                    PathSegment::Param
                } else {
                    PathSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self { segments }
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of registered routes
    pub fn routes(&self) -> Vec<RouteSpec> {
        self.lock().iter().map(|route| route.spec.clone()).collect()
    }

    /// Registered route matching the same paths as `path`, if any.
    /// Parameter names are ignored: `/items/:id` and `/items/:slug` conflict.
    pub fn check_conflict(&self, path: &str) -> Option<RouteSpec> {
        let matcher = PathMatcher::new(path);
        self.lock()
            .iter()
            .find(|route| route.matcher == matcher)
            .map(|route| route.spec.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RegisteredRoute>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RouteRegistrar for RouteTable {
    fn register(&self, route: RouteSpec) -> Result<Box<dyn Disposable>, PluginError> {
        if let Some(existing) = self.check_conflict(&route.path) {
            return Err(PluginError::DuplicateRoute(format!(
                "{} (already registered as '{}')",
                route.path, existing.name
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(path = %route.path, name = %route.name, "Route registered");
        self.lock().push(RegisteredRoute {
            id,
            matcher: PathMatcher::new(&route.path),
            spec: route,
        });

        let routes = Arc::clone(&self.routes);
        Ok(disposable(move || {
            let mut routes = routes.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(index) = routes.iter().position(|r| r.id == id) {
                let removed = routes.remove(index);
                tracing::info!(path = %removed.spec.path, "Route removed");
            }
            Ok(())
        }))
    }
}
