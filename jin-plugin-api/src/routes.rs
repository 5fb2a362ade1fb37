//! Route registration capability
//!
//! The host publishes a [`RouteRegistrar`] in the base context under
//! [`ROUTE_REGISTRAR`]. Plugins register routes with it and push the returned
//! disposable into their context so the route goes away on deactivation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::context::PluginContext;
use crate::disposable::Disposable;
use crate::error::PluginError;

/// Capability name the route registrar is published under
pub const ROUTE_REGISTRAR: &str = "routerRegister";

/// A route a plugin wants to expose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Path pattern, e.g., "/hello" or "/items/:id"
    pub path: String,
    /// Display name, e.g. for a navigation entry
    pub name: String,
}

impl RouteSpec {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Host-side route table exposed to plugins
pub trait RouteRegistrar: Send + Sync {
    /// Register a route. Disposing the result removes it again.
    fn register(&self, route: RouteSpec) -> Result<Box<dyn Disposable>, PluginError>;
}

/// Wrap a registrar so it can be put in a capability bag
pub fn registrar_capability(registrar: Arc<dyn RouteRegistrar>) -> Capability {
    Capability::service(registrar)
}

/// Fetch the route registrar from a plugin's context
pub fn route_registrar(ctx: &PluginContext) -> Result<Arc<dyn RouteRegistrar>, PluginError> {
    let registrar = ctx.service::<Arc<dyn RouteRegistrar>>(ROUTE_REGISTRAR)?;
    Ok(Arc::clone(&registrar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityBag;
    use crate::disposable::disposable;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRoutes {
        paths: Arc<Mutex<Vec<String>>>,
    }

    impl RouteRegistrar for MemoryRoutes {
        fn register(&self, route: RouteSpec) -> Result<Box<dyn Disposable>, PluginError> {
            let mut paths = self.paths.lock().unwrap();
            if paths.contains(&route.path) {
                return Err(PluginError::DuplicateRoute(route.path));
            }
            paths.push(route.path.clone());

            let paths = Arc::clone(&self.paths);
            Ok(disposable(move || {
                paths.lock().unwrap().retain(|p| p != &route.path);
                Ok(())
            }))
        }
    }

    #[test]
    fn test_route_spec_creation() {
        let spec = RouteSpec::new("/hello", "Hello");
        assert_eq!(spec.path, "/hello");
        assert_eq!(spec.name, "Hello");
    }

    #[test]
    fn test_registrar_round_trip_through_context() {
        let routes = Arc::new(MemoryRoutes::default());
        let paths = Arc::clone(&routes.paths);
        let ctx = PluginContext::new(
            "hello",
            CapabilityBag::new().with(ROUTE_REGISTRAR, registrar_capability(routes)),
        );

        let registrar = route_registrar(&ctx).unwrap();
        let mut registration = registrar.register(RouteSpec::new("/hello", "Hello")).unwrap();
        assert_eq!(*paths.lock().unwrap(), vec!["/hello".to_string()]);

        registration.dispose().unwrap();
        assert!(paths.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let routes = MemoryRoutes::default();
        let _first = routes.register(RouteSpec::new("/a", "A")).unwrap();
        let err = routes.register(RouteSpec::new("/a", "A again")).err().unwrap();
        assert!(matches!(err, PluginError::DuplicateRoute(path) if path == "/a"));
    }

    #[test]
    fn test_missing_registrar() {
        let ctx = PluginContext::new("hello", CapabilityBag::new());
        assert!(matches!(
            route_registrar(&ctx),
            Err(PluginError::MissingCapability(name)) if name == ROUTE_REGISTRAR
        ));
    }
}
