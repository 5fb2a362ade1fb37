//! Context composer - the base context and the per-plugin contexts built from it

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use jin_plugin_api::{CapabilityBag, PluginContext};

/// Owns the base context and one [`PluginContext`] per plugin id.
///
/// The base and the context table sit behind one lock so an update to the
/// base and the creation of a new context never interleave: a context
/// created concurrently with an update sees either the old base (and then
/// receives the update in place) or the new one.
#[derive(Debug, Default)]
pub struct ContextComposer {
    state: RwLock<ComposerState>,
}

#[derive(Debug, Default)]
struct ComposerState {
    base: CapabilityBag,
    contexts: HashMap<String, PluginContext>,
}

impl ContextComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `partial` into the base context, then copy the whole base onto
    /// every existing plugin context in place.
    pub fn set_base_context(&self, partial: CapabilityBag) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.base.merge(&partial);

        let ComposerState { base, contexts } = &*state;
        for ctx in contexts.values() {
            ctx.apply_base(base);
        }
        tracing::debug!(
            capabilities = base.len(),
            contexts = contexts.len(),
            "Base context updated"
        );
    }

    /// Existing context for `id`, or a new one seeded with the current base
    pub fn get_or_create_context(&self, id: &str) -> PluginContext {
        if let Some(ctx) = self.context(id) {
            return ctx;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let ComposerState { base, contexts } = &mut *state;
        contexts
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(plugin = %id, "Creating plugin context");
                PluginContext::new(id, base.clone())
            })
            .clone()
    }

    /// Existing context for `id`, without creating one
    pub fn context(&self, id: &str) -> Option<PluginContext> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contexts
            .get(id)
            .cloned()
    }

    /// Snapshot of the base context
    pub fn base_context(&self) -> CapabilityBag {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .base
            .clone()
    }

    /// Names from `required` that the base context does not provide
    pub fn missing_from_base(&self, required: &[String]) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        required
            .iter()
            .filter(|name| !state.base.contains(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jin_plugin_api::Capability;

    #[test]
    fn test_get_or_create_reuses_context() {
        let composer = ContextComposer::new();
        let first = composer.get_or_create_context("a");
        let second = composer.get_or_create_context("a");
        assert!(PluginContext::ptr_eq(&first, &second));
    }

    #[test]
    fn test_contexts_are_per_plugin() {
        let composer = ContextComposer::new();
        let a = composer.get_or_create_context("a");
        let b = composer.get_or_create_context("b");
        assert!(!PluginContext::ptr_eq(&a, &b));
        assert_eq!(a.plugin_id(), "a");
        assert_eq!(b.plugin_id(), "b");
    }

    #[test]
    fn test_new_context_copies_base() {
        let composer = ContextComposer::new();
        composer.set_base_context(CapabilityBag::new().with("theme", Capability::value("dark")));

        let ctx = composer.get_or_create_context("a");
        assert_eq!(ctx.value("theme"), Some(serde_json::json!("dark")));
        assert_eq!(ctx.version(), 0);
    }

    #[test]
    fn test_base_update_reaches_existing_contexts() {
        let composer = ContextComposer::new();
        let ctx = composer.get_or_create_context("a");

        let service = Capability::service(String::from("router"));
        composer.set_base_context(CapabilityBag::new().with("routerRegister", service.clone()));

        let seen = ctx.capability("routerRegister").unwrap();
        assert!(Capability::ptr_eq(&seen, &service));
        assert_eq!(ctx.version(), 1);
    }

    #[test]
    fn test_base_merge_is_shallow_last_write_wins() {
        let composer = ContextComposer::new();
        composer.set_base_context(
            CapabilityBag::new()
                .with("a", Capability::value(1))
                .with("b", Capability::value(2)),
        );
        composer.set_base_context(CapabilityBag::new().with("b", Capability::value(3)));

        let base = composer.base_context();
        assert_eq!(base.get("a").unwrap().as_value(), Some(&serde_json::json!(1)));
        assert_eq!(base.get("b").unwrap().as_value(), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_context_lookup_does_not_create() {
        let composer = ContextComposer::new();
        assert!(composer.context("ghost").is_none());
        composer.get_or_create_context("ghost");
        assert!(composer.context("ghost").is_some());
    }

    #[test]
    fn test_missing_from_base() {
        let composer = ContextComposer::new();
        composer.set_base_context(CapabilityBag::new().with("routerRegister", Capability::Empty));

        let missing = composer.missing_from_base(&["routerRegister".into(), "theme".into()]);
        assert_eq!(missing, vec!["theme".to_string()]);
    }
}
