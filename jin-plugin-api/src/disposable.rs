//! Disposable - single-operation resource release contract

use crate::error::PluginError;

/// A resource a plugin releases when it is deactivated.
///
/// Push disposables into [`PluginContext::subscribe`](crate::PluginContext::subscribe);
/// the host disposes them in registration order after the plugin's
/// `deactivate` hook. The host calls `dispose` once per registration but does
/// not guard against a disposable registered twice.
pub trait Disposable: Send {
    fn dispose(&mut self) -> Result<(), PluginError>;
}

struct FnDisposable<F>(Option<F>);

impl<F> Disposable for FnDisposable<F>
where
    F: FnOnce() -> Result<(), PluginError> + Send,
{
    fn dispose(&mut self) -> Result<(), PluginError> {
        match self.0.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

/// Build a disposable from a closure. The closure runs at most once.
///
/// # Example
///
/// ```ignore
/// ctx.subscribe(disposable(move || {
///     watcher.stop();
///     Ok(())
/// }));
/// ```
pub fn disposable<F>(release: F) -> Box<dyn Disposable>
where
    F: FnOnce() -> Result<(), PluginError> + Send + 'static,
{
    Box::new(FnDisposable(Some(release)))
}
