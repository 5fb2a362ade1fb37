//! Native library backend - runs modules built with `export_module!`

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jin_plugin_api::{API_VERSION, ModuleScope};
use libloading::Library;
use tempfile::TempPath;

use super::backend::{ExecutionBackend, ModuleHandle};
use crate::error::LoadError;

const API_VERSION_SYMBOL: &[u8] = b"_jin_module_api_version";
const INIT_SYMBOL: &[u8] = b"_jin_module_init";

/// Stages fetched bytes as a shared library in the module cache directory,
/// opens it and calls its init entry point.
#[derive(Debug, Clone)]
pub struct NativeLibraryBackend {
    cache_dir: PathBuf,
}

/// A loaded module. Field order matters: the library is closed before the
/// staged file is removed.
struct NativeModule {
    _library: Library,
    _file: TempPath,
}

impl NativeLibraryBackend {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Write module bytes to a uniquely named library file
    fn stage(&self, url: &str, source: &[u8]) -> Result<TempPath, LoadError> {
        let staging_error = |e: std::io::Error| {
            LoadError::execution(
                url,
                format!("cannot stage module in {}: {e}", self.cache_dir.display()),
            )
        };

        std::fs::create_dir_all(&self.cache_dir).map_err(staging_error)?;
        let mut file = tempfile::Builder::new()
            .prefix("module-")
            .suffix(std::env::consts::DLL_SUFFIX)
            .tempfile_in(&self.cache_dir)
            .map_err(staging_error)?;
        file.write_all(source).map_err(staging_error)?;
        file.flush().map_err(staging_error)?;
        Ok(file.into_temp_path())
    }
}

#[async_trait]
impl ExecutionBackend for NativeLibraryBackend {
    async fn execute(
        &self,
        url: &str,
        source: Vec<u8>,
        scope: &mut ModuleScope,
    ) -> Result<ModuleHandle, LoadError> {
        let staged = self.stage(url, &source)?;
        tracing::debug!(url = %url, path = %staged.display(), "Opening native module");

        // SAFETY: the host only loads modules its configuration points at.
        // The module is expected to be built with `export_module!`.
        let library = unsafe { Library::new(&*staged) }.map_err(|source| LoadError::Library {
            url: url.to_string(),
            source,
        })?;

        {
            // SAFETY: calling a C function exported by the module
            let api_version_fn: libloading::Symbol<extern "C" fn() -> u32> =
                unsafe { library.get(API_VERSION_SYMBOL) }.map_err(|source| {
                    LoadError::Library {
                        url: url.to_string(),
                        source,
                    }
                })?;

            let found = api_version_fn();
            if found != API_VERSION {
                return Err(LoadError::ApiVersionMismatch {
                    url: url.to_string(),
                    expected: API_VERSION,
                    found,
                });
            }

            // SAFETY: `_jin_module_init` takes an exclusive scope pointer valid
            // for the duration of the call, which `scope` is.
            let init_fn: libloading::Symbol<extern "C" fn(*mut ModuleScope)> =
                unsafe { library.get(INIT_SYMBOL) }.map_err(|source| LoadError::Library {
                    url: url.to_string(),
                    source,
                })?;
            init_fn(scope as *mut ModuleScope);
        }

        Ok(Box::new(NativeModule {
            _library: library,
            _file: staged,
        }))
    }
}
