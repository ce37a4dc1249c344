//! Per-test context.
//!
//! A [`TestContext`] owns the capture store that the test shares with its
//! mocks, a cleanup chain and a lazily created temp directory. Cleanups run
//! in registration order, exactly once, either on [`TestContext::done`] or
//! when the context is dropped. The temp directory outlives the cleanups and
//! is removed last.

use crate::capture::CaptureStore;
use crate::config::CaptureConfig;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors manufactured by a test for code paths that need one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    /// Synthetic failure for the named operation.
    #[error("this is a test-generated error for '{0}'")]
    Generated(String),
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// Owner of one test's captures, cleanups and scratch files.
pub struct TestContext {
    name: String,
    captures: Arc<CaptureStore>,
    cleanups: Vec<Cleanup>,
    temp_dir: Option<tempfile::TempDir>,
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("name", &self.name)
            .field("captures", &self.captures.len())
            .field("cleanups", &self.cleanups.len())
            .field("temp_dir", &self.temp_dir.as_ref().map(tempfile::TempDir::path))
            .finish()
    }
}

impl TestContext {
    /// Creates a context with the default capture conventions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, Arc::new(CaptureStore::new()))
    }

    /// Creates a context whose store uses `config`.
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: CaptureConfig) -> Self {
        Self::with_store(name, Arc::new(CaptureStore::with_config(config)))
    }

    /// Creates a context around an existing store.
    #[must_use]
    pub fn with_store(name: impl Into<String>, captures: Arc<CaptureStore>) -> Self {
        let name = name.into();
        tracing::debug!(test = %name, "test context created");
        Self {
            name,
            captures,
            cleanups: Vec::new(),
            temp_dir: None,
        }
    }

    /// Returns the test name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store; mocks keep a clone of the `Arc`.
    #[must_use]
    pub fn captures(&self) -> &Arc<CaptureStore> {
        &self.captures
    }

    /// Registers a cleanup to run after the test.
    pub fn do_after(&mut self, cleanup: impl FnOnce() + Send + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// Runs the registered cleanups in registration order.
    ///
    /// Later calls only run cleanups registered since the previous one.
    pub fn done(&mut self) {
        let cleanups = std::mem::take(&mut self.cleanups);
        if cleanups.is_empty() {
            return;
        }
        tracing::debug!(test = %self.name, count = cleanups.len(), "running test cleanups");
        for cleanup in cleanups {
            cleanup();
        }
    }

    /// Returns the test's temp directory, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    pub fn temp_dir(&mut self) -> &Path {
        let dir = if let Some(dir) = self.temp_dir.take() {
            dir
        } else {
            let prefix = format!("{}-", sanitize(&self.name));
            let dir = match tempfile::Builder::new().prefix(&prefix).tempdir() {
                Ok(dir) => dir,
                Err(err) => io_failure("create temp dir", &prefix, &err),
            };
            tracing::debug!(test = %self.name, path = %dir.path().display(), "temp dir created");
            dir
        };
        self.temp_dir.insert(dir).path()
    }

    /// Returns `name` joined onto the temp directory. Nothing is created.
    pub fn temp_path(&mut self, name: impl AsRef<Path>) -> PathBuf {
        self.temp_dir().join(name)
    }

    /// Copies `src` to `dest` inside the temp directory, creating parent
    /// directories as needed. Returns the destination path.
    ///
    /// # Panics
    ///
    /// Panics on any I/O failure.
    pub fn copy_to_temp_file(&mut self, src: impl AsRef<Path>, dest: impl AsRef<Path>) -> PathBuf {
        let src = src.as_ref();
        let target = self.temp_path(dest);
        if let Some(parent) = target.parent()
            && let Err(err) = fs::create_dir_all(parent)
        {
            io_failure("create directory", &parent.display().to_string(), &err);
        }
        if let Err(err) = fs::copy(src, &target) {
            io_failure("copy", &src.display().to_string(), &err);
        }
        target
    }

    /// Copies `src` into the temp directory under its own file name.
    ///
    /// # Panics
    ///
    /// Panics if `src` has no file name or the copy fails.
    pub fn copy_to_temp(&mut self, src: impl AsRef<Path>) -> PathBuf {
        let src = src.as_ref();
        let Some(file_name) = src.file_name() else {
            panic!("cannot copy {} to temp: no file name", src.display());
        };
        let file_name = file_name.to_owned();
        self.copy_to_temp_file(src, file_name)
    }

    /// Returns a synthetic error naming `what`.
    #[must_use]
    pub fn err_for(&self, what: impl Into<String>) -> TestError {
        TestError::Generated(what.into())
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.done();
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn io_failure(action: &str, target: &str, err: &io::Error) -> ! {
    tracing::error!(action, target, error = %err, "test context I/O failure");
    panic!("failed to {action} {target}: {err}");
}
