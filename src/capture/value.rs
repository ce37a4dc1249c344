//! Type-erased captured values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One captured argument.
///
/// Keeps the value behind `Arc<dyn Any>` for typed retrieval, plus the
/// runtime type name and a `Debug` rendering taken at capture time for
/// diagnostics.
#[derive(Clone)]
pub struct CapturedValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    rendered: String,
}

impl CapturedValue {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Any + Send + Sync + fmt::Debug>(value: T) -> Self {
        let rendered = format!("{value:?}");
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            rendered,
        }
    }

    /// Returns the runtime type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the `Debug` rendering taken at capture time.
    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrows the value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns a shared handle to the value as a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for CapturedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.type_name, self.rendered)
    }
}

impl fmt::Display for CapturedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
