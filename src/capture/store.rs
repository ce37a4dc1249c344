//! Stack-correlated capture storage.
//!
//! Every capture walks the stack once. When a mock frame is found the values
//! land in that call's bucket and in the global sequence; otherwise they land
//! in the global sequence only. Retrievals come in two forms: `try_*`
//! returns a [`CaptureError`], the plain form fails the test with it.
//!
//! The walk's entry point is [`CaptureStore::classify`], and every method
//! between the caller and that entry point lives on `CaptureStore`. The first
//! frame outside this type is therefore the code that called the store.

use super::error::CaptureError;
use super::value::CapturedValue;
use crate::config::CaptureConfig;
use crate::matcher::Matcher;
use crate::stack::{BacktraceSource, FrameClassification, FrameInfo, StackSource, StackWalker};
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct CaptureRecord {
    key: Option<String>,
    value: CapturedValue,
}

#[derive(Debug, Default)]
struct CaptureLog {
    all: Vec<CaptureRecord>,
    by_call: BTreeMap<String, Vec<CapturedValue>>,
}

/// Captured values keyed by the mocked call that produced them.
///
/// Shared between a test and its mocks through an `Arc`.
#[derive(Debug)]
pub struct CaptureStore {
    log: Mutex<CaptureLog>,
    walker: StackWalker,
    source: Arc<dyn StackSource>,
}

impl Default for CaptureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureStore {
    /// Creates an empty store with the default conventions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CaptureConfig::default())
    }

    /// Creates an empty store with the given conventions.
    #[must_use]
    pub fn with_config(config: CaptureConfig) -> Self {
        Self::with_source(config, Arc::new(BacktraceSource))
    }

    /// Creates an empty store that walks stacks from `source`.
    #[must_use]
    pub fn with_source(config: CaptureConfig, source: Arc<dyn StackSource>) -> Self {
        Self {
            log: Mutex::new(CaptureLog::default()),
            walker: StackWalker::new(config),
            source,
        }
    }

    /// Returns the store's conventions.
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        self.walker.config()
    }

    #[inline(never)]
    fn classify(&self) -> FrameClassification {
        let resolver = self.source.snapshot();
        self.walker.walk(resolver.as_ref())
    }

    #[inline(never)]
    fn caller_description(&self) -> String {
        self.classify().caller_description()
    }

    // ── Capture ─────────────────────────────────────────────────────────

    /// Records one value against the mocked call on the current stack.
    pub fn capture<T: Any + Send + Sync + fmt::Debug>(&self, value: T) {
        self.record(vec![CapturedValue::new(value)]);
    }

    /// Records several values, in order, against the mocked call on the
    /// current stack.
    pub fn capture_values<I>(&self, values: I)
    where
        I: IntoIterator<Item = CapturedValue>,
    {
        let values: Vec<CapturedValue> = values.into_iter().collect();
        self.record(values);
    }

    /// Records values under an explicit key without inspecting the stack.
    pub fn capture_for_call<I>(&self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = CapturedValue>,
    {
        let key = key.into();
        let values: Vec<CapturedValue> = values.into_iter().collect();
        tracing::debug!(key = %key, count = values.len(), "captured values under explicit key");
        self.insert(Some(key), values);
    }

    #[inline(never)]
    fn record(&self, values: Vec<CapturedValue>) {
        let stack = self.classify();
        let key = stack.mocked_call();
        match &key {
            Some(key) => tracing::debug!(
                key = %key,
                caller = %stack.caller_description(),
                frames = stack.frames().len(),
                count = values.len(),
                "captured mocked call arguments"
            ),
            None if self.config().warn_unkeyed => tracing::warn!(
                caller = %stack.caller_description(),
                count = values.len(),
                "no mock found for capture; values kept in the global sequence only"
            ),
            None => {}
        }
        self.insert(key, values);
    }

    fn insert(&self, key: Option<String>, values: Vec<CapturedValue>) {
        let mut log = self.log.lock();
        if let Some(key) = &key {
            log.by_call
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        log.all.extend(values.into_iter().map(|value| CaptureRecord {
            key: key.clone(),
            value,
        }));
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Returns every captured value in capture order.
    #[must_use]
    pub fn all_captured(&self) -> Vec<CapturedValue> {
        self.log.lock().all.iter().map(|r| r.value.clone()).collect()
    }

    /// Returns the number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().all.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().all.is_empty()
    }

    /// Returns the keys of all mocked calls with captures, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.log.lock().by_call.keys().cloned().collect()
    }

    /// Returns every captured value accepted by `matcher`, in capture order.
    #[must_use]
    pub fn captured_matching(&self, matcher: &dyn Matcher) -> Vec<CapturedValue> {
        self.log
            .lock()
            .all
            .iter()
            .filter(|r| matcher.matches(&r.value))
            .map(|r| r.value.clone())
            .collect()
    }

    /// Returns the correlation key for the current stack without capturing.
    ///
    /// Call this from inside a mock method to learn which call is running.
    #[inline(never)]
    #[must_use]
    pub fn mocked_call_name(&self) -> Option<String> {
        self.classify().mocked_call()
    }

    /// Returns the frame that called this method.
    #[inline(never)]
    #[must_use]
    pub fn caller_info(&self) -> Option<FrameInfo> {
        self.classify().caller().cloned()
    }

    /// Returns the full classification of the current stack.
    #[inline(never)]
    #[must_use]
    pub fn call_stack(&self) -> FrameClassification {
        self.classify()
    }

    // ── Retrieval ───────────────────────────────────────────────────────

    /// Returns the value at `index` in the global sequence.
    #[inline(never)]
    pub fn try_captured_at<T>(&self, index: usize) -> Result<T, CaptureError>
    where
        T: Any + Clone,
    {
        let log = self.log.lock();
        let len = log.all.len();
        let found = log.all.get(index).map(|r| (r.value.downcast_ref::<T>().cloned(), r.value.type_name()));
        drop(log);

        match found {
            Some((Some(value), _)) => Ok(value),
            Some((None, actual)) => Err(CaptureError::TypeMismatch {
                index,
                expected: type_name::<T>(),
                actual,
                caller: self.caller_description(),
            }),
            None if len == 0 => Err(CaptureError::Empty {
                caller: self.caller_description(),
            }),
            None => Err(CaptureError::IndexOutOfRange {
                index,
                len,
                caller: self.caller_description(),
            }),
        }
    }

    /// Returns the value at `index`, failing the test if it is missing or not a `T`.
    #[track_caller]
    pub fn captured_at<T>(&self, index: usize) -> T
    where
        T: Any + Clone,
    {
        match self.try_captured_at(index) {
            Ok(value) => value,
            Err(err) => fail(&err),
        }
    }

    /// Returns every value captured inside a mock that is a `T`, in capture order.
    #[inline(never)]
    pub fn try_captured_of_type<T>(&self) -> Result<Vec<T>, CaptureError>
    where
        T: Any + Clone,
    {
        let values: Vec<T> = self
            .log
            .lock()
            .all
            .iter()
            .filter(|r| r.key.is_some())
            .filter_map(|r| r.value.downcast_ref::<T>().cloned())
            .collect();
        if values.is_empty() {
            return Err(CaptureError::NoneOfType {
                expected: type_name::<T>(),
                caller: self.caller_description(),
            });
        }
        Ok(values)
    }

    /// Returns every mock-captured `T`, failing the test if there are none.
    #[track_caller]
    pub fn captured_of_type<T>(&self) -> Vec<T>
    where
        T: Any + Clone,
    {
        match self.try_captured_of_type() {
            Ok(values) => values,
            Err(err) => fail(&err),
        }
    }

    /// Returns the first value captured inside a mock that is a `T`.
    #[inline(never)]
    pub fn try_first_captured_of_type<T>(&self) -> Result<T, CaptureError>
    where
        T: Any + Clone,
    {
        let first = self
            .log
            .lock()
            .all
            .iter()
            .filter(|r| r.key.is_some())
            .find_map(|r| r.value.downcast_ref::<T>().cloned());
        match first {
            Some(value) => Ok(value),
            None => Err(CaptureError::NoneOfType {
                expected: type_name::<T>(),
                caller: self.caller_description(),
            }),
        }
    }

    /// Returns the first mock-captured `T`, failing the test if there is none.
    #[track_caller]
    pub fn first_captured_of_type<T>(&self) -> T
    where
        T: Any + Clone,
    {
        match self.try_first_captured_of_type() {
            Ok(value) => value,
            Err(err) => fail(&err),
        }
    }

    /// Returns the values captured under `key`, in capture order.
    #[inline(never)]
    pub fn try_captured_from(&self, key: &str) -> Result<Vec<CapturedValue>, CaptureError> {
        let log = self.log.lock();
        if log.by_call.is_empty() {
            drop(log);
            return Err(CaptureError::NoMockCaptures {
                caller: self.caller_description(),
            });
        }
        if let Some(values) = log.by_call.get(key) {
            return Ok(values.clone());
        }
        let known: Vec<String> = log.by_call.keys().cloned().collect();
        drop(log);
        Err(CaptureError::UnknownCall {
            key: key.to_string(),
            known,
            caller: self.caller_description(),
        })
    }

    /// Returns the values captured under `key`, failing the test if the key is unknown.
    #[track_caller]
    pub fn captured_from(&self, key: &str) -> Vec<CapturedValue> {
        match self.try_captured_from(key) {
            Ok(values) => values,
            Err(err) => fail(&err),
        }
    }

    /// Returns the values captured under `key` that are a `T`.
    ///
    /// Fails like [`try_captured_from`](Self::try_captured_from) when the key
    /// is unknown.
    #[inline(never)]
    pub fn try_captured_of_type_from_call<T>(&self, key: &str) -> Result<Vec<T>, CaptureError>
    where
        T: Any + Clone,
    {
        let bucket = self.try_captured_from(key)?;
        let values: Vec<T> = bucket
            .iter()
            .filter_map(|v| v.downcast_ref::<T>().cloned())
            .collect();
        if !values.is_empty() {
            return Ok(values);
        }
        let candidates: Vec<&'static str> = bucket.iter().map(CapturedValue::type_name).collect();
        Err(CaptureError::NoneOfTypeFromCall {
            key: key.to_string(),
            expected: type_name::<T>(),
            candidates,
            caller: self.caller_description(),
        })
    }

    /// Returns the `T` values captured under `key`, failing the test if there are none.
    #[track_caller]
    pub fn captured_of_type_from_call<T>(&self, key: &str) -> Vec<T>
    where
        T: Any + Clone,
    {
        match self.try_captured_of_type_from_call(key) {
            Ok(values) => values,
            Err(err) => fail(&err),
        }
    }
}

#[track_caller]
fn fail(err: &CaptureError) -> ! {
    tracing::error!(caller = %err.caller(), error = %err, "capture retrieval failed");
    panic!("{err}");
}

/// Captures one or more values of any `Debug` type against the current mocked call.
///
/// ```
/// use mocktrail::{CaptureStore, capture};
///
/// let store = CaptureStore::new();
/// capture!(store, "key", 7_u32);
/// assert_eq!(store.len(), 2);
/// ```
#[macro_export]
macro_rules! capture {
    ($store:expr, $($value:expr),+ $(,)?) => {
        $store.capture_values([$($crate::CapturedValue::new($value)),+])
    };
}
