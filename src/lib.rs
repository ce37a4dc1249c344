//! Mocktrail: stack-correlated argument capture for mock-driven tests.
//!
//! # Overview
//!
//! A mock method calls [`CaptureStore::capture`] with the arguments it
//! received. The store walks the call stack, finds the mock frame and the
//! frame that called it, and files the values under a correlation key built
//! from both. Tests then ask for "what did `Service::run` pass to
//! `MockLogger::info`" without labelling anything by hand.
//!
//! Keys have the form `MockerReceiver.mocker_fn.MockedReceiver.mocked_fn`;
//! a free-function mocker leaves its receiver part empty.
//!
//! # Module Structure
//!
//! - [`stack`]: frame parsing, resolution and classification
//! - [`capture`]: the capture store, captured values and retrieval errors
//! - [`config`]: mock and test naming conventions
//! - [`matcher`]: predicates over captured values
//! - [`context`]: per-test context with cleanups and temp files
//! - `test_utils`: structured test logging (feature `test-internals`)
//!
//! # Example
//!
//! ```no_run
//! use mocktrail::{CaptureStore, TestContext};
//! use std::sync::Arc;
//!
//! trait Greeter {
//!     fn greet(&self, name: &str);
//! }
//!
//! struct MockGreeter {
//!     captures: Arc<CaptureStore>,
//! }
//!
//! impl Greeter for MockGreeter {
//!     fn greet(&self, name: &str) {
//!         self.captures.capture(name.to_string());
//!     }
//! }
//!
//! fn welcome(greeter: &dyn Greeter) {
//!     greeter.greet("ada");
//! }
//!
//! let ctx = TestContext::new("welcome");
//! welcome(&MockGreeter { captures: Arc::clone(ctx.captures()) });
//! let names: Vec<String> = ctx.captures().captured_of_type_from_call(".welcome.MockGreeter.greet");
//! assert_eq!(names, ["ada"]);
//! ```
//!
//! Stack symbols are required. Without debug info, or for code that cannot
//! be walked, use [`CaptureStore::capture_for_call`] with an explicit key.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod context;
pub mod matcher;
pub mod stack;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use capture::{CaptureError, CaptureStore, CapturedValue};
pub use config::{CaptureConfig, ConfigError};
pub use context::{TestContext, TestError};
pub use matcher::{AnyFn, AnyString, AnyValue, IsType, Matcher, any_fn, any_string, any_value, is_type};
pub use stack::{
    BacktraceResolver, BacktraceSource, CallerResolver, FixedResolver, FixedSource,
    FrameClassification, FrameInfo, StackSource, StackWalker, mocked_call_key,
};

#[doc(hidden)]
pub use tracing as __tracing;
