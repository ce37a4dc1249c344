//! Predicates over captured values.
//!
//! ```
//! use mocktrail::{CapturedValue, Matcher, any_string, is_type};
//!
//! let value = CapturedValue::new(String::from("hi"));
//! assert!(any_string().matches(&value));
//! assert!(!is_type::<u32>().matches(&value));
//! ```

use crate::capture::CapturedValue;
use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;

/// Decides whether a captured value is acceptable.
pub trait Matcher: fmt::Display {
    /// Returns true if `value` satisfies the matcher.
    fn matches(&self, value: &CapturedValue) -> bool;
}

/// Matches values of exactly type `T`.
pub struct IsType<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for IsType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsType").field("type", &type_name::<T>()).finish()
    }
}

impl<T> Clone for IsType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IsType<T> {}

impl<T: Any> Matcher for IsType<T> {
    fn matches(&self, value: &CapturedValue) -> bool {
        value.is::<T>()
    }
}

impl<T> fmt::Display for IsType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is type {}", type_name::<T>())
    }
}

/// Matches owned and static string values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyString;

impl Matcher for AnyString {
    fn matches(&self, value: &CapturedValue) -> bool {
        value.is::<String>() || value.is::<&'static str>()
    }
}

impl fmt::Display for AnyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any string")
    }
}

/// Matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyValue;

impl Matcher for AnyValue {
    fn matches(&self, _value: &CapturedValue) -> bool {
        true
    }
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any value")
    }
}

/// Matches function pointers of any signature.
///
/// Function items and closures do not implement `Debug`, so a captured
/// callable is always a coerced pointer such as `fn(i32) -> i32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyFn;

const FN_POINTER_PREFIXES: &[&str] = &["fn(", "unsafe fn(", "extern \"", "unsafe extern \"", "for<"];

impl Matcher for AnyFn {
    fn matches(&self, value: &CapturedValue) -> bool {
        let name = value.type_name();
        FN_POINTER_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    }
}

impl fmt::Display for AnyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any function pointer")
    }
}

/// Matches values of type `T`.
#[must_use]
pub fn is_type<T: Any>() -> IsType<T> {
    IsType {
        _marker: PhantomData,
    }
}

/// Matches `String` and `&'static str` values.
#[must_use]
pub fn any_string() -> AnyString {
    AnyString
}

/// Matches any value.
#[must_use]
pub fn any_value() -> AnyValue {
    AnyValue
}

/// Matches function pointer values.
#[must_use]
pub fn any_fn() -> AnyFn {
    AnyFn
}
