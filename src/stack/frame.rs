//! Resolved call-stack frames and symbol-name parsing.
//!
//! A [`FrameInfo`] wraps one resolved frame and splits its demangled symbol
//! into a namespace path, a receiver type and a function name:
//!
//! | raw symbol                                  | namespace      | receiver     | function |
//! |---------------------------------------------|----------------|--------------|----------|
//! | `app::service::run`                         | `app::service` |              | `run`    |
//! | `<app::MockLogger as app::Logger>::info`    | `app`          | `MockLogger` | `info`   |
//! | `<&mut app::Store as app::Put>::put`        | `app`          | `Store`      | `put`    |
//! | `<app::Service>::run::{{closure}}`          | `app`          | `Service`    | `run::{{closure}}` |
//! | `app::Service::run`                         | `app`          | `Service`    | `run`    |
//! | `app::run::<app::MockX>`                    | `app`          |              | `run`    |
//!
//! The receiver marker is the first `<...>` segment that leads the path, is an
//! `<impl ...>` block or a `<T as Trait>` pair. Other bracketed segments are
//! generic arguments and are dropped. Legacy inherent methods
//! (`app::Service::run`) carry no marker; a capitalised segment before the
//! function is taken as their receiver.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between path segments in a demangled symbol.
pub const PATH_SEPARATOR: &str = "::";

/// Receiver prefixes that mark a mock object by default.
pub const DEFAULT_MOCK_PREFIXES: &[&str] = &["Mock"];

/// Function prefixes that mark a test entry point by default.
pub const DEFAULT_TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example", "test", "bench"];

/// Symbol fragments emitted for compiler-generated shim frames.
pub const SHIM_MARKERS: &[&str] = &["{{vtable.shim}}", "{{vtable-shim}}", "{{reify.shim}}", "{shim:"];

const INDIRECTION_MARKERS: &[&str] = &["&mut ", "&", "*const ", "*mut "];

/// Structured parts of a demangled symbol name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolParts {
    /// Function name, including any nested closure segments.
    pub function: String,
    /// Receiver type name without path, generics or indirection. Empty for free functions.
    pub receiver: String,
    /// Enclosing module path.
    pub namespace: String,
}

/// Splits a raw symbol name into namespace, receiver and function.
///
/// A trailing legacy hash segment (`::h0123456789abcdef`) is ignored.
///
/// # Example
///
/// ```
/// use mocktrail::stack::parse_symbol;
///
/// let parts = parse_symbol("<app::MockLogger as app::Logger>::info");
/// assert_eq!(parts.function, "info");
/// assert_eq!(parts.receiver, "MockLogger");
/// assert_eq!(parts.namespace, "app");
/// ```
#[must_use]
pub fn parse_symbol(raw: &str) -> SymbolParts {
    let name = strip_hash(raw);
    let segments: Vec<&str> = split_segments(name)
        .into_iter()
        .enumerate()
        .filter(|&(index, segment)| !is_bracketed(segment) || is_receiver_marker(index, segment))
        .map(|(_, segment)| segment)
        .collect();
    if segments.len() < 2 {
        return SymbolParts {
            function: segments.join(PATH_SEPARATOR),
            ..SymbolParts::default()
        };
    }

    let Some(marker) = segments.iter().position(|segment| is_bracketed(segment)) else {
        return parse_unmarked(&segments);
    };

    let self_type = self_type_of(segments[marker]);
    let type_segments = split_segments(self_type);
    let receiver = type_segments
        .last()
        .map(|last| last.split('<').next().unwrap_or_default())
        .unwrap_or_default();
    let namespace = if marker == 0 {
        type_segments[..type_segments.len().saturating_sub(1)].join(PATH_SEPARATOR)
    } else {
        segments[..marker].join(PATH_SEPARATOR)
    };

    SymbolParts {
        function: segments[marker + 1..].join(PATH_SEPARATOR),
        receiver: receiver.to_string(),
        namespace,
    }
}

/// Legacy symbols spell inherent methods as `path::Type::method`; a
/// capitalised second-to-last segment is taken as the receiver.
fn parse_unmarked(segments: &[&str]) -> SymbolParts {
    let last = segments.len() - 1;
    let owner = segments[last - 1];
    if owner.starts_with(|c: char| c.is_ascii_uppercase()) {
        return SymbolParts {
            function: segments[last].to_string(),
            receiver: owner.to_string(),
            namespace: segments[..last - 1].join(PATH_SEPARATOR),
        };
    }
    SymbolParts {
        function: segments[last].to_string(),
        receiver: String::new(),
        namespace: segments[..last].join(PATH_SEPARATOR),
    }
}

/// Word-boundary prefix match.
///
/// True when `name` equals `prefix`, or starts with it and the next character
/// is not a lowercase letter. `TestFoo` and `test_parse` match; `Testing` does not.
#[must_use]
pub fn has_word_prefix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.chars().next().is_none_or(|next| !next.is_lowercase()))
}

fn has_any_word_prefix<S: AsRef<str>>(name: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|prefix| has_word_prefix(name, prefix.as_ref()))
}

fn strip_hash(name: &str) -> &str {
    if let Some(pos) = name.rfind("::h") {
        let hash = &name[pos + 3..];
        if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return &name[..pos];
        }
    }
    name
}

/// Splits on `::` outside angle brackets. The `>` of `->` does not close a bracket.
fn split_segments(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&name[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&name[start..]);
    segments
}

fn is_bracketed(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('<') && segment.ends_with('>')
}

/// A bracketed segment names a receiver when it leads the path, is an
/// `<impl ...>` block or a `<T as Trait>` pair. Anything else is a generic
/// argument list and is dropped.
fn is_receiver_marker(index: usize, segment: &str) -> bool {
    is_bracketed(segment)
        && (index == 0
            || segment.starts_with("<impl ")
            || as_position(&segment[1..segment.len() - 1]).is_some())
}

/// Byte offset of the top-level ` as ` inside a bracketed segment's body.
fn as_position(inner: &str) -> Option<usize> {
    let bytes = inner.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 && inner[i..].starts_with(" as ") => return Some(i),
            _ => {}
        }
    }
    None
}

/// `<&mut a::B<T> as c::D>` -> `a::B<T>`.
fn self_type_of(marker: &str) -> &str {
    let inner = &marker[1..marker.len() - 1];
    let ty = &inner[..as_position(inner).unwrap_or(inner.len())];
    let ty = INDIRECTION_MARKERS
        .iter()
        .find_map(|marker| ty.strip_prefix(marker))
        .unwrap_or(ty);
    ty.strip_prefix("impl ").unwrap_or(ty)
}

/// One resolved call-stack frame.
///
/// The derived name parts are computed once in the constructor and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    name: String,
    file: Option<PathBuf>,
    line: Option<u32>,
    address: usize,
    function: String,
    receiver: String,
    namespace: String,
}

impl FrameInfo {
    /// Creates a frame from a demangled symbol name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let SymbolParts {
            function,
            receiver,
            namespace,
        } = parse_symbol(&name);
        Self {
            name,
            file: None,
            line: None,
            address: 0,
            function,
            receiver,
            namespace,
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_location(mut self, file: impl Into<PathBuf>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Sets the source file without a line number.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the program counter.
    #[must_use]
    pub fn with_address(mut self, address: usize) -> Self {
        self.address = address;
        self
    }

    /// Returns the raw symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source file, if known.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Returns the source line, if known.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Returns the program counter (0 for scripted frames).
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// Returns the function name.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Returns the receiver type name, empty for free functions.
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Returns the enclosing namespace path.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns true if this frame belongs to a mock object (default prefixes).
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.is_mock_with(DEFAULT_MOCK_PREFIXES)
    }

    /// Returns true if the receiver starts with one of `prefixes` at a word boundary.
    #[must_use]
    pub fn is_mock_with<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        has_any_word_prefix(&self.receiver, prefixes)
    }

    /// Returns true if this frame is a test entry point (default prefixes).
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.is_test_with(DEFAULT_TEST_PREFIXES)
    }

    /// Returns true if the function starts with one of `prefixes` at a word boundary.
    #[must_use]
    pub fn is_test_with<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        has_any_word_prefix(&self.function, prefixes)
    }

    /// Returns true for compiler-generated shim frames.
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        SHIM_MARKERS.iter().any(|marker| self.name.contains(marker))
    }

    /// Returns `file:line`, with `<unknown>` for missing parts.
    #[must_use]
    pub fn file_line(&self) -> String {
        let file = self
            .file
            .as_deref()
            .map_or_else(|| "<unknown>".to_string(), |f| f.display().to_string());
        match self.line {
            Some(line) => format!("{file}:{line}"),
            None => format!("{file}:<unknown>"),
        }
    }

    /// Returns a one-line description for diagnostics.
    #[must_use]
    pub fn log_string(&self) -> String {
        let owner = if self.receiver.is_empty() {
            &self.namespace
        } else {
            &self.receiver
        };
        if owner.is_empty() {
            format!("{} at {}", self.function, self.file_line())
        } else {
            format!("{owner}::{} at {}", self.function, self.file_line())
        }
    }
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use proptest::prelude::*;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn parts(raw: &str) -> (String, String, String) {
        let p = parse_symbol(raw);
        (p.namespace, p.receiver, p.function)
    }

    #[test]
    fn parse_free_function() {
        init_test("parse_free_function");
        let (namespace, receiver, function) = parts("app::service::run");
        crate::assert_with_log!(namespace == "app::service", "namespace", "app::service", namespace);
        crate::assert_with_log!(receiver.is_empty(), "receiver", "", receiver);
        crate::assert_with_log!(function == "run", "function", "run", function);
        crate::test_complete!("parse_free_function");
    }

    #[test]
    fn parse_trait_impl_receiver() {
        init_test("parse_trait_impl_receiver");
        let (namespace, receiver, function) = parts("<app::mocks::MockLogger as app::Logger>::info");
        crate::assert_with_log!(namespace == "app::mocks", "namespace", "app::mocks", namespace);
        crate::assert_with_log!(receiver == "MockLogger", "receiver", "MockLogger", receiver);
        crate::assert_with_log!(function == "info", "function", "info", function);
        crate::test_complete!("parse_trait_impl_receiver");
    }

    #[test]
    fn parse_marker_after_namespace_segments() {
        init_test("parse_marker_after_namespace_segments");
        let (namespace, receiver, function) = parts("app::outer::<impl app::Thing>::go::{{closure}}");
        crate::assert_with_log!(namespace == "app::outer", "namespace", "app::outer", namespace);
        crate::assert_with_log!(receiver == "Thing", "receiver", "Thing", receiver);
        crate::assert_with_log!(
            function == "go::{{closure}}",
            "function keeps trailing segments",
            "go::{{closure}}",
            function
        );
        crate::test_complete!("parse_marker_after_namespace_segments");
    }

    #[test]
    fn parse_strips_one_indirection_and_generics() {
        init_test("parse_strips_one_indirection_and_generics");
        let (_, receiver, _) = parts("<&mut app::Store<alloc::string::String> as app::Put>::put");
        crate::assert_with_log!(receiver == "Store", "&mut stripped", "Store", receiver);
        let (_, receiver, _) = parts("<*const app::Raw as app::Peek>::peek");
        crate::assert_with_log!(receiver == "Raw", "*const stripped", "Raw", receiver);
        let (namespace, receiver, _) = parts("<&&app::Twice as app::Peek>::peek");
        crate::assert_with_log!(receiver == "Twice", "receiver", "Twice", receiver);
        crate::assert_with_log!(namespace == "&app", "only one stripped", "&app", namespace);
        crate::test_complete!("parse_strips_one_indirection_and_generics");
    }

    #[test]
    fn parse_first_marker_wins() {
        init_test("parse_first_marker_wins");
        let (namespace, receiver, function) = parts("<app::A>::f::<app::B as app::T>::g");
        crate::assert_with_log!(receiver == "A", "first marker", "A", receiver);
        crate::assert_with_log!(namespace == "app", "namespace from self type", "app", namespace);
        crate::assert_with_log!(
            function == "f::<app::B as app::T>::g",
            "function",
            "f::<app::B as app::T>::g",
            function
        );
        crate::test_complete!("parse_first_marker_wins");
    }

    #[test]
    fn parse_marker_as_last_segment_yields_empty_function() {
        init_test("parse_marker_as_last_segment_yields_empty_function");
        let (namespace, receiver, function) = parts("app::<impl app::Lonely>");
        crate::assert_with_log!(function.is_empty(), "function", "", function);
        crate::assert_with_log!(receiver == "Lonely", "receiver", "Lonely", receiver);
        crate::assert_with_log!(namespace == "app", "namespace", "app", namespace);
        crate::test_complete!("parse_marker_as_last_segment_yields_empty_function");
    }

    #[test]
    fn parse_drops_generic_arguments() {
        init_test("parse_drops_generic_arguments");
        let (namespace, receiver, function) = parts("app::run::<app::MockX>");
        crate::assert_with_log!(namespace == "app", "namespace", "app", namespace);
        crate::assert_with_log!(receiver.is_empty(), "no receiver", "", receiver);
        crate::assert_with_log!(function == "run", "function", "run", function);
        let generic = FrameInfo::new("app::run::<app::MockX>");
        crate::assert_with_log!(!generic.is_mock(), "not a mock", false, generic.is_mock());

        let (namespace, receiver, function) = parts("<app::S>::f::<u8>");
        crate::assert_with_log!(namespace == "app", "namespace", "app", namespace);
        crate::assert_with_log!(receiver == "S", "receiver", "S", receiver);
        crate::assert_with_log!(function == "f", "function", "f", function);

        let (_, receiver, function) =
            parts("mock_correlation::welcome_generic::<mock_correlation::MockGreeter>");
        crate::assert_with_log!(receiver.is_empty(), "generic helper", "", receiver);
        crate::assert_with_log!(function == "welcome_generic", "function", "welcome_generic", function);
        crate::test_complete!("parse_drops_generic_arguments");
    }

    #[test]
    fn parse_legacy_inherent_method_receiver() {
        init_test("parse_legacy_inherent_method_receiver");
        let (namespace, receiver, function) = parts("app::billing::Billing::run");
        crate::assert_with_log!(namespace == "app::billing", "namespace", "app::billing", namespace);
        crate::assert_with_log!(receiver == "Billing", "receiver", "Billing", receiver);
        crate::assert_with_log!(function == "run", "function", "run", function);

        let legacy = parse_symbol("app::Billing::run");
        let v0 = parse_symbol("<app::Billing>::run");
        crate::assert_with_log!(legacy == v0, "both manglings agree", &v0, &legacy);

        let (_, receiver, function) = parts("app::billing::run::{{closure}}");
        crate::assert_with_log!(receiver.is_empty(), "lowercase owner", "", receiver);
        crate::assert_with_log!(function == "{{closure}}", "function", "{{closure}}", function);

        let mock = FrameInfo::new("app::MockGreeter::greet");
        crate::assert_with_log!(mock.is_mock(), "inherent mock", true, mock.is_mock());
        crate::test_complete!("parse_legacy_inherent_method_receiver");
    }

    #[test]
    fn parse_single_segment() {
        init_test("parse_single_segment");
        let (namespace, receiver, function) = parts("__libc_start_main");
        crate::assert_with_log!(function == "__libc_start_main", "function", "__libc_start_main", function);
        let empty = namespace.is_empty() && receiver.is_empty();
        crate::assert_with_log!(empty, "empty parts", true, empty);
        crate::test_complete!("parse_single_segment");
    }

    #[test]
    fn parse_ignores_legacy_hash_and_fn_arrows() {
        init_test("parse_ignores_legacy_hash_and_fn_arrows");
        let (namespace, _, function) = parts("app::service::run::h0123456789abcdef");
        crate::assert_with_log!(function == "run", "hash dropped", "run", function);
        crate::assert_with_log!(namespace == "app::service", "namespace", "app::service", namespace);
        let (_, receiver, function) = parts("<app::Cb<fn() -> u8> as app::Call>::call");
        crate::assert_with_log!(receiver == "Cb", "arrow does not close", "Cb", receiver);
        crate::assert_with_log!(function == "call", "function", "call", function);
        crate::test_complete!("parse_ignores_legacy_hash_and_fn_arrows");
    }

    #[test]
    fn mock_prefix_respects_word_boundary() {
        init_test("mock_prefix_respects_word_boundary");
        for (receiver, expected) in [
            ("MockLogger", true),
            ("Mock", true),
            ("Mocker", true),
            ("Mockish", true),
            ("Mock2", true),
            ("Mockery", false),
            ("mocker", false),
            ("Logger", false),
        ] {
            let frame = FrameInfo::new(format!("<app::{receiver} as app::Log>::log"));
            let actual = frame.is_mock();
            crate::assert_with_log!(actual == expected, receiver, expected, actual);
        }
        crate::test_complete!("mock_prefix_respects_word_boundary");
    }

    #[test]
    fn test_prefix_respects_word_boundary() {
        init_test("test_prefix_respects_word_boundary");
        for (function, expected) in [
            ("TestFoo", true),
            ("Test", true),
            ("Testing", false),
            ("BenchmarkX", true),
            ("ExampleY", true),
            ("test_parse", true),
            ("testing_helper", false),
            ("bench_walk", true),
            ("helper", false),
        ] {
            let frame = FrameInfo::new(format!("app::tests::{function}"));
            let actual = frame.is_test();
            crate::assert_with_log!(actual == expected, function, expected, actual);
        }
        crate::test_complete!("test_prefix_respects_word_boundary");
    }

    #[test]
    fn shim_frames_are_synthesized() {
        init_test("shim_frames_are_synthesized");
        let shim = FrameInfo::new("core::ops::function::FnOnce::call_once{{vtable.shim}}");
        crate::assert_with_log!(shim.is_synthesized(), "vtable shim", true, shim.is_synthesized());
        let plain = FrameInfo::new("core::ops::function::FnOnce::call_once");
        crate::assert_with_log!(!plain.is_synthesized(), "plain frame", false, plain.is_synthesized());
        crate::test_complete!("shim_frames_are_synthesized");
    }

    #[test]
    fn log_string_prefers_receiver() {
        init_test("log_string_prefers_receiver");
        let frame = FrameInfo::new("<app::MockLogger as app::Logger>::info").with_location("src/app.rs", 12);
        let logged = frame.log_string();
        crate::assert_with_log!(
            logged == "MockLogger::info at src/app.rs:12",
            "receiver form",
            "MockLogger::info at src/app.rs:12",
            logged
        );
        let free = FrameInfo::new("app::run");
        let logged = free.log_string();
        crate::assert_with_log!(
            logged == "app::run at <unknown>:<unknown>",
            "namespace form",
            "app::run at <unknown>:<unknown>",
            logged
        );
        crate::test_complete!("log_string_prefers_receiver");
    }

    proptest! {
        #[test]
        fn marker_symbols_decompose(
            namespace in "[a-z][a-z0-9_]{0,6}(::[a-z][a-z0-9_]{0,6}){0,2}",
            receiver in "[A-Z][A-Za-z0-9]{0,8}",
            function in "[a-z_][a-z0-9_]{0,8}",
        ) {
            let raw = format!("<{namespace}::{receiver} as {namespace}::Trait>::{function}");
            let parsed = parse_symbol(&raw);
            prop_assert_eq!(&parsed.namespace, &namespace);
            prop_assert_eq!(&parsed.receiver, &receiver);
            prop_assert_eq!(&parsed.function, &function);
            prop_assert_eq!(parse_symbol(&raw), parsed);
        }

        #[test]
        fn plain_symbols_decompose(
            namespace in "[a-z][a-z0-9_]{0,6}(::[a-z][a-z0-9_]{0,6}){0,3}",
            function in "[a-z_][a-z0-9_]{0,8}",
        ) {
            let raw = format!("{namespace}::{function}");
            let parsed = parse_symbol(&raw);
            prop_assert_eq!(parsed.namespace, namespace);
            prop_assert!(parsed.receiver.is_empty());
            prop_assert_eq!(parsed.function, function);
        }
    }
}
