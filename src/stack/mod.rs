//! Call-stack inspection for capture correlation.
//!
//! - [`frame`]: resolved frames and symbol-name parsing
//! - [`resolver`]: live and scripted frame resolution
//! - [`walker`]: outward walk that classifies test, tested, mocked and mocker frames

pub mod frame;
pub mod resolver;
pub mod walker;

pub use frame::{
    DEFAULT_MOCK_PREFIXES, DEFAULT_TEST_PREFIXES, FrameInfo, PATH_SEPARATOR, SHIM_MARKERS,
    SymbolParts, has_word_prefix, parse_symbol,
};
pub use resolver::{
    BacktraceResolver, BacktraceSource, CallerResolver, FixedResolver, FixedSource, StackSource,
};
pub use walker::{FrameClassification, KEY_SEPARATOR, StackWalker, mocked_call_key};
