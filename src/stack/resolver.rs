//! Frame resolution at a given depth above the resolver's creator.
//!
//! [`BacktraceResolver`] snapshots the live stack once and serves depths from
//! that snapshot, so a walk sees one consistent stack. [`FixedResolver`]
//! serves a scripted frame list for contexts without symbol information.

use super::frame::FrameInfo;
use backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

/// Resolves exactly one frame above the point where the resolver was created.
pub trait CallerResolver {
    /// Returns the frame `depth` levels outward; depth 0 is the creator's caller.
    ///
    /// Returns `None` past the end of the stack, for frames without a
    /// resolvable symbol, and for compiler-generated shim frames.
    fn resolve(&self, depth: usize) -> Option<FrameInfo>;
}

/// Live-stack resolver backed by a `backtrace` snapshot.
///
/// Inlined symbols are expanded into logical frames, innermost first.
#[derive(Debug, Clone, Default)]
pub struct BacktraceResolver {
    frames: Vec<Option<FrameInfo>>,
}

impl BacktraceResolver {
    /// Snapshots the current stack. Depth 0 is the caller of `capture`.
    #[inline(never)]
    #[must_use]
    pub fn capture() -> Self {
        Self::collect(1)
    }

    /// Snapshots the stack, dropping everything up to and including this
    /// frame plus `skip` further frames.
    #[inline(never)]
    pub(crate) fn collect(skip: usize) -> Self {
        let backtrace = Backtrace::new();
        let mut frames = Vec::new();
        for frame in backtrace.frames() {
            let address = frame.ip() as usize;
            if frame.symbols().is_empty() {
                frames.push(None);
                continue;
            }
            for symbol in frame.symbols() {
                let Some(name) = symbol.name() else {
                    frames.push(None);
                    continue;
                };
                let mut info = FrameInfo::new(demangle(name.as_bytes())).with_address(address);
                if let Some(file) = symbol.filename() {
                    info = match symbol.lineno() {
                        Some(line) => info.with_location(file, line),
                        None => info.with_file(file),
                    };
                }
                frames.push(Some(info));
            }
        }

        let Some(anchor) = frames
            .iter()
            .position(|frame| frame.as_ref().is_some_and(is_collect_frame))
        else {
            tracing::debug!(
                frames = frames.len(),
                "resolver anchor not found; stack symbols unavailable"
            );
            return Self::default();
        };
        let start = (anchor + 1 + skip).min(frames.len());
        Self {
            frames: frames.split_off(start),
        }
    }

    /// Returns the number of logical frames in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frames were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CallerResolver for BacktraceResolver {
    fn resolve(&self, depth: usize) -> Option<FrameInfo> {
        self.frames
            .get(depth)?
            .as_ref()
            .filter(|frame| !frame.is_synthesized())
            .cloned()
    }
}

fn is_collect_frame(frame: &FrameInfo) -> bool {
    frame.function() == "collect" && frame.receiver() == "BacktraceResolver"
}

/// Demangles to the alternate (hash-free) form. Unmangled names pass through.
fn demangle(bytes: &[u8]) -> String {
    let symbol = String::from_utf8_lossy(bytes);
    format!("{:#}", rustc_demangle::demangle(&symbol))
}

/// Resolver over a scripted frame list, innermost first.
///
/// Frame 0 plays the walk's entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedResolver {
    frames: Vec<FrameInfo>,
}

impl FixedResolver {
    /// Creates a resolver over the given frames.
    #[must_use]
    pub fn new(frames: Vec<FrameInfo>) -> Self {
        Self { frames }
    }

    /// Creates a resolver from raw symbol names.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(FrameInfo::new).collect())
    }
}

impl CallerResolver for FixedResolver {
    fn resolve(&self, depth: usize) -> Option<FrameInfo> {
        self.frames
            .get(depth)
            .filter(|frame| !frame.is_synthesized())
            .cloned()
    }
}

/// Hands out a fresh resolver for every walk.
pub trait StackSource: Send + Sync + fmt::Debug {
    /// Returns a resolver whose depth 0 is the caller of `snapshot`.
    fn snapshot(&self) -> Box<dyn CallerResolver>;
}

/// Live stack source.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceSource;

impl StackSource for BacktraceSource {
    #[inline(never)]
    fn snapshot(&self) -> Box<dyn CallerResolver> {
        Box::new(BacktraceResolver::collect(1))
    }
}

/// Source that replays the same scripted stack on every snapshot.
#[derive(Debug, Clone, Default)]
pub struct FixedSource {
    resolver: Arc<FixedResolver>,
}

impl FixedSource {
    /// Creates a source from raw symbol names, innermost first.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resolver: Arc::new(FixedResolver::from_names(names)),
        }
    }
}

impl From<FixedResolver> for FixedSource {
    fn from(resolver: FixedResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

impl StackSource for FixedSource {
    fn snapshot(&self) -> Box<dyn CallerResolver> {
        Box::new(FixedResolver::clone(&self.resolver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[inline(never)]
    fn resolve_from_helper(depth: usize) -> Option<FrameInfo> {
        BacktraceResolver::capture().resolve(depth)
    }

    #[test]
    fn capture_anchors_depth_zero_at_caller() {
        init_test("capture_anchors_depth_zero_at_caller");
        let here = resolve_from_helper(0);
        let function = here.as_ref().map(|f| f.function().to_string());
        crate::assert_with_log!(
            function.as_deref() == Some("resolve_from_helper"),
            "depth 0 is the capturing function",
            Some("resolve_from_helper"),
            function
        );
        let outer = resolve_from_helper(1);
        let function = outer.as_ref().map(|f| f.function().to_string());
        crate::assert_with_log!(
            function.as_deref() == Some("capture_anchors_depth_zero_at_caller"),
            "depth 1 is the test",
            Some("capture_anchors_depth_zero_at_caller"),
            function
        );
        crate::test_complete!("capture_anchors_depth_zero_at_caller");
    }

    #[test]
    fn capture_runs_out_at_stack_end() {
        init_test("capture_runs_out_at_stack_end");
        let resolver = BacktraceResolver::capture();
        let beyond = resolver.resolve(resolver.len() + 1);
        crate::assert_with_log!(beyond.is_none(), "past the end", true, beyond.is_none());
        crate::test_complete!("capture_runs_out_at_stack_end");
    }

    #[test]
    fn fixed_resolver_hides_shims() {
        init_test("fixed_resolver_hides_shims");
        let resolver = FixedResolver::from_names([
            "app::entry",
            "core::ops::function::FnOnce::call_once{{vtable.shim}}",
            "app::outer",
        ]);
        let entry = resolver.resolve(0).map(|f| f.function().to_string());
        crate::assert_with_log!(
            entry.as_deref() == Some("entry"),
            "entry",
            Some("entry"),
            entry
        );
        let shim = resolver.resolve(1);
        crate::assert_with_log!(shim.is_none(), "shim hidden", true, shim.is_none());
        let outer = resolver.resolve(2).map(|f| f.function().to_string());
        crate::assert_with_log!(
            outer.as_deref() == Some("outer"),
            "later depth still resolvable",
            Some("outer"),
            outer
        );
        let beyond = resolver.resolve(3);
        crate::assert_with_log!(beyond.is_none(), "exhausted", true, beyond.is_none());
        crate::test_complete!("fixed_resolver_hides_shims");
    }

    #[test]
    fn demangle_drops_hash() {
        init_test("demangle_drops_hash");
        let name = demangle(b"_ZN3app7service3run17h0123456789abcdefE");
        crate::assert_with_log!(name == "app::service::run", "demangled", "app::service::run", name);
        let plain = demangle(b"__libc_start_main");
        crate::assert_with_log!(
            plain == "__libc_start_main",
            "unmangled passes through",
            "__libc_start_main",
            plain
        );
        crate::test_complete!("demangle_drops_hash");
    }
}
