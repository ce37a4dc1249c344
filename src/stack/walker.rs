//! Outward stack walk that singles out the test, tested, mocked and mocker frames.
//!
//! The walk is one pass over an explicitly materialized frame sequence. Each
//! role is claimed by the first frame that qualifies, and the mocker is
//! checked before the mock test for the same frame, so the mocker is always
//! the frame directly outward of the mocked one.

use super::frame::FrameInfo;
use super::resolver::CallerResolver;
use crate::config::CaptureConfig;
use serde::Serialize;
use serde_json::json;

/// Separator between the parts of a correlation key.
pub const KEY_SEPARATOR: &str = ".";

/// Builds a correlation key from mocker and mocked identities.
///
/// ```
/// use mocktrail::stack::mocked_call_key;
///
/// assert_eq!(mocked_call_key("", "welcome", "MockGreeter", "greet"), ".welcome.MockGreeter.greet");
/// ```
#[must_use]
pub fn mocked_call_key(
    mocker_receiver: &str,
    mocker_function: &str,
    mocked_receiver: &str,
    mocked_function: &str,
) -> String {
    [mocker_receiver, mocker_function, mocked_receiver, mocked_function].join(KEY_SEPARATOR)
}

/// Result of one stack walk.
///
/// Role accessors return references into [`frames`](Self::frames).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameClassification {
    frames: Vec<FrameInfo>,
    caller: Option<usize>,
    test: Option<usize>,
    tested: Option<usize>,
    mocked: Option<usize>,
    mocker: Option<usize>,
}

impl FrameClassification {
    fn at(&self, index: Option<usize>) -> Option<&FrameInfo> {
        index.and_then(|i| self.frames.get(i))
    }

    /// Returns the walked frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    /// Returns true if the walk produced no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// First frame outside the walk entry point's namespace.
    #[must_use]
    pub fn caller(&self) -> Option<&FrameInfo> {
        self.at(self.caller)
    }

    /// Nearest test entry point.
    #[must_use]
    pub fn test(&self) -> Option<&FrameInfo> {
        self.at(self.test)
    }

    /// Frame the test called directly.
    #[must_use]
    pub fn tested(&self) -> Option<&FrameInfo> {
        self.at(self.tested)
    }

    /// Nearest mock frame.
    #[must_use]
    pub fn mocked(&self) -> Option<&FrameInfo> {
        self.at(self.mocked)
    }

    /// Frame that called the mock.
    #[must_use]
    pub fn mocker(&self) -> Option<&FrameInfo> {
        self.at(self.mocker)
    }

    /// Returns the correlation key, or `None` when no mock frame was found.
    ///
    /// A mock at the outer edge of the stack has no mocker; its key carries
    /// empty mocker parts.
    #[must_use]
    pub fn mocked_call(&self) -> Option<String> {
        let mocked = self.mocked()?;
        let (mocker_receiver, mocker_function) = self
            .mocker()
            .map_or(("", ""), |mocker| (mocker.receiver(), mocker.function()));
        Some(mocked_call_key(
            mocker_receiver,
            mocker_function,
            mocked.receiver(),
            mocked.function(),
        ))
    }

    /// Describes the immediate caller for diagnostics.
    #[must_use]
    pub fn caller_description(&self) -> String {
        self.caller()
            .map_or_else(|| "<unknown caller>".to_string(), FrameInfo::log_string)
    }

    /// JSON summary of the roles and walked frames.
    #[must_use]
    pub fn summary_json(&self) -> serde_json::Value {
        let describe = |frame: Option<&FrameInfo>| frame.map(FrameInfo::log_string);
        json!({
            "caller": describe(self.caller()),
            "test": describe(self.test()),
            "tested": describe(self.tested()),
            "mocked": describe(self.mocked()),
            "mocker": describe(self.mocker()),
            "mocked_call": self.mocked_call(),
            "frames": self.frames.iter().map(FrameInfo::log_string).collect::<Vec<_>>(),
        })
    }
}

/// Classifies the frames served by a [`CallerResolver`].
#[derive(Debug, Clone, Default)]
pub struct StackWalker {
    config: CaptureConfig,
}

impl StackWalker {
    /// Creates a walker with the given conventions.
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    /// Returns the walker's configuration.
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Walks outward from depth 0 until resolution fails.
    ///
    /// An unresolvable entry point yields an empty classification.
    #[must_use]
    pub fn walk(&self, resolver: &dyn CallerResolver) -> FrameClassification {
        let mut stack = FrameClassification::default();
        let Some(entry) = resolver.resolve(0) else {
            return stack;
        };

        let mut depth = self.config.skip_frames;
        while let Some(frame) = resolver.resolve(depth) {
            let index = stack.frames.len();
            let previous = index.checked_sub(1);

            if stack.caller.is_none() && frame.namespace() != entry.namespace() {
                stack.caller = Some(index);
            }
            if stack.mocker.is_none() && stack.mocked.is_some() && previous == stack.mocked {
                stack.mocker = Some(index);
            }
            if stack.mocked.is_none() && self.config.is_mock_frame(&frame) {
                stack.mocked = Some(index);
            }
            if stack.test.is_none() && self.config.is_test_frame(&frame) {
                stack.test = Some(index);
                stack.tested = previous;
            }

            stack.frames.push(frame);
            depth += 1;
        }

        tracing::trace!(
            entry = %entry.log_string(),
            frames = stack.frames.len(),
            mocked_call = ?stack.mocked_call(),
            "stack walk complete"
        );
        stack
    }
}
