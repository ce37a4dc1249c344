//! Naming conventions and walk settings.
//!
//! The defaults recognise `Mock*` receivers as mocks and `Test*`,
//! `Benchmark*`, `Example*`, `test_*` and `bench_*` functions as test entry
//! points. Projects with other conventions register extra prefixes:
//!
//! ```
//! use mocktrail::CaptureConfig;
//!
//! let config = CaptureConfig::new()
//!     .with_mock_prefix("Fake")
//!     .with_test_prefix("it");
//! assert!(config.validate().is_ok());
//! ```

use crate::stack::{DEFAULT_MOCK_PREFIXES, DEFAULT_TEST_PREFIXES, FrameInfo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating or loading a [`CaptureConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A prefix list contains an empty string, which would match every name.
    #[error("{field} contains an empty prefix")]
    EmptyPrefix {
        /// Offending field.
        field: &'static str,
    },
    /// A prefix list is empty.
    #[error("{field} must name at least one prefix")]
    NoPrefixes {
        /// Offending field.
        field: &'static str,
    },
    /// Frame 0 is the walk entry point and must be skipped.
    #[error("skip_frames must be at least 1")]
    ZeroSkip,
    /// TOML parse failure.
    #[cfg(feature = "config-file")]
    #[error("invalid capture config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for stack classification and capture diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Receiver-type prefixes that mark a mock object.
    pub mock_prefixes: Vec<String>,
    /// Function prefixes that mark a test entry point.
    pub test_prefixes: Vec<String>,
    /// Frames skipped past the walk entry point before classification starts.
    pub skip_frames: usize,
    /// Log a warning when a capture finds no mock frame.
    pub warn_unkeyed: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mock_prefixes: DEFAULT_MOCK_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
            test_prefixes: DEFAULT_TEST_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
            skip_frames: 1,
            warn_unkeyed: true,
        }
    }
}

impl CaptureConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mock receiver prefix.
    #[must_use]
    pub fn with_mock_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mock_prefixes.push(prefix.into());
        self
    }

    /// Adds a test function prefix.
    #[must_use]
    pub fn with_test_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.test_prefixes.push(prefix.into());
        self
    }

    /// Sets the number of frames skipped past the entry point.
    #[must_use]
    pub fn with_skip_frames(mut self, skip_frames: usize) -> Self {
        self.skip_frames = skip_frames;
        self
    }

    /// Enables or disables the unkeyed-capture warning.
    #[must_use]
    pub fn with_warn_unkeyed(mut self, warn: bool) -> Self {
        self.warn_unkeyed = warn;
        self
    }

    /// Checks prefix lists and the walk offset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, prefixes) in [
            ("mock_prefixes", &self.mock_prefixes),
            ("test_prefixes", &self.test_prefixes),
        ] {
            if prefixes.is_empty() {
                return Err(ConfigError::NoPrefixes { field });
            }
            if prefixes.iter().any(String::is_empty) {
                return Err(ConfigError::EmptyPrefix { field });
            }
        }
        if self.skip_frames == 0 {
            return Err(ConfigError::ZeroSkip);
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns true if `frame` belongs to a mock object.
    #[must_use]
    pub fn is_mock_frame(&self, frame: &FrameInfo) -> bool {
        frame.is_mock_with(self.mock_prefixes.as_slice())
    }

    /// Returns true if `frame` is a test entry point.
    #[must_use]
    pub fn is_test_frame(&self, frame: &FrameInfo) -> bool {
        frame.is_test_with(self.test_prefixes.as_slice())
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

    #[test]
    fn default_config_is_valid() {
        init_test("default_config_is_valid");
        let config = CaptureConfig::default();
        let valid = config.validate().is_ok();
        crate::assert_with_log!(valid, "default validates", true, valid);
        crate::assert_with_log!(
            config.skip_frames == 1,
            "skip entry point",
            1,
            config.skip_frames
        );
        crate::test_complete!("default_config_is_valid");
    }

    #[test]
    fn extra_prefixes_extend_detection() {
        init_test("extra_prefixes_extend_detection");
        let config = CaptureConfig::new().with_mock_prefix("Fake").with_test_prefix("it");
        let fake = FrameInfo::new("<app::FakeClock as app::Clock>::now");
        crate::assert_with_log!(config.is_mock_frame(&fake), "Fake mock", true, config.is_mock_frame(&fake));
        crate::assert_with_log!(!fake.is_mock(), "not a mock by default", false, fake.is_mock());
        let it = FrameInfo::new("app::tests::it_works");
        crate::assert_with_log!(config.is_test_frame(&it), "it_ test", true, config.is_test_frame(&it));
        crate::test_complete!("extra_prefixes_extend_detection");
    }

    #[test]
    fn validate_rejects_bad_settings() {
        init_test("validate_rejects_bad_settings");
        let empty = CaptureConfig::new().with_mock_prefix("").validate();
        let empty_ok = matches!(empty, Err(ConfigError::EmptyPrefix { field: "mock_prefixes" }));
        crate::assert_with_log!(empty_ok, "empty prefix", true, empty_ok);

        let mut none = CaptureConfig::new();
        none.test_prefixes.clear();
        let none_ok = matches!(none.validate(), Err(ConfigError::NoPrefixes { field: "test_prefixes" }));
        crate::assert_with_log!(none_ok, "no prefixes", true, none_ok);

        let zero = CaptureConfig::new().with_skip_frames(0).validate();
        let zero_ok = matches!(zero, Err(ConfigError::ZeroSkip));
        crate::assert_with_log!(zero_ok, "zero skip", true, zero_ok);
        crate::test_complete!("validate_rejects_bad_settings");
    }

    #[test]
    fn partial_json_fills_defaults() {
        init_test("partial_json_fills_defaults");
        let config: CaptureConfig =
            serde_json::from_str(r#"{"mock_prefixes": ["Stub"], "warn_unkeyed": false}"#)
                .expect("parse config");
        crate::assert_with_log!(
            config.mock_prefixes == vec!["Stub".to_string()],
            "mock prefixes replaced",
            vec!["Stub"],
            config.mock_prefixes
        );
        crate::assert_with_log!(
            config.test_prefixes == CaptureConfig::default().test_prefixes,
            "test prefixes defaulted",
            CaptureConfig::default().test_prefixes,
            config.test_prefixes
        );
        crate::assert_with_log!(!config.warn_unkeyed, "warn off", false, config.warn_unkeyed);
        crate::test_complete!("partial_json_fills_defaults");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_config_loads_and_validates() {
        init_test("toml_config_loads_and_validates");
        let config = CaptureConfig::from_toml_str("mock_prefixes = [\"Mock\", \"Fake\"]\nskip_frames = 2\n")
            .expect("load config");
        crate::assert_with_log!(config.skip_frames == 2, "skip", 2, config.skip_frames);
        let rejected = CaptureConfig::from_toml_str("skip_frames = 0\n");
        let rejected_ok = matches!(rejected, Err(ConfigError::ZeroSkip));
        crate::assert_with_log!(rejected_ok, "zero skip rejected", true, rejected_ok);
        crate::test_complete!("toml_config_loads_and_validates");
    }
}
