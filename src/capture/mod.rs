//! Capture storage and retrieval.

pub mod error;
pub mod store;
pub mod value;

pub use error::CaptureError;
pub use store::CaptureStore;
pub use value::CapturedValue;
