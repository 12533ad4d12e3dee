mod recording;
pub use recording::RecordingDispatcher;

#[cfg(feature = "test-helpers")]
mod capture;
#[cfg(feature = "test-helpers")]
pub use capture::{CaptureServer, CapturedRequest, create_capture_server};
