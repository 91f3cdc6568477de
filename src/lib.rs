pub mod command;
pub mod config;
pub mod error;
pub mod fps;
pub mod landmarks;
pub mod overlay;
pub mod session;
pub mod store;
pub mod webcam;
pub mod window;

pub use command::Command;
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use landmarks::{Detections, FrameSnapshot, LandmarkDetector, LandmarkSet, Region};
pub use session::{CaptureSession, Flow};
pub use store::{CaptureStore, FrameCounter, SaveOutcome};
pub use webcam::FrameSource;
pub use window::Display;
