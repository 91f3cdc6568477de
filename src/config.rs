use std::path::PathBuf;
use std::time::Duration;

// everything the capture session needs to know up front. there is no user-facing
// configuration surface, the defaults are the tool's behaviour.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub device_index: u32,
    // working resolution every frame is resized to before inference
    pub frame_size: (u32, u32),
    pub data_dir: PathBuf,
    pub landmarks_dir: PathBuf,
    // how long the loop waits for a key each iteration
    pub poll_timeout: Duration,
    pub window_title: String,
    pub jpeg_quality: u8,
    pub face_model_path: PathBuf,
    pub hand_model_path: PathBuf,
    pub min_presence: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_size: (800, 600),
            data_dir: PathBuf::from("data"),
            landmarks_dir: PathBuf::from("landmarks"),
            poll_timeout: Duration::from_millis(1),
            window_title: "Craniofacial Landmark Capture".to_string(),
            jpeg_quality: 95,
            face_model_path: PathBuf::from("models/face_landmarks_detector.onnx"),
            hand_model_path: PathBuf::from("models/hand_landmark.onnx"),
            min_presence: 0.5,
        }
    }
}

impl SessionConfig {
    // same defaults, but artifacts land under `root`
    pub fn with_output_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            landmarks_dir: root.join("landmarks"),
            ..Self::default()
        }
    }
}
