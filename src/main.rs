use landmark_capture::command::HELP;
use landmark_capture::landmarks::model_mediapipe::MediapipeHolisticModel;
use landmark_capture::webcam::Webcam;
use landmark_capture::window::WindowDisplay;
use landmark_capture::{CaptureSession, SessionConfig};

fn main() -> anyhow::Result<()> {
    // log to stderr, `RUST_LOG=debug` for more
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SessionConfig::default();

    let detector = MediapipeHolisticModel::new(
        &config.face_model_path,
        &config.hand_model_path,
        config.min_presence,
    )?;
    let camera = Webcam::open(config.device_index)?;
    let window = WindowDisplay::new(
        &config.window_title,
        config.frame_size.0 as usize,
        config.frame_size.1 as usize,
    )?;

    let mut session = CaptureSession::new(&config, camera, detector, window)?;

    println!("{}", HELP);

    session.run()?;
    Ok(())
}
