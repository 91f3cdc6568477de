use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("camera error: {0}")]
    Camera(#[from] nokhwa::NokhwaError),
    #[error("failed to grab frame: {0}")]
    Acquisition(String),
    #[error("display error: {0}")]
    Display(#[from] minifb::Error),
    #[error("model error: {0}")]
    Model(#[from] ort::OrtError),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to encode landmarks: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
