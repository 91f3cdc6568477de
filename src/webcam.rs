// thin wrapper around nokhwa
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

use crate::error::{Error, Result};

/// A live source of color frames.
pub trait FrameSource {
    /// Blocks until the next frame is available. An error means the stream is over.
    fn read(&mut self) -> Result<RgbImage>;

    /// Gives the device back. Must be safe to call more than once.
    fn release(&mut self);
}

pub struct Webcam {
    camera: Option<Camera>,
}

impl Webcam {
    pub fn open(device_index: u32) -> Result<Self> {
        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        log::info!("opening camera {} with format {:?}", index, requested);
        let mut camera = Camera::new(index, requested)?;
        camera.open_stream()?;

        log::info!(
            "opened {} ({}, {:?})",
            camera.info().human_name(),
            camera.resolution(),
            camera.frame_format()
        );

        Ok(Self {
            camera: Some(camera),
        })
    }
}

impl FrameSource for Webcam {
    fn read(&mut self) -> Result<RgbImage> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| Error::Acquisition("camera already released".to_string()))?;

        let frame = camera
            .frame()
            .map_err(|e| Error::Acquisition(e.to_string()))?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Acquisition(e.to_string()))
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("failed to stop camera stream: {}", e);
            }
            log::debug!("camera released");
        }
    }
}

impl Drop for Webcam {
    fn drop(&mut self) {
        self.release();
    }
}
