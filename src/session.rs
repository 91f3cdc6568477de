use std::time::Duration;

use image::{imageops::FilterType, RgbImage};

use crate::command::Command;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::fps::FpsMeter;
use crate::landmarks::{Detections, FrameSnapshot, LandmarkDetector};
use crate::overlay::{OverlayRenderer, OverlayStyle};
use crate::store::{CaptureStore, FrameCounter};
use crate::webcam::FrameSource;
use crate::window::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The interactive capture loop.
///
/// Owns the camera and the window for its whole lifetime and gives both back when it ends,
/// whichever way that happens.
pub struct CaptureSession<S: FrameSource, M: LandmarkDetector, D: Display> {
    source: S,
    detector: M,
    display: D,
    renderer: OverlayRenderer,
    store: CaptureStore,
    counter: FrameCounter,
    fps: FpsMeter,
    frame_size: (u32, u32),
    poll_timeout: Duration,
}

impl<S: FrameSource, M: LandmarkDetector, D: Display> CaptureSession<S, M, D> {
    /// Sets up a session and creates the output directories.
    pub fn new(config: &SessionConfig, source: S, detector: M, display: D) -> Result<Self> {
        let store = CaptureStore::new(&config.data_dir, &config.landmarks_dir, config.jpeg_quality);
        store.prepare()?;

        Ok(Self {
            source,
            detector,
            display,
            renderer: OverlayRenderer::new(),
            store,
            counter: FrameCounter::new(),
            fps: FpsMeter::new(),
            frame_size: config.frame_size,
            poll_timeout: config.poll_timeout,
        })
    }

    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn counter(&self) -> FrameCounter {
        self.counter
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Runs until the operator quits or a frame can't be read.
    pub fn run(&mut self) -> Result<()> {
        log::info!("capture session started");

        let result = loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break Ok(()),
                Err(e) => {
                    log::error!("capture session stopped: {}", e);
                    break Err(e);
                }
            }
        };

        log::debug!(
            "session ended after {} frames, {:.1} FPS on average",
            self.fps.frames(),
            self.fps.mean().unwrap_or(0.0)
        );
        self.release();
        result
    }

    /// One iteration: read, detect, draw, show, then handle at most one command.
    pub fn step(&mut self) -> Result<Flow> {
        let frame = self.source.read()?;
        let snapshot = self.process(frame);

        self.display.show(&snapshot.frame)?;

        Ok(match self.display.poll_command(self.poll_timeout) {
            Some(command) => self.dispatch(command, &snapshot),
            None => Flow::Continue,
        })
    }

    fn process(&mut self, frame: RgbImage) -> FrameSnapshot {
        let (width, height) = self.frame_size;
        let mut frame = if frame.dimensions() == (width, height) {
            frame
        } else {
            image::imageops::resize(&frame, width, height, FilterType::Triangle)
        };

        let detections = match self.detector.infer(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("landmark detection failed: {}", e);
                Detections::default()
            }
        };

        // fixed order, later regions draw over earlier ones
        for (region, landmarks) in detections.present() {
            self.renderer
                .draw(&mut frame, landmarks, &OverlayStyle::for_region(region));
        }

        let fps = self.fps.tick();
        self.renderer.draw_fps(&mut frame, fps);

        FrameSnapshot { frame, detections }
    }

    /// Carries out a command against the current frame. Write failures are logged and the
    /// session goes on.
    pub fn dispatch(&mut self, command: Command, snapshot: &FrameSnapshot) -> Flow {
        match command {
            Command::Capture => {
                if let Err(e) = self.store.capture(&snapshot.frame, &self.counter) {
                    log::error!("failed to capture image: {}", e);
                }
                Flow::Continue
            }
            Command::SaveLandmarks => {
                if let Err(e) = self.store.save_landmarks(&snapshot.detections, &mut self.counter) {
                    log::error!("failed to save landmarks: {}", e);
                }
                Flow::Continue
            }
            Command::Quit => Flow::Quit,
        }
    }

    fn release(&mut self) {
        self.source.release();
        self.display.close();
    }
}

impl<S: FrameSource, M: LandmarkDetector, D: Display> Drop for CaptureSession<S, M, D> {
    fn drop(&mut self) {
        self.release();
    }
}
