use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::landmarks::{Detections, LandmarkPoint, LandmarkSet};

/// Numbers the files written during a session.
///
/// Starts at 0 and only ever moves forward, one step per save command. Captures read it but
/// never advance it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter(u64);

impl FrameCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    // returns the value before the increment
    fn advance(&mut self) -> u64 {
        let current = self.0;
        self.0 += 1;
        current
    }
}

/// The on-disk form of one save command.
#[derive(Debug, Serialize)]
pub struct LandmarkRecord {
    pub face: Vec<LandmarkPoint>,
    pub left_hand: Vec<LandmarkPoint>,
    pub right_hand: Vec<LandmarkPoint>,
}

impl LandmarkRecord {
    pub fn from_detections(detections: &Detections) -> Self {
        let records = |set: Option<&LandmarkSet>| {
            set.map(|s| s.to_records()).unwrap_or_default()
        };
        Self {
            face: records(detections.face.as_ref()),
            left_hand: records(detections.left_hand.as_ref()),
            right_hand: records(detections.right_hand.as_ref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.face.is_empty() && self.left_hand.is_empty() && self.right_hand.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    NothingDetected,
}

/// Writes captured frames and landmark snapshots under two directories.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    data_dir: PathBuf,
    landmarks_dir: PathBuf,
    jpeg_quality: u8,
}

impl CaptureStore {
    pub fn new(data_dir: impl Into<PathBuf>, landmarks_dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            data_dir: data_dir.into(),
            landmarks_dir: landmarks_dir.into(),
            jpeg_quality,
        }
    }

    /// Creates both output directories if they don't exist yet.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.landmarks_dir] {
            fs::create_dir_all(dir).map_err(Error::io(dir))?;
        }
        Ok(())
    }

    pub fn image_path(&self, n: u64) -> PathBuf {
        self.data_dir.join(format!("frame_{}.jpg", n))
    }

    pub fn landmarks_path(&self, n: u64) -> PathBuf {
        self.landmarks_dir.join(format!("frame_{}.json", n))
    }

    /// Writes `frame` to `data/frame_<counter>.jpg`, replacing any earlier capture with the same
    /// number.
    pub fn capture(&self, frame: &RgbImage, counter: &FrameCounter) -> Result<PathBuf> {
        let path = self.image_path(counter.value());
        let file = File::create(&path).map_err(Error::io(&path))?;
        let mut writer = BufWriter::new(file);

        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).encode_image(frame)?;
        writer.flush().map_err(Error::io(&path))?;

        log::info!("Captured {}", path.display());
        Ok(path)
    }

    /// Writes the detected landmarks to `landmarks/frame_<counter>.json`.
    ///
    /// The counter advances on every call, also when nothing was detected and no file is
    /// written, and also when the write fails.
    pub fn save_landmarks(&self, detections: &Detections, counter: &mut FrameCounter) -> Result<SaveOutcome> {
        let n = counter.advance();
        let record = LandmarkRecord::from_detections(detections);

        if record.is_empty() {
            log::warn!("No landmarks detected for this frame.");
            return Ok(SaveOutcome::NothingDetected);
        }

        let path = self.landmarks_path(n);
        write_json(&path, &record)?;

        log::info!("Saved landmarks to {}", path.display());
        Ok(SaveOutcome::Written(path))
    }
}

fn write_json(path: &Path, record: &LandmarkRecord) -> Result<()> {
    let file = File::create(path).map_err(Error::io(path))?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    record.serialize(&mut serializer)?;

    writer.flush().map_err(Error::io(path))?;
    Ok(())
}
