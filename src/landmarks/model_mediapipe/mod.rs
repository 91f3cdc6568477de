use std::path::Path;
use std::sync::Arc;

use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, CowArray};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, ExecutionProvider, Session, SessionBuilder, Value};

use crate::error::{Error, Result};
use crate::landmarks::{Detections, LandmarkDetector, LandmarkSet, Point3, Region};

const FACE_INPUT_SIZE: u32 = 256;
const HAND_INPUT_SIZE: u32 = 224;

// padding added around the tracked face before cropping, relative to its width
const FACE_PADDING: f32 = 0.25;

/// A rectangle on the working frame: (x, y, width, height) in pixels.
type Roi = (u32, u32, u32, u32);

/// Face mesh + hand landmark networks run through ONNX Runtime.
///
/// The face network follows the face between frames: when it is confident, the next crop is
/// taken around the landmarks it just produced. Otherwise it falls back to the largest centered
/// square of the frame. The hand network is optional.
pub struct MediapipeHolisticModel {
    face_session: Session,
    hand_session: Option<Session>,
    face_roi: Option<Roi>,
    min_presence: f32,
}

impl MediapipeHolisticModel {
    pub fn new(face_model: &Path, hand_model: &Path, min_presence: f32) -> Result<Self> {
        let environment = Environment::builder()
            .with_name("landmark-capture")
            .with_execution_providers([ExecutionProvider::CPU(Default::default())])
            .build()?
            .into_arc();

        let face_session = load_session(&environment, face_model)?;

        let hand_session = if hand_model.exists() {
            Some(load_session(&environment, hand_model)?)
        } else {
            log::warn!(
                "hand landmark model {} not found, only faces will be detected",
                hand_model.display()
            );
            None
        };

        Ok(Self {
            face_session,
            hand_session,
            face_roi: None,
            min_presence,
        })
    }

    fn infer_face(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        let crop = face_crop(self.face_roi, frame);

        let outputs = run_on_crop(&self.face_session, frame, crop, FACE_INPUT_SIZE)?;
        let face_flag = sigmoid(outputs.get(1).and_then(|o| o.first().copied()).unwrap_or(f32::MIN));

        if face_flag <= self.min_presence {
            // lost it, search the whole frame again next time
            self.face_roi = None;
            return Ok(None);
        }

        let landmarks = to_frame_coords(landmark_tensor(&outputs)?, FACE_INPUT_SIZE, crop, frame);
        self.face_roi = roi_around(&landmarks, frame);
        Ok(Some(landmarks))
    }

    fn infer_hand(&self, frame: &RgbImage) -> Result<Option<(Region, LandmarkSet)>> {
        let Some(session) = &self.hand_session else {
            return Ok(None);
        };

        let crop = centered_square(frame);
        let outputs = run_on_crop(session, frame, crop, HAND_INPUT_SIZE)?;
        let presence = outputs.get(1).and_then(|o| o.first().copied()).unwrap_or(0.0);
        if presence <= self.min_presence {
            return Ok(None);
        }

        let handedness = outputs.get(2).and_then(|o| o.first().copied()).unwrap_or(0.0);
        let region = if handedness > 0.5 {
            Region::RightHand
        } else {
            Region::LeftHand
        };

        Ok(Some((
            region,
            to_frame_coords(landmark_tensor(&outputs)?, HAND_INPUT_SIZE, crop, frame),
        )))
    }
}

impl LandmarkDetector for MediapipeHolisticModel {
    fn infer(&mut self, frame: &RgbImage) -> Result<Detections> {
        let mut detections = Detections::default();

        if let Some(face) = self.infer_face(frame)? {
            detections.set(Region::Face, face);
        }
        if let Some((region, hand)) = self.infer_hand(frame)? {
            detections.set(region, hand);
        }

        Ok(detections)
    }
}

fn load_session(environment: &Arc<Environment>, path: &Path) -> Result<Session> {
    log::info!("loading landmark model {}", path.display());
    let session = SessionBuilder::new(environment)?
        .with_intra_threads(5)?
        .with_model_from_file(path)?;
    Ok(session)
}

// crops `roi` out of the frame, resizes it to the network input and returns every output
// tensor flattened
fn run_on_crop(session: &Session, frame: &RgbImage, roi: Roi, input_size: u32) -> Result<Vec<Vec<f32>>> {
    let crop = image::imageops::crop_imm(frame, roi.0, roi.1, roi.2, roi.3).to_image();
    let input = image::imageops::resize(&crop, input_size, input_size, FilterType::Nearest);

    let input: Vec<f32> = input
        .pixels()
        .flat_map(|p| p.0)
        .map(|p| p as f32 / 255.0)
        .collect();

    let array: CowArray<_, _> =
        Array::from_shape_vec((1, input_size as usize, input_size as usize, 3), input)?
            .into_dyn()
            .into();

    let inputs = vec![Value::from_array(session.allocator(), &array)?];
    let outputs: Vec<Value> = session.run(inputs)?;

    let mut flattened = Vec::with_capacity(outputs.len());
    for output in outputs.iter() {
        let tensor: OrtOwnedTensor<f32, _> = output.try_extract()?;
        flattened.push(tensor.view().iter().copied().collect());
    }
    Ok(flattened)
}

fn landmark_tensor(outputs: &[Vec<f32>]) -> Result<&[f32]> {
    outputs
        .first()
        .map(Vec::as_slice)
        .ok_or_else(|| Error::Inference("model returned no landmark tensor".to_string()))
}

// maps raw network coordinates (pixels of the input square) back to coordinates normalized to
// the whole frame
fn to_frame_coords(raw: &[f32], input_size: u32, crop: Roi, frame: &RgbImage) -> LandmarkSet {
    let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);
    let scale_x = crop.2 as f32 / input_size as f32;
    let scale_y = crop.3 as f32 / input_size as f32;

    LandmarkSet::from_points(
        raw.chunks_exact(3)
            .map(|p| {
                Point3::new(
                    (p[0] * scale_x + crop.0 as f32) / frame_w,
                    (p[1] * scale_y + crop.1 as f32) / frame_h,
                    p[2] * scale_x / frame_w,
                )
            })
            .collect(),
    )
}

// square box around the landmarks, in frame pixels
fn roi_around(landmarks: &LandmarkSet, frame: &RgbImage) -> Option<Roi> {
    if landmarks.is_empty() {
        return None;
    }

    let mut x_min = f32::MAX;
    let mut y_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_max = f32::MIN;

    for p in landmarks.points() {
        x_min = x_min.min(p.x);
        y_min = y_min.min(p.y);
        x_max = x_max.max(p.x);
        y_max = y_max.max(p.y);
    }

    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let (x_min, x_max) = (x_min * w, x_max * w);
    let (y_min, y_max) = (y_min * h, y_max * h);

    let size = (x_max - x_min).max(y_max - y_min);
    let center = ((x_min + x_max) / 2.0, (y_min + y_max) / 2.0);

    let roi = fit_to_frame(
        (center.0 - size / 2.0) as i32,
        (center.1 - size / 2.0) as i32,
        size as i32,
        size as i32,
        frame.width(),
        frame.height(),
    );
    (roi.2 > 0 && roi.3 > 0).then_some(roi)
}

// the tracked face plus padding, or the centered square when nothing is tracked
fn face_crop(tracked: Option<Roi>, frame: &RgbImage) -> Roi {
    let roi = tracked.unwrap_or_else(|| centered_square(frame));
    let padding = FACE_PADDING * roi.2 as f32;
    fit_to_frame(
        (roi.0 as f32 - padding) as i32,
        (roi.1 as f32 - padding) as i32,
        (roi.2 as f32 + 2.0 * padding) as i32,
        (roi.3 as f32 + 2.0 * padding) as i32,
        frame.width(),
        frame.height(),
    )
}

fn centered_square(frame: &RgbImage) -> Roi {
    let side = frame.width().min(frame.height());
    ((frame.width() - side) / 2, (frame.height() - side) / 2, side, side)
}

// scales a box down around its center until it fits the frame, then slides it back inside
fn fit_to_frame(x: i32, y: i32, w: i32, h: i32, image_w: u32, image_h: u32) -> Roi {
    if w <= 0 || h <= 0 || image_w == 0 || image_h == 0 {
        return (0, 0, image_w, image_h);
    }

    let (w, h) = (w as f32, h as f32);
    let center = (x as f32 + w / 2.0, y as f32 + h / 2.0);

    let scale = (image_w as f32 / w).min(image_h as f32 / h).min(1.0);
    let w = ((w * scale) as u32).clamp(1, image_w);
    let h = ((h * scale) as u32).clamp(1, image_h);

    let x = (center.0 - w as f32 / 2.0).clamp(0.0, (image_w - w) as f32);
    let y = (center.1 - h as f32 / 2.0).clamp(0.0, (image_h - h) as f32);

    (x as u32, y as u32, w, h)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centered_square_uses_short_side() {
        let frame = RgbImage::new(800, 600);
        assert_eq!(centered_square(&frame), (100, 0, 600, 600));
    }

    #[test]
    fn fit_to_frame_slides_boxes_back_inside() {
        let roi = fit_to_frame(-50, -50, 300, 300, 800, 600);
        assert_eq!(roi, (0, 0, 300, 300));

        let roi = fit_to_frame(700, 500, 300, 300, 800, 600);
        assert_eq!(roi, (500, 300, 300, 300));
    }

    #[test]
    fn fit_to_frame_shrinks_around_the_center() {
        let roi = fit_to_frame(-50, -150, 900, 900, 800, 600);
        assert_eq!(roi, (100, 0, 600, 600));

        // wide box keeps its aspect ratio
        let roi = fit_to_frame(0, 200, 1600, 200, 800, 600);
        assert_eq!(roi, (0, 250, 800, 100));
    }

    #[test]
    fn untracked_face_is_searched_in_the_middle() {
        let frame = RgbImage::new(800, 600);
        assert_eq!(face_crop(None, &frame), (100, 0, 600, 600));

        // right edge of the frame stays reachable once tracked
        assert_eq!(face_crop(Some((600, 200, 160, 160)), &frame), (560, 160, 240, 240));
    }

    #[test]
    fn raw_coordinates_map_back_to_frame() {
        let frame = RgbImage::new(800, 600);
        let crop = (100, 0, 600, 600);
        let set = to_frame_coords(&[128.0, 128.0, 12.8, 0.0, 256.0, 0.0], 256, crop, &frame);

        assert_relative_eq!(set.points()[0].x, 0.5);
        assert_relative_eq!(set.points()[0].y, 0.5);
        assert_relative_eq!(set.points()[0].z, 12.8 * 600.0 / 256.0 / 800.0);
        assert_relative_eq!(set.points()[1].x, 0.125);
        assert_relative_eq!(set.points()[1].y, 1.0);
    }

    #[test]
    fn roi_follows_landmarks() {
        let frame = RgbImage::new(800, 600);
        let set = LandmarkSet::from_points(vec![
            Point3::new(0.25, 0.25, 0.0),
            Point3::new(0.5, 0.5, 0.0),
        ]);
        // 200x150 pixel extent, squared up around its center (300, 225)
        assert_eq!(roi_around(&set, &frame), Some((200, 125, 200, 200)));
        assert_eq!(roi_around(&LandmarkSet::default(), &frame), None);
    }

    #[test]
    fn missing_landmark_tensor_is_an_error() {
        assert!(matches!(landmark_tensor(&[]), Err(Error::Inference(_))));
        assert_eq!(landmark_tensor(&[vec![1.0, 2.0, 3.0]]).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn sigmoid_is_centered() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(8.0) > 0.99);
    }
}
