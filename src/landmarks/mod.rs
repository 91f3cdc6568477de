pub mod model_mediapipe;

use image::RgbImage;
use serde::Serialize;

use crate::error::Result;

pub type Point3 = nalgebra::Point3<f32>;

/// The tracked anatomical regions, in the order they are drawn and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Face,
    LeftHand,
    RightHand,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Face, Region::LeftHand, Region::RightHand];

    pub fn name(&self) -> &'static str {
        match self {
            Region::Face => "face",
            Region::LeftHand => "left_hand",
            Region::RightHand => "right_hand",
        }
    }
}

/// One region's landmarks for one frame.
///
/// Points are normalized to the frame (`x`, `y` roughly in [0, 1]) and kept in the order the
/// model produced them; a point's id is its position in this list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point3>,
}

impl LandmarkSet {
    pub fn from_points(points: Vec<Point3>) -> Self {
        Self { points }
    }

    // construct from a flattened [x0, y0, z0, x1, ...] model output
    pub fn from_vec(points: Vec<f32>) -> Self {
        Self {
            points: points
                .chunks_exact(3)
                .map(|p| Point3::new(p[0], p[1], p[2]))
                .collect(),
        }
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_records(&self) -> Vec<LandmarkPoint> {
        self.points
            .iter()
            .enumerate()
            .map(|(id, p)| LandmarkPoint {
                id,
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .collect()
    }
}

/// A landmark as it is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandmarkPoint {
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Everything the detector found in one frame. A region the model did not find is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub face: Option<LandmarkSet>,
    pub left_hand: Option<LandmarkSet>,
    pub right_hand: Option<LandmarkSet>,
}

impl Detections {
    pub fn get(&self, region: Region) -> Option<&LandmarkSet> {
        match region {
            Region::Face => self.face.as_ref(),
            Region::LeftHand => self.left_hand.as_ref(),
            Region::RightHand => self.right_hand.as_ref(),
        }
    }

    pub fn set(&mut self, region: Region, landmarks: LandmarkSet) {
        let slot = match region {
            Region::Face => &mut self.face,
            Region::LeftHand => &mut self.left_hand,
            Region::RightHand => &mut self.right_hand,
        };
        *slot = Some(landmarks);
    }

    /// Non-empty sets in drawing order: face, left hand, right hand.
    pub fn present(&self) -> impl Iterator<Item = (Region, &LandmarkSet)> + '_ {
        Region::ALL
            .into_iter()
            .filter_map(|region| self.get(region).map(|set| (region, set)))
            .filter(|(_, set)| !set.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// A frame together with the landmarks found in it. Lives for one loop iteration.
pub struct FrameSnapshot {
    pub frame: RgbImage,
    pub detections: Detections,
}

/// Runs landmark inference on a single frame.
///
/// Implementations may keep internal tracking state between calls, but every call must return
/// the landmarks for the frame it was given.
pub trait LandmarkDetector {
    fn infer(&mut self, frame: &RgbImage) -> Result<Detections>;
}
