use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use rusttype::{Font, Scale};

use crate::landmarks::{LandmarkSet, Region};

// fonts tried, in order, for the FPS label
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const FPS_SIZE: f32 = 32.0;
// where the label's baseline starts
const FPS_ORIGIN: (i32, i32) = (10, 50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingSpec {
    pub color: Rgb<u8>,
    pub thickness: u32,
    pub circle_radius: u32,
}

/// How one region is drawn: its points, and the polylines connecting them.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub landmark: DrawingSpec,
    pub connection: DrawingSpec,
    pub polylines: &'static [&'static [usize]],
}

impl OverlayStyle {
    pub fn for_region(region: Region) -> Self {
        match region {
            Region::Face => Self {
                landmark: DrawingSpec {
                    color: Rgb([255, 0, 255]),
                    thickness: 1,
                    circle_radius: 1,
                },
                connection: DrawingSpec {
                    color: Rgb([255, 255, 0]),
                    thickness: 1,
                    circle_radius: 1,
                },
                polylines: FACE_CONTOURS,
            },
            Region::LeftHand | Region::RightHand => Self {
                landmark: DrawingSpec {
                    color: Rgb([255, 0, 0]),
                    thickness: 2,
                    circle_radius: 2,
                },
                connection: DrawingSpec {
                    color: Rgb([224, 224, 224]),
                    thickness: 2,
                    circle_radius: 2,
                },
                polylines: HAND_CONNECTIONS,
            },
        }
    }
}

/// Draws landmarks and the frame rate onto frames.
pub struct OverlayRenderer {
    font: Option<Font<'static>>,
    warned: bool,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRenderer {
    /// Looks for a usable system font for the FPS label.
    pub fn new() -> Self {
        let font = FONT_CANDIDATES.iter().find_map(|p| {
            let path = Path::new(p);
            let font = Font::try_from_vec(fs::read(path).ok()?)?;
            log::debug!("loaded font from {}", path.display());
            Some(font)
        });

        Self { font, warned: false }
    }

    /// A renderer that draws landmarks but no text.
    pub fn without_font() -> Self {
        Self {
            font: None,
            warned: true,
        }
    }

    pub fn draw(&self, frame: &mut RgbImage, landmarks: &LandmarkSet, style: &OverlayStyle) {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let to_pixel = |i: usize| {
            landmarks
                .points()
                .get(i)
                .map(|p| (p.x * w, p.y * h))
        };

        // connections first so the points stay visible on top
        for polyline in style.polylines {
            for pair in polyline.windows(2) {
                if let (Some(a), Some(b)) = (to_pixel(pair[0]), to_pixel(pair[1])) {
                    draw_thick_line(frame, a, b, &style.connection);
                }
            }
        }

        for p in landmarks.points() {
            draw_filled_circle_mut(
                frame,
                ((p.x * w) as i32, (p.y * h) as i32),
                style.landmark.circle_radius as i32,
                style.landmark.color,
            );
        }
    }

    /// Renders `"<n> FPS"`. `None` means there is no measurement yet.
    pub fn draw_fps(&mut self, frame: &mut RgbImage, fps: Option<f32>) {
        let Some(font) = &self.font else {
            if !self.warned {
                log::warn!("no usable font found, the FPS label will not be drawn");
                self.warned = true;
            }
            return;
        };

        let scale = Scale::uniform(FPS_SIZE);
        let ascent = font.v_metrics(scale).ascent;
        draw_text_mut(
            frame,
            FPS_COLOR,
            FPS_ORIGIN.0,
            FPS_ORIGIN.1 - ascent as i32,
            scale,
            font,
            &fps_label(fps),
        );
    }
}

pub fn fps_label(fps: Option<f32>) -> String {
    match fps {
        Some(fps) if fps.is_finite() => format!("{} FPS", fps as i64),
        _ => "-- FPS".to_string(),
    }
}

fn draw_thick_line(frame: &mut RgbImage, a: (f32, f32), b: (f32, f32), spec: &DrawingSpec) {
    let half = (spec.thickness.max(1) as i32 - 1) / 2;
    let extra = (spec.thickness.max(1) as i32 - 1) % 2;
    for dx in -half..=half + extra {
        for dy in -half..=half + extra {
            let (dx, dy) = (dx as f32, dy as f32);
            draw_line_segment_mut(frame, (a.0 + dx, a.1 + dy), (b.0 + dx, b.1 + dy), spec.color);
        }
    }
}

// face oval, eyebrows, eyes and lips of the 478 point face mesh
const FACE_CONTOURS: &[&[usize]] = &[
    &[
        10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
        152, 148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109, 10,
    ],
    &[70, 63, 105, 66, 107],
    &[336, 296, 334, 293, 300],
    &[
        33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246, 33,
    ],
    &[
        362, 382, 398, 384, 385, 386, 387, 388, 466, 263, 249, 390, 373, 374, 380, 381, 362,
    ],
    &[
        61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 409, 270, 269, 267, 0, 37, 39, 40, 185,
        61,
    ],
    &[
        78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308, 415, 310, 311, 312, 13, 82, 81, 80, 191,
        78,
    ],
];

// palm outline, then each finger from its base joint to the tip
const HAND_CONNECTIONS: &[&[usize]] = &[
    &[0, 1, 5, 9, 13, 17, 0],
    &[1, 2, 3, 4],
    &[5, 6, 7, 8],
    &[9, 10, 11, 12],
    &[13, 14, 15, 16],
    &[17, 18, 19, 20],
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point3;

    #[test]
    fn fps_label_truncates() {
        assert_eq!(fps_label(Some(29.9)), "29 FPS");
        assert_eq!(fps_label(None), "-- FPS");
        assert_eq!(fps_label(Some(f32::INFINITY)), "-- FPS");
    }

    #[test]
    fn draws_points_and_bones() {
        let mut frame = RgbImage::new(200, 100);
        // points 9 pixels apart along y = 50
        let hand = LandmarkSet::from_points(
            (0..21)
                .map(|i| Point3::new(0.05 + i as f32 * 0.045, 0.5, 0.0))
                .collect(),
        );
        let style = OverlayStyle::for_region(Region::LeftHand);
        OverlayRenderer::without_font().draw(&mut frame, &hand, &style);

        assert_eq!(frame.get_pixel(10, 50), &Rgb([255, 0, 0]));
        // between points 2 and 3, out of reach of either circle
        assert_eq!(frame.get_pixel(32, 50), &Rgb([224, 224, 224]));
        assert_eq!(frame.get_pixel(100, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn out_of_range_connections_are_skipped() {
        let mut frame = RgbImage::new(50, 50);
        // a face set far shorter than the contour indices
        let face = LandmarkSet::from_points(vec![Point3::new(0.5, 0.5, 0.0)]);
        let style = OverlayStyle::for_region(Region::Face);
        OverlayRenderer::without_font().draw(&mut frame, &face, &style);
        assert_eq!(frame.get_pixel(25, 25), &Rgb([255, 0, 255]));
    }

    #[test]
    fn missing_font_skips_label() {
        let mut frame = RgbImage::new(200, 80);
        let mut renderer = OverlayRenderer::without_font();
        renderer.draw_fps(&mut frame, Some(30.0));
        assert!(frame.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }
}
