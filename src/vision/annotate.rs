//! Drawing detections onto images

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use super::Detection;

/// Ultralytics colour palette, indexed by class id
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// DejaVu Sans, used when no label font is configured
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Box outline width in pixels
pub const LINE_WIDTH: u32 = 3;

/// Colour for a class
#[must_use]
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draws boxes and `name confidence` labels
pub struct Annotator {
    font: Option<FontArc>,
    line_width: u32,
}

impl Annotator {
    #[must_use]
    pub const fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            line_width: LINE_WIDTH,
        }
    }

    /// Build an annotator with the configured label font, falling back to the
    /// bundled one
    ///
    /// A font that cannot be used is not fatal: boxes are still drawn.
    #[must_use]
    pub fn load(font_path: Option<&Path>) -> Self {
        let font = font_path.and_then(load_font_file).or_else(bundled_font);
        if font.is_none() {
            tracing::warn!("no label font available, annotations will carry boxes only");
        }
        Self::new(font)
    }

    /// Whether labels will carry text
    #[must_use]
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw detections on a copy of `image`
    #[must_use]
    pub fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for detection in detections {
            self.draw_detection(&mut canvas, detection);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let color = class_color(detection.class_id);
        let (img_w, img_h) = canvas.dimensions();

        let x0 = detection.bbox.xmin.round() as i32;
        let y0 = detection.bbox.ymin.round() as i32;
        let x1 = (detection.bbox.xmax.round() as i32).min(img_w as i32);
        let y1 = (detection.bbox.ymax.round() as i32).min(img_h as i32);

        for t in 0..self.line_width as i32 {
            let w = x1 - x0 - 2 * t;
            let h = y1 - y0 - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(x0 + t, y0 + t).of_size(w as u32, h as u32),
                color,
            );
        }

        let Some(font) = &self.font else {
            return;
        };

        let scale = PxScale::from(font_size(img_w, img_h));
        let label = detection.label();
        let (text_w, text_h) = text_size(scale, font, &label);
        let tab_h = text_h + 2 * self.line_width;

        // Tab above the box when it fits, inside otherwise
        let tab_y = if y0 >= tab_h as i32 { y0 - tab_h as i32 } else { y0 };
        draw_filled_rect_mut(
            canvas,
            Rect::at(x0, tab_y).of_size(text_w + 2 * self.line_width, tab_h),
            color,
        );
        draw_text_mut(
            canvas,
            TEXT_COLOR,
            x0 + self.line_width as i32,
            tab_y + self.line_width as i32,
            scale,
            font,
            &label,
        );
    }
}

fn load_font_file(path: &Path) -> Option<FontArc> {
    let loaded = std::fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| FontArc::try_from_vec(bytes).map_err(|e| e.to_string()));

    match loaded {
        Ok(font) => {
            tracing::info!(path = %path.display(), "loaded label font");
            Some(font)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load label font, using bundled font");
            None
        }
    }
}

fn bundled_font() -> Option<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map_err(|e| tracing::warn!(error = %e, "bundled label font is unusable"))
        .ok()
}

/// Label font size scaled to the image
fn font_size(width: u32, height: u32) -> f32 {
    ((width + height) as f32 / 2.0 * 0.035).round().max(12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    fn detection(class_id: usize, bbox: BoundingBox) -> Detection {
        Detection {
            class_id,
            class_name: "Healthy".to_string(),
            confidence: 0.9,
            bbox,
        }
    }

    #[test]
    fn draws_box_outline_in_class_color() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0])));
        let annotator = Annotator::new(None);

        let out = annotator.annotate(
            &image,
            &[detection(
                2,
                BoundingBox {
                    xmin: 10.0,
                    ymin: 10.0,
                    xmax: 60.0,
                    ymax: 60.0,
                },
            )],
        );

        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(*out.get_pixel(10, 30), class_color(2));
        assert_eq!(*out.get_pixel(12, 30), class_color(2));
        // interior untouched
        assert_eq!(*out.get_pixel(35, 35), Rgb([0, 0, 0]));
        // original untouched
        assert_eq!(image.to_rgb8().get_pixel(10, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_box_is_skipped() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let out = Annotator::new(None).annotate(
            &image,
            &[detection(
                0,
                BoundingBox {
                    xmin: 5.0,
                    ymin: 5.0,
                    xmax: 5.0,
                    ymax: 5.0,
                },
            )],
        );
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(class_color(0), class_color(20));
        assert_ne!(class_color(0), class_color(1));
    }

    #[test]
    fn missing_font_falls_back_to_bundled() {
        let annotator = Annotator::load(Some(Path::new("/nonexistent/font.ttf")));
        assert!(annotator.has_font());
    }

    #[test]
    fn default_annotator_has_a_font() {
        assert!(Annotator::load(None).has_font());
    }

    fn anthracnose(bbox: BoundingBox) -> Detection {
        Detection {
            class_id: 1,
            class_name: "Anthracnose".to_string(),
            confidence: 0.87,
            bbox,
        }
    }

    #[test]
    fn label_is_drawn_above_the_box() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(200, 200));
        let out = Annotator::load(None).annotate(
            &image,
            &[anthracnose(BoundingBox {
                xmin: 50.0,
                ymin: 80.0,
                xmax: 150.0,
                ymax: 150.0,
            })],
        );

        let color = class_color(1);
        let mut tab = 0;
        let mut text = 0;
        for y in 40..80 {
            for x in 50..150 {
                let p = *out.get_pixel(x, y);
                if p == color {
                    tab += 1;
                } else if p != Rgb([0, 0, 0]) {
                    text += 1;
                }
            }
        }
        assert!(tab > 0, "no label tab above the box");
        assert!(text > 0, "no label text in the tab");
        // nothing left of the box
        assert!((0..50).all(|x| *out.get_pixel(x, 70) == Rgb([0, 0, 0])));
    }

    #[test]
    fn label_fits_when_box_touches_the_edges() {
        let full = BoundingBox {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 30.0,
            ymax: 30.0,
        };
        let out = Annotator::load(None).annotate(
            &DynamicImage::ImageRgb8(RgbImage::new(30, 30)),
            &[anthracnose(full)],
        );
        assert_eq!(out.dimensions(), (30, 30));
        assert_eq!(*out.get_pixel(0, 15), class_color(1));
    }

    #[test]
    fn font_size_has_floor() {
        assert!((font_size(100, 100) - 12.0).abs() < f32::EPSILON);
        assert!((font_size(1280, 720) - 35.0).abs() < f32::EPSILON);
    }
}
