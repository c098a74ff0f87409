//! YOLOv5 pre- and post-processing
//!
//! Input: letterboxed RGB, CHW, scaled to `[0, 1]`.
//! Output: `[1, N, 5 + nc]` rows of `[cx, cy, w, h, obj, cls...]` in input
//! pixel space.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use super::{BoundingBox, Detection, DetectorParams};
use crate::{Error, Result};

/// Letterbox padding colour
const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Candidates considered by NMS at most
const MAX_NMS_CANDIDATES: usize = 30_000;

/// Mapping from model input space back to the original image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// Map an input-space box to original pixels, clipped to the image
    #[must_use]
    pub fn restore(&self, bbox: BoundingBox) -> BoundingBox {
        let w = self.orig_width as f32;
        let h = self.orig_height as f32;
        BoundingBox {
            xmin: ((bbox.xmin - self.pad_x) / self.scale).clamp(0.0, w),
            ymin: ((bbox.ymin - self.pad_y) / self.scale).clamp(0.0, h),
            xmax: ((bbox.xmax - self.pad_x) / self.scale).clamp(0.0, w),
            ymax: ((bbox.ymax - self.pad_y) / self.scale).clamp(0.0, h),
        }
    }
}

/// Resize keeping aspect ratio and pad to a `size`×`size` square
#[must_use]
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (w, h) = image.dimensions();
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);

    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);

    let pad_x = (size - new_w) as f32 / 2.0;
    let pad_y = (size - new_h) as f32 / 2.0;
    let left = (pad_x - 0.1).round().max(0.0);
    let top = (pad_y - 0.1).round().max(0.0);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, PAD_COLOR);
    imageops::overlay(&mut canvas, &resized, i64::from(left as u32), i64::from(top as u32));

    (
        canvas,
        Letterbox {
            scale,
            pad_x: left,
            pad_y: top,
            orig_width: w,
            orig_height: h,
        },
    )
}

/// Flatten an RGB image to planar `[3, H, W]` floats in `[0, 1]`
#[must_use]
pub fn to_chw(image: &RgbImage) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0.0_f32; plane * 3];

    for (i, pixel) in image.pixels().enumerate() {
        for c in 0..3 {
            data[c * plane + i] = f32::from(pixel[c]) / 255.0;
        }
    }
    data
}

/// Turn raw model output into final detections
///
/// `data` holds `rows` × `cols` floats. Detections come back sorted by
/// descending confidence, in original image pixels.
///
/// # Errors
///
/// Returns error if the tensor is too narrow to hold a YOLOv5 row
pub fn decode(
    data: &[f32],
    rows: usize,
    cols: usize,
    params: &DetectorParams,
    letterbox: &Letterbox,
    labels: &[String],
) -> Result<Vec<Detection>> {
    if cols < 6 {
        return Err(Error::Vision(format!(
            "unexpected output width {cols}, expected 5 + classes"
        )));
    }
    if data.len() < rows * cols {
        return Err(Error::Vision(format!(
            "output holds {} values, expected {}",
            data.len(),
            rows * cols
        )));
    }

    let mut candidates: Vec<Detection> = data
        .chunks_exact(cols)
        .take(rows)
        .filter_map(|row| decode_row(row, params.conf_threshold, labels))
        .collect();

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(MAX_NMS_CANDIDATES);

    let mut kept = non_max_suppression(candidates, params.iou_threshold);
    kept.truncate(params.max_detections);

    for detection in &mut kept {
        detection.bbox = letterbox.restore(detection.bbox);
    }
    Ok(kept)
}

fn decode_row(row: &[f32], conf_threshold: f32, labels: &[String]) -> Option<Detection> {
    let objectness = row[4];
    if !objectness.is_finite() || objectness <= conf_threshold {
        return None;
    }

    let (class_id, class_prob) = row[5..]
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let confidence = objectness * class_prob;
    if !confidence.is_finite() || confidence <= conf_threshold {
        return None;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    Some(Detection {
        class_id,
        class_name: labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{class_id}")),
        confidence,
        bbox: BoundingBox {
            xmin: cx - w / 2.0,
            ymin: cy - h / 2.0,
            xmax: cx + w / 2.0,
            ymax: cy + h / 2.0,
        },
    })
}

/// Greedy per-class NMS over candidates sorted by descending confidence
#[must_use]
pub fn non_max_suppression(candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::new();

    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
