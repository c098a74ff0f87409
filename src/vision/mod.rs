//! Leaf disease detection
//!
//! A single detection model is loaded at startup and shared by all request
//! handlers through the [`Detector`] trait. The ONNX Runtime backend lives
//! behind the `onnx` feature; pre- and post-processing are backend-agnostic
//! and live in [`yolo`].

pub mod annotate;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod yolo;

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;

pub use annotate::Annotator;

use crate::config::VisionConfig;
use crate::{Error, Result};

/// Class names used when no labels file is configured
pub const DEFAULT_LABELS: &[&str] = &[
    "Algal leaf Spot",
    "Anthracnose",
    "Healthy",
    "Leaf Blight",
    "Leaf Spot",
];

/// Box corners in pixels of the original image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.xmax - self.xmin).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.ymax - self.ymin).max(0.0)
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let inter = Self {
            xmin: self.xmin.max(other.xmin),
            ymin: self.ymin.max(other.ymin),
            xmax: self.xmax.min(other.xmax),
            ymax: self.ymax.min(other.ymax),
        }
        .area();

        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Label drawn next to the box, e.g. `Anthracnose 0.87`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {:.2}", self.class_name, self.confidence)
    }
}

/// Fixed inference parameters, set once at startup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Square model input size
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
        }
    }
}

/// An object detection model
///
/// Detections are returned in descending confidence order.
pub trait Detector: Send + Sync {
    /// Run the model on a decoded image
    ///
    /// # Errors
    ///
    /// Returns error if inference fails
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Read class names, one per line, skipping blank lines
///
/// # Errors
///
/// Returns error if the file cannot be read or holds no names
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    if labels.is_empty() {
        return Err(Error::Config(format!(
            "labels file {} is empty",
            path.display()
        )));
    }
    Ok(labels)
}

/// Class names from config, or the built-in disease classes
///
/// # Errors
///
/// Returns error if a configured labels file is unusable
pub fn labels_for(config: &VisionConfig) -> Result<Vec<String>> {
    config.labels_path.as_deref().map_or_else(
        || Ok(DEFAULT_LABELS.iter().map(|s| (*s).to_string()).collect()),
        load_labels,
    )
}

/// Load the configured detection model
///
/// # Errors
///
/// Returns error if the model or labels cannot be loaded, or the crate was
/// built without an inference backend
#[cfg(feature = "onnx")]
pub fn load_detector(config: &VisionConfig) -> Result<Arc<dyn Detector>> {
    let labels = labels_for(config)?;
    let detector = onnx::OnnxDetector::load(&config.model_path, labels, DetectorParams::default())?;
    Ok(Arc::new(detector))
}

/// Load the configured detection model
///
/// # Errors
///
/// Always fails: the crate was built without the `onnx` feature
#[cfg(not(feature = "onnx"))]
pub fn load_detector(config: &VisionConfig) -> Result<Arc<dyn Detector>> {
    Err(Error::Config(format!(
        "cannot load {}: built without the `onnx` feature",
        config.model_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> BoundingBox {
        BoundingBox {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(20.0, 20.0, 30.0, 30.0);
        assert!(a.iou(&b).abs() < f32::EPSILON);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn label_has_two_decimals() {
        let d = Detection {
            class_id: 1,
            class_name: "Anthracnose".to_string(),
            confidence: 0.8765,
            bbox: bbox(0.0, 0.0, 1.0, 1.0),
        };
        assert_eq!(d.label(), "Anthracnose 0.88");
    }

    #[test]
    fn loads_labels_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "Healthy\n\n Leaf Spot \n").unwrap();

        let labels = load_labels(&path).unwrap();
        assert_eq!(labels, vec!["Healthy", "Leaf Spot"]);
    }

    #[test]
    fn rejects_empty_labels_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(load_labels(&path).is_err());
    }

    #[test]
    fn default_labels_without_file() {
        let config = VisionConfig {
            model_path: "yolov5s.onnx".into(),
            labels_path: None,
            font_path: None,
        };
        let labels = labels_for(&config).unwrap();
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0], "Algal leaf Spot");
    }

    #[test]
    fn missing_checkpoint_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = VisionConfig {
            model_path: dir.path().join("missing.onnx"),
            labels_path: None,
            font_path: None,
        };
        assert!(load_detector(&config).is_err());
    }
}
