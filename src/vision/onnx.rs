//! ONNX Runtime backend for YOLOv5 checkpoints

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;

use super::yolo;
use super::{Detection, Detector, DetectorParams};
use crate::{Error, Result};

fn vision_err(e: impl std::fmt::Display) -> Error {
    Error::Vision(e.to_string())
}

/// YOLOv5 model exported to ONNX
pub struct OnnxDetector {
    // Running a session needs exclusive access
    session: Mutex<Session>,
    params: DetectorParams,
    labels: Vec<String>,
}

impl OnnxDetector {
    /// Load a checkpoint from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or not a loadable model
    pub fn load(model_path: &Path, labels: Vec<String>, params: DetectorParams) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::Vision(format!(
                "model checkpoint not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(vision_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(vision_err)?
            .commit_from_file(model_path)
            .map_err(|e| {
                Error::Vision(format!(
                    "failed to load model {}: {e}",
                    model_path.display()
                ))
            })?;

        tracing::info!(
            path = %model_path.display(),
            classes = labels.len(),
            input_size = params.input_size,
            "detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            params,
            labels,
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let size = self.params.input_size;
        let (boxed, letterbox) = yolo::letterbox(&image.to_rgb8(), size);
        let chw = yolo::to_chw(&boxed);

        let side = size as usize;
        let input = Tensor::from_array(([1_usize, 3, side, side], chw.into_boxed_slice()))
            .map_err(vision_err)?;

        // Copy the output out so the session lock is released before decoding
        let (dims, data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| Error::Vision("model session lock poisoned".to_string()))?;
            let outputs = session.run(ort::inputs![input]).map_err(vision_err)?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(vision_err)?;
            (shape.iter().copied().collect::<Vec<i64>>(), data.to_vec())
        };

        let [_, rows, cols] = dims.as_slice() else {
            return Err(Error::Vision(format!("unexpected output shape {dims:?}")));
        };
        let rows = usize::try_from(*rows).map_err(vision_err)?;
        let cols = usize::try_from(*cols).map_err(vision_err)?;

        let detections = yolo::decode(&data, rows, cols, &self.params, &letterbox, &self.labels)?;
        tracing::debug!(count = detections.len(), "inference finished");
        Ok(detections)
    }
}
