//! Material classifier backed by ONNX Runtime
//!
//! Wraps a single-input image classification model. The engine starts
//! unloaded; `load` commits the model file into a session, after which
//! `infer` may be called any number of times.

use std::path::Path;

use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the classifier engine
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model asset missing or malformed
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// `infer` called before a model was loaded, or the engine failed
    /// while executing the model
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Result of classifying one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Predicted material label, lowercase
    pub label: String,
    /// Winning score as a fraction in [0, 1]
    pub confidence: f32,
}

impl ClassificationResult {
    /// Confidence for display
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// ONNX-backed material classifier
pub struct MaterialClassifier {
    session: Option<Session>,
    labels: Vec<String>,
}

impl MaterialClassifier {
    /// Create an unloaded classifier. `labels` is the ordered class list the
    /// model was trained with; the argmax index selects into it.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            session: None,
            labels,
        }
    }

    /// Load the model file and move the engine to ready
    pub fn load(&mut self, model_path: &Path) -> Result<(), ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelUnavailable(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        info!("Loading classification model from {:?}", model_path);
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| ClassifierError::ModelUnavailable(e.to_string()))?;

        info!("Classification model loaded, {} classes", self.labels.len());
        self.session = Some(session);
        Ok(())
    }

    /// Whether a model is loaded and inference may run
    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    /// Run one inference pass. Per-call engine values are dropped before
    /// returning; nothing accumulates across calls.
    pub fn infer(&mut self, input: Array4<f32>) -> Result<ClassificationResult, ClassifierError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ClassifierError::Inference("no model loaded".to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ClassifierError::Inference("model defines no output".to_string()))?;

        let input_tensor =
            Value::from_array(input).map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| ClassifierError::Inference("model produced no output".to_string()))?;

        let scores = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?
            .1;

        let (index, confidence) = argmax(scores)
            .ok_or_else(|| ClassifierError::Inference("model produced no scores".to_string()))?;

        let label = self
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        debug!(
            "Scores for {} classes, winner index {} at {:.4}",
            scores.len(),
            index,
            confidence
        );

        Ok(ClassificationResult { label, confidence })
    }
}

/// Index and value of the highest score. Ties keep the first maximum seen.
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, value)) if score > value => best = Some((i, score)),
            None => best = Some((i, score)),
            _ => {}
        }
    }
    best
}
