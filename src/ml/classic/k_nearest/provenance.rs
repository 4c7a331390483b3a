use std::collections::HashMap;
use std::time::SystemTime;

use super::dataset::DatasetProvenance;

/// Audit record describing how a model was produced.
///
/// Carried alongside the model for downstream consumers; inference never
/// reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProvenance {
    /// Name of the model type that was trained.
    pub class_name: String,
    pub trained_at: SystemTime,
    pub dataset: DatasetProvenance,
    /// Trainer configuration as property name/value pairs.
    pub trainer: Vec<(String, String)>,
    /// Caller-supplied provenance for the enclosing run.
    pub run: HashMap<String, String>,
    /// Value of the training counter when this model was produced.
    pub invocation: u64,
}

impl ModelProvenance {
    /// Looks up a trainer configuration property.
    pub fn trainer_property(&self, name: &str) -> Option<&str> {
        self.trainer
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
