//! Prediction results.

use augur_core::{AppError, AppResult};
use augur_llm::LlmUsage;
use serde::Serialize;
use serde_json::{Map, Value};

/// Output fields produced by one `Predict` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    fields: Map<String, Value>,
    usage: LlmUsage,
}

impl Prediction {
    pub fn new(fields: Map<String, Value>, usage: LlmUsage) -> Self {
        Self { fields, usage }
    }

    /// Raw value of an output field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Value of a `str` output field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Printable form of an output field: strings verbatim, anything else as JSON.
    pub fn text(&self, name: &str) -> AppResult<String> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(AppError::Other(format!(
                "Prediction has no field `{}`",
                name
            ))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn usage(&self) -> LlmUsage {
        self.usage
    }
}
