//! Command handlers for the Augur CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod inspect;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use inspect::InspectCommand;

use augur_core::{AppError, AppResult};
use augur_predict::Signature;
use clap::Args;
use serde_json::{Map, Value};

/// Question asked when none is given.
pub const DEFAULT_QUESTION: &str = "What is the capital of France?";

/// Signature used when none is given.
pub const DEFAULT_SIGNATURE: &str = "question: str -> answer: str";

/// Instructions used when none are given.
pub const DEFAULT_INSTRUCTIONS: &str =
    "Answer only the question. Do not repeat the question or provide any additional information.";

/// Arguments shared by every command that builds a prompt.
#[derive(Args, Debug, Default)]
pub struct PromptArgs {
    /// The question to ask
    pub question: Option<String>,

    /// Signature, e.g. "question: str -> answer: str"
    #[arg(short, long)]
    pub signature: Option<String>,

    /// Task instructions for the model
    #[arg(short, long)]
    pub instructions: Option<String>,
}

impl PromptArgs {
    /// Parse the signature and attach the instructions.
    ///
    /// A custom signature without `--instructions` keeps its generated
    /// default instructions.
    pub fn signature(&self) -> AppResult<Signature> {
        let signature = match &self.signature {
            Some(text) => Signature::parse(text)?,
            None => Signature::parse(DEFAULT_SIGNATURE)?
                .with_instructions(DEFAULT_INSTRUCTIONS),
        };

        Ok(match &self.instructions {
            Some(instructions) => signature.with_instructions(instructions.as_str()),
            None => signature,
        })
    }

    /// Bind the question to the signature's single input field.
    pub fn inputs(&self, signature: &Signature) -> AppResult<Map<String, Value>> {
        let question = self.question.as_deref().unwrap_or(DEFAULT_QUESTION);
        if question.trim().is_empty() {
            return Err(AppError::Config("Question must not be empty".to_string()));
        }

        let [field] = signature.inputs() else {
            return Err(AppError::Config(format!(
                "The CLI needs a signature with exactly one input field, got {}",
                signature.inputs().len()
            )));
        };

        let mut inputs = Map::new();
        inputs.insert(field.name.clone(), Value::String(question.to_string()));
        Ok(inputs)
    }
}
