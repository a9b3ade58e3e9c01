//! Typed prediction for Augur.
//!
//! This crate turns a one-line signature such as
//! `question: str -> answer: str` into a model call:
//! - Signature parsing and validation
//! - Chat prompt formatting and completion parsing (`ChatAdapter`)
//! - The `Predict` module and its `Prediction` results
//! - The process-wide default model (`configure`)

pub mod adapter;
pub mod predict;
pub mod prediction;
pub mod settings;
pub mod signature;

// Re-export main types
pub use adapter::ChatAdapter;
pub use predict::Predict;
pub use prediction::Prediction;
pub use settings::{configure, default_lm};
pub use signature::{Field, FieldType, Signature};
