//! Process-wide defaults.
//!
//! `configure` registers the language model used by every [`Predict`]
//! that was not given one explicitly.
//!
//! [`Predict`]: crate::Predict

use augur_llm::Lm;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Default)]
struct Settings {
    lm: Option<Arc<Lm>>,
}

static SETTINGS: RwLock<Settings> = RwLock::new(Settings { lm: None });

/// Register `lm` as the default model. The last registration wins.
pub fn configure(lm: Arc<Lm>) {
    tracing::debug!("Default LM set to {}", lm.model());
    let mut settings = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    settings.lm = Some(lm);
}

/// The registered default model, if any.
pub fn default_lm() -> Option<Arc<Lm>> {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .lm
        .clone()
}
