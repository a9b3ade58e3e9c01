//! Ask command handler.
//!
//! Builds a `Predict` program from the signature, registers the configured
//! model as the default and prints the prediction.

use super::PromptArgs;
use augur_core::{config::AppConfig, AppResult};
use augur_llm::Lm;
use augur_predict::{configure, Predict, Prediction, Signature};
use clap::Args;
use std::sync::Arc;

/// Ask a question
#[derive(Args, Debug, Default)]
pub struct AskCommand {
    #[command(flatten)]
    pub prompt: PromptArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        // 1. Program and inputs
        let signature = self.prompt.signature()?;
        let inputs = self.prompt.inputs(&signature)?;

        // 2. Model handle
        let lookup = |key: &str| std::env::var(key).ok();
        config.validate(lookup)?;
        let api_key = config.resolve_api_key(lookup);

        let lm = Lm::connect(
            &config.lm.model,
            api_key.as_deref(),
            config.lm.api_base.as_deref(),
        )?
        .with_cache(config.lm.cache)
        .with_temperature(config.lm.temperature)
        .with_max_tokens(config.lm.max_tokens);
        configure(Arc::new(lm));

        // 3. Predict
        let program = Predict::new(signature);
        let prediction = program.forward(inputs).await?;

        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            prediction.usage().prompt_tokens,
            prediction.usage().completion_tokens,
            prediction.usage().total_tokens
        );

        if self.json {
            println!("{}", render_json(config, &prediction)?);
        } else {
            println!("{}", render_text(program.signature(), &prediction)?);
        }

        Ok(())
    }
}

/// A single output prints bare; several print as `name: value` lines.
fn render_text(signature: &Signature, prediction: &Prediction) -> AppResult<String> {
    if let [field] = signature.outputs() {
        return prediction.text(&field.name);
    }

    let lines = signature
        .outputs()
        .iter()
        .map(|field| Ok(format!("{}: {}", field.name, prediction.text(&field.name)?)))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

fn render_json(config: &AppConfig, prediction: &Prediction) -> AppResult<String> {
    let usage = prediction.usage();
    let output = serde_json::json!({
        "outputs": prediction.fields(),
        "model": config.lm.model,
        "usage": {
            "promptTokens": usage.prompt_tokens,
            "completionTokens": usage.completion_tokens,
            "totalTokens": usage.total_tokens
        }
    });

    Ok(serde_json::to_string_pretty(&output)?)
}
