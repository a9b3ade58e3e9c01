//! Inspect command handler.
//!
//! Prints the parsed signature and the chat messages a model would receive.

use super::PromptArgs;
use augur_core::AppResult;
use augur_llm::{ChatMessage, Role};
use augur_predict::{ChatAdapter, Signature};
use clap::Args;

/// Show the parsed signature and the prompt without calling the model
#[derive(Args, Debug, Default)]
pub struct InspectCommand {
    #[command(flatten)]
    pub prompt: PromptArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    /// Execute the inspect command.
    pub fn execute(&self) -> AppResult<()> {
        tracing::info!("Executing inspect command");

        let signature = self.prompt.signature()?;
        let inputs = self.prompt.inputs(&signature)?;
        let messages = ChatAdapter::new().format(&signature, &inputs)?;

        if self.json {
            let output = serde_json::json!({
                "signature": signature.to_string(),
                "inputs": signature.inputs(),
                "outputs": signature.outputs(),
                "instructions": signature.instructions(),
                "messages": messages,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", render(&signature, &messages));
        }

        Ok(())
    }
}

fn render(signature: &Signature, messages: &[ChatMessage]) -> String {
    let mut out = format!("Signature: {}\n", signature);
    for message in messages {
        let role = match message.role {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        };
        out.push_str(&format!("\n--- {} ---\n{}\n", role, message.content));
    }
    out
}
