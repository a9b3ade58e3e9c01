//! The `Predict` module: one signature, one model call.

use crate::adapter::ChatAdapter;
use crate::prediction::Prediction;
use crate::settings;
use crate::signature::Signature;
use augur_core::{AppError, AppResult};
use augur_llm::Lm;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::field::Empty;
use tracing::Instrument;

/// Calls a language model with a signature-shaped prompt and returns the
/// typed outputs.
///
/// # Example
/// ```no_run
/// use augur_predict::{Predict, Signature};
///
/// # async fn example() -> augur_core::AppResult<()> {
/// let signature = Signature::parse("question: str -> answer: str")?
///     .with_instructions("Answer only the question.");
/// let program = Predict::new(signature);
///
/// let prediction = program
///     .call([("question", "What is the capital of France?")])
///     .await?;
/// println!("{}", prediction.text("answer")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Predict {
    signature: Signature,
    adapter: ChatAdapter,
    lm: Option<Arc<Lm>>,
}

impl Predict {
    /// Create a predictor that uses the process default model.
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            adapter: ChatAdapter::new(),
            lm: None,
        }
    }

    /// Bind an explicit model instead of the process default.
    pub fn with_lm(mut self, lm: Arc<Lm>) -> Self {
        self.lm = Some(lm);
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Run the predictor on `(name, value)` input pairs.
    pub async fn call<I, K, V>(&self, inputs: I) -> AppResult<Prediction>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let inputs = inputs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.forward(inputs).await
    }

    /// Run the predictor on an input map.
    ///
    /// Exactly one model call is made. Provider faults propagate unmodified.
    pub async fn forward(&self, inputs: Map<String, Value>) -> AppResult<Prediction> {
        let lm = resolve_lm(self.lm.as_ref(), settings::default_lm)?;
        let input = Value::Object(inputs.clone());

        let span = tracing::info_span!(
            "Predict",
            openinference.span.kind = "CHAIN",
            signature = %self.signature,
            input.value = %input,
            input.mime_type = "application/json",
            output.value = Empty,
            output.mime_type = "application/json",
        );

        async move {
            let messages = self.adapter.format(&self.signature, &inputs)?;
            let response = lm.chat(messages).await?;
            let outputs = self.adapter.parse(&self.signature, &response.content)?;

            let output = serde_json::to_string(&outputs)?;
            tracing::Span::current().record("output.value", output.as_str());

            Ok(Prediction::new(outputs, response.usage))
        }
        .instrument(span)
        .await
    }
}

/// Pick the explicit model, falling back to the registered default.
fn resolve_lm<F>(explicit: Option<&Arc<Lm>>, fallback: F) -> AppResult<Arc<Lm>>
where
    F: FnOnce() -> Option<Arc<Lm>>,
{
    explicit.cloned().or_else(fallback).ok_or_else(|| {
        AppError::Config(
            "No language model configured: call augur_predict::configure or Predict::with_lm"
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ModelId, ProviderType, Role};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replies with a fixed completion and records every request.
    struct RecordingClient {
        reply: String,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl RecordingClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(50, 4),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    fn qa_program() -> Predict {
        let signature = Signature::parse("question: str -> answer: str")
            .unwrap()
            .with_instructions(
                "Answer only the question. Do not repeat the question or provide any additional information.",
            );
        Predict::new(signature)
    }

    fn lm_with(client: Arc<RecordingClient>) -> Arc<Lm> {
        let model = ModelId::new(ProviderType::OpenAI, "gpt-4.1-nano");
        Arc::new(Lm::with_client(model, client).with_cache(false))
    }

    #[test]
    fn test_program_fields() {
        let program = qa_program();
        assert_eq!(program.signature().inputs().len(), 1);
        assert_eq!(program.signature().inputs()[0].name, "question");
        assert_eq!(program.signature().outputs().len(), 1);
        assert_eq!(program.signature().outputs()[0].name, "answer");
    }

    #[tokio::test]
    async fn test_call_returns_answer() {
        let client = RecordingClient::new("[[ ## answer ## ]]\nParis\n\n[[ ## completed ## ]]");
        let program = qa_program().with_lm(lm_with(client.clone()));

        let prediction = program
            .call([("question", "What is the capital of France?")])
            .await
            .unwrap();

        assert_eq!(prediction.get_str("answer"), Some("Paris"));
        assert_eq!(prediction.usage().total_tokens, 54);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert!(requests[0].messages[0]
            .content
            .ends_with("Do not repeat the question or provide any additional information."));
        assert!(requests[0].messages[1]
            .content
            .contains("What is the capital of France?"));
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_span_records_input_and_output() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let client = RecordingClient::new("[[ ## answer ## ]]\nParis\n\n[[ ## completed ## ]]");
        qa_program()
            .with_lm(lm_with(client))
            .call([("question", "What is the capital of France?")])
            .await
            .unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        // The outer span closes last.
        let close = output
            .lines()
            .filter(|line| line.contains("Predict{") && line.contains("close"))
            .last()
            .expect("Predict span was not closed");
        assert!(close.contains(r#"input.value={"question":"What is the capital of France?"}"#));
        assert!(close.contains("output.value="));
        assert!(close.contains("Paris"));
        assert!(close.contains(r#"openinference.span.kind="CHAIN""#));
    }

    #[tokio::test]
    async fn test_call_missing_input() {
        let client = RecordingClient::new("[[ ## answer ## ]]\nParis");
        let program = qa_program().with_lm(lm_with(client.clone()));

        let result = program.call([("query", "What is the capital of France?")]).await;

        assert!(matches!(result, Err(AppError::Adapter(_))));
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_unparseable_completion() {
        let client = RecordingClient::new("I think it is Paris.");
        let program = qa_program().with_lm(lm_with(client));

        let result = program.call([("question", "What is the capital of France?")]).await;
        assert!(matches!(result, Err(AppError::Adapter(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_against_openai_mock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4.1-nano",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "[[ ## answer ## ]]\nParis\n\n[[ ## completed ## ]]"
                    },
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 150, "completion_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/v1", server.uri());
        let lm = Lm::connect("openai/gpt-4.1-nano", Some("sk-test"), Some(&base))
            .unwrap()
            .with_cache(false);
        let program = qa_program().with_lm(Arc::new(lm));

        let prediction = program
            .call([("question", "What is the capital of France?")])
            .await
            .unwrap();
        assert_eq!(prediction.text("answer").unwrap(), "Paris");
    }

    #[tokio::test]
    async fn test_unreachable_model_fails() {
        let lm = Lm::connect(
            "openai/gpt-4.1-nano",
            Some("sk-test"),
            Some("http://127.0.0.1:9/v1"),
        )
        .unwrap()
        .with_cache(false);
        let program = qa_program().with_lm(Arc::new(lm));

        let result = program.call([("question", "What is the capital of France?")]).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[test]
    fn test_resolve_lm_without_any_model() {
        let result = resolve_lm(None, || None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_lm_prefers_explicit() {
        let explicit = lm_with(RecordingClient::new("x"));
        let fallback = lm_with(RecordingClient::new("y"));
        let resolved = resolve_lm(Some(&explicit), || Some(fallback.clone())).unwrap();
        assert!(Arc::ptr_eq(&resolved, &explicit));

        let resolved = resolve_lm(None, || Some(fallback.clone())).unwrap();
        assert!(Arc::ptr_eq(&resolved, &fallback));
    }

    // The only test touching the process-wide default.
    #[tokio::test]
    async fn test_configured_default_lm_is_used() {
        let client = RecordingClient::new("[[ ## answer ## ]]\nParis\n[[ ## completed ## ]]");
        settings::configure(lm_with(client.clone()));
        assert!(settings::default_lm().is_some());

        let prediction = qa_program()
            .call([("question", "What is the capital of France?")])
            .await
            .unwrap();

        assert_eq!(prediction.get_str("answer"), Some("Paris"));
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }
}
