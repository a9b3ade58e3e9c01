//! Language-model handle.
//!
//! An [`Lm`] binds a provider client to a model name and the sampling
//! defaults used for every call, optionally answering repeated requests from
//! an in-memory cache. Each call is wrapped in an OpenInference `LLM` span.

use crate::cache::ResponseCache;
use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse};
use crate::factory::create_client;
use crate::types::ModelId;
use augur_core::AppResult;
use std::sync::Arc;
use tracing::field::Empty;
use tracing::Instrument;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Default completion budget.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// A configured language model.
pub struct Lm {
    model: ModelId,
    client: Arc<dyn LlmClient>,
    cache: Option<ResponseCache>,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for Lm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lm")
            .field("model", &self.model.to_string())
            .field("provider", &self.client.provider_name())
            .field("cache", &self.cache.is_some())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Lm {
    /// Build a handle for `model` (`<provider>/<model>`) through the provider factory.
    ///
    /// # Example
    /// ```no_run
    /// use augur_llm::Lm;
    ///
    /// # fn example() -> augur_core::AppResult<()> {
    /// let lm = Lm::connect("openai/gpt-4.1-nano", Some("sk-..."), None)?.with_cache(false);
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect(model: &str, api_key: Option<&str>, api_base: Option<&str>) -> AppResult<Self> {
        let model: ModelId = model.parse()?;
        let client = create_client(model.provider.as_str(), api_base, api_key)?;
        Ok(Self::with_client(model, client))
    }

    /// Build a handle around an existing client.
    ///
    /// Caching is on by default.
    pub fn with_client(model: ModelId, client: Arc<dyn LlmClient>) -> Self {
        Self {
            model,
            client,
            cache: Some(ResponseCache::new()),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Enable or disable the response cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(ResponseCache::new);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Build the provider request for `messages` with this handle's defaults.
    pub fn request(&self, messages: Vec<ChatMessage>) -> LlmRequest {
        LlmRequest::new(messages, self.model.name.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Run one chat completion.
    ///
    /// Provider errors are returned unmodified.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> AppResult<LlmResponse> {
        let request = self.request(messages);

        let invocation_parameters = serde_json::json!({
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let input = serde_json::to_string(&request.messages)?;

        let span = tracing::info_span!(
            "LM",
            openinference.span.kind = "LLM",
            llm.provider = self.model.provider.as_str(),
            llm.model_name = %self.model.name,
            llm.invocation_parameters = %invocation_parameters,
            input.value = %input,
            input.mime_type = "application/json",
            output.value = Empty,
            llm.token_count.prompt = Empty,
            llm.token_count.completion = Empty,
            llm.token_count.total = Empty,
            cache.hit = Empty,
        );

        self.chat_inner(request).instrument(span).await
    }

    async fn chat_inner(&self, request: LlmRequest) -> AppResult<LlmResponse> {
        let span = tracing::Span::current();

        let cache_key = match self.cache {
            Some(_) => Some(ResponseCache::key(&request)?),
            None => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(response) = cache.get(key).await {
                tracing::debug!("Cache hit for {}", self.model);
                span.record("cache.hit", true);
                span.record("output.value", response.content.as_str());
                return Ok(response);
            }
        }

        let response = self.client.complete(&request).await?;

        span.record("cache.hit", false);
        span.record("output.value", response.content.as_str());
        span.record("llm.token_count.prompt", response.usage.prompt_tokens);
        span.record("llm.token_count.completion", response.usage.completion_tokens);
        span.record("llm.token_count.total", response.usage.total_tokens);

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.insert(key, response.clone()).await;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmUsage;
    use crate::types::ProviderType;
    use augur_core::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed completion and counts calls.
    struct CannedClient {
        reply: String,
        calls: AtomicUsize,
    }

    impl CannedClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for CannedClient {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 2),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    struct FailingClient;

    #[async_trait::async_trait]
    impl LlmClient for FailingClient {
        fn provider_name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            Err(AppError::Llm("connection refused".to_string()))
        }
    }

    fn model() -> ModelId {
        ModelId::new(ProviderType::OpenAI, "gpt-4.1-nano")
    }

    #[test]
    fn test_request_defaults() {
        let lm = Lm::with_client(model(), CannedClient::new("Paris"));
        let request = lm.request(vec![ChatMessage::user("hi")]);
        assert_eq!(request.model, "gpt-4.1-nano");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(4000));
        assert!(lm.cache_enabled());
    }

    #[test]
    fn test_connect_requires_key_for_openai() {
        assert!(Lm::connect("openai/gpt-4.1-nano", None, None).is_err());
        let lm = Lm::connect("openai/gpt-4.1-nano", Some("sk-test"), None).unwrap();
        assert_eq!(lm.model().to_string(), "openai/gpt-4.1-nano");
    }

    #[tokio::test]
    async fn test_cache_answers_repeated_requests() {
        let client = CannedClient::new("Paris");
        let lm = Lm::with_client(model(), client.clone());

        let first = lm.chat(vec![ChatMessage::user("capital?")]).await.unwrap();
        let second = lm.chat(vec![ChatMessage::user("capital?")]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_calls_provider() {
        let client = CannedClient::new("Paris");
        let lm = Lm::with_client(model(), client.clone()).with_cache(false);

        lm.chat(vec![ChatMessage::user("capital?")]).await.unwrap();
        lm.chat(vec![ChatMessage::user("capital?")]).await.unwrap();

        assert!(!lm.cache_enabled());
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let lm = Lm::with_client(model(), Arc::new(FailingClient));
        let result = lm.chat(vec![ChatMessage::user("capital?")]).await;
        assert!(matches!(result, Err(AppError::Llm(msg)) if msg == "connection refused"));
    }
}
