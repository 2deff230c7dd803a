use crate::{
    API_KEY_VAR, BASE_URL_VAR, CHAT_MODEL_VAR, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_DIM,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, EMBEDDING_DIM_VAR, EMBEDDING_MODEL_VAR,
    error::OpenAIError,
    request::ChatCompletionRequest,
    response::{ChatCompletionResponse, ErrorResponse},
};
use ragbot_core::{LanguageModel, llm::Message};
use reqwest::{StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, sync::Arc, time::Duration};

/// Default timeout applied to every HTTP request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for request retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt number (0-indexed).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(seconds).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay before retrying after `err`, respecting `Retry-After` on rate limits.
    fn delay_for(&self, err: &OpenAIError, attempt: u32) -> Duration {
        if let OpenAIError::RateLimit {
            retry_after: Some(delay),
            ..
        } = err
        {
            return (*delay).min(self.max_delay);
        }
        self.delay_for_attempt(attempt)
    }
}

/// Client for OpenAI-compatible chat-completion and embedding endpoints.
///
/// One value serves both roles: it implements [`LanguageModel`] through
/// `/chat/completions` and [`EmbeddingModel`](ragbot_core::EmbeddingModel) through
/// `/embeddings`. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct OpenAI {
    inner: Arc<Config>,
    http: reqwest::Client,
}

impl fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAI")
            .field("base_url", &self.inner.base_url)
            .field("chat_model", &self.inner.chat_model)
            .field("embedding_model", &self.inner.embedding_model)
            .field("embedding_dimensions", &self.inner.embedding_dimensions)
            .finish_non_exhaustive()
    }
}

impl OpenAI {
    /// Creates a client for the official API with default models.
    ///
    /// # Errors
    /// Returns [`OpenAIError::Http`] if the HTTP client cannot be initialised.
    pub fn new(api_key: impl Into<String>) -> Result<Self, OpenAIError> {
        Self::builder(api_key).build()
    }

    /// Returns a builder for customizing the client.
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> Builder {
        Builder::new(api_key)
    }

    /// Creates a client configured from `RAGBOT_*` environment variables.
    ///
    /// # Errors
    /// See [`Builder::from_env`] and [`Builder::build`].
    pub fn from_env() -> Result<Self, OpenAIError> {
        Builder::from_env()?.build()
    }

    /// Selects a different chat model, keeping everything else.
    #[must_use]
    pub fn with_model(self, model: impl Into<String>) -> Self {
        let mut config = (*self.inner).clone();
        config.chat_model = sanitize_model(model);
        Self {
            inner: Arc::new(config),
            http: self.http,
        }
    }

    /// Returns the chat model identifier.
    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.inner.chat_model
    }

    pub(crate) fn config(&self) -> &Config {
        &self.inner
    }

    /// Posts `body` as JSON to `path`, retrying transient failures.
    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, OpenAIError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.inner.request_url(path);
        let retry = &self.inner.retry;
        let mut attempt = 0;

        loop {
            match self.post_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < retry.max_retries && err.is_retryable() => {
                    let delay = retry.delay_for(&err, attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once<B, T>(&self, url: &str, body: &B) -> Result<T, OpenAIError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(url)
            .bearer_auth(&self.inner.api_key)
            .header(header::USER_AGENT, "ragbot-openai/0.1")
            .json(body);
        if let Some(org) = &self.inner.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await.unwrap_or_default();
        let message =
            serde_json::from_str::<ErrorResponse>(&text).map_or(text, ErrorResponse::into_message);

        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(OpenAIError::RateLimit {
                message,
                retry_after,
            })
        } else {
            Err(OpenAIError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl LanguageModel for OpenAI {
    async fn respond(&self, messages: &[Message]) -> ragbot_core::Result {
        let config = self.config();
        let request = ChatCompletionRequest::new(&config.chat_model, messages, config.temperature);
        let response: ChatCompletionResponse = self.post("/chat/completions", &request).await?;
        let text = response.into_text().ok_or_else(|| {
            OpenAIError::EmptyResponse("chat completion returned no content".into())
        })?;
        tracing::debug!(model = %config.chat_model, chars = text.len(), "chat completion");
        Ok(text)
    }
}

/// Builder for [`OpenAI`].
#[derive(Debug, Clone)]
pub struct Builder {
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
    temperature: Option<f32>,
    organization: Option<String>,
    retry: RetryConfig,
    request_timeout: Duration,
}

impl Builder {
    /// Creates a builder for the official API with default models.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIM,
            temperature: None,
            organization: None,
            retry: RetryConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads `RAGBOT_API_KEY` (required), `RAGBOT_BASE_URL`, `RAGBOT_CHAT_MODEL`,
    /// `RAGBOT_EMBEDDING_MODEL` and `RAGBOT_EMBEDDING_DIM` from the environment.
    ///
    /// # Errors
    /// Returns [`OpenAIError::MissingCredentials`] if the key is unset or blank and
    /// [`OpenAIError::InvalidConfig`] if the embedding dimension is unknown or invalid.
    pub fn from_env() -> Result<Self, OpenAIError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, OpenAIError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var(API_KEY_VAR).ok_or(OpenAIError::MissingCredentials { var: API_KEY_VAR })?;
        let mut builder = Self::new(api_key.trim());
        if let Some(url) = var(BASE_URL_VAR) {
            builder = builder.base_url(url.trim());
        }
        if let Some(model) = var(CHAT_MODEL_VAR) {
            builder = builder.model(model);
        }

        let dimension = var(EMBEDDING_DIM_VAR)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|dim| *dim > 0)
                    .ok_or_else(|| {
                        OpenAIError::InvalidConfig(format!(
                            "{EMBEDDING_DIM_VAR} must be a positive integer, got {raw:?}"
                        ))
                    })
            })
            .transpose()?;
        if let Some(model) = var(EMBEDDING_MODEL_VAR) {
            let model = sanitize_model(model);
            if dimension.is_none() && infer_embedding_dim(&model).is_none() {
                return Err(OpenAIError::InvalidConfig(format!(
                    "unknown dimension for embedding model {model}, set {EMBEDDING_DIM_VAR}"
                )));
            }
            builder = builder.embedding_model(model);
        }
        if let Some(dimension) = dimension {
            builder = builder.embedding_dimensions(dimension);
        }
        Ok(builder)
    }

    /// Set a custom API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Select a chat model identifier (e.g., `gpt-4o-mini`).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = sanitize_model(model);
        self
    }

    /// Select the embeddings model identifier.
    ///
    /// The dimension is updated for known `OpenAI` embedding models.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        let model = sanitize_model(model);
        if let Some(dim) = infer_embedding_dim(&model) {
            self.embedding_dimensions = dim;
        }
        self.embedding_model = model;
        self
    }

    /// Declare the vector length produced by the embedding model.
    #[must_use]
    pub const fn embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.embedding_dimensions = dimensions;
        self
    }

    /// Set the sampling temperature sent with chat requests.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach an `OpenAI` organization header.
    #[must_use]
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Configure retry behavior for failed requests.
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set maximum number of retry attempts.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Disable retries.
    #[must_use]
    pub fn no_retry(mut self) -> Self {
        self.retry = RetryConfig::none();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Finalize the builder.
    ///
    /// # Errors
    /// Returns [`OpenAIError::InvalidConfig`] for a blank key or a zero embedding
    /// dimension and [`OpenAIError::Http`] if the HTTP client cannot be initialised.
    pub fn build(self) -> Result<OpenAI, OpenAIError> {
        if self.api_key.trim().is_empty() {
            return Err(OpenAIError::InvalidConfig("API key must not be empty".into()));
        }
        if self.embedding_dimensions == 0 {
            return Err(OpenAIError::InvalidConfig(
                "embedding dimension must be positive".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?;
        Ok(OpenAI {
            inner: Arc::new(Config {
                api_key: self.api_key,
                base_url: self.base_url,
                chat_model: self.chat_model,
                embedding_model: self.embedding_model,
                embedding_dimensions: self.embedding_dimensions,
                temperature: self.temperature,
                organization: self.organization,
                retry: self.retry,
            }),
            http,
        })
    }
}

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) chat_model: String,
    pub(crate) embedding_model: String,
    pub(crate) embedding_dimensions: usize,
    pub(crate) temperature: Option<f32>,
    pub(crate) organization: Option<String>,
    pub(crate) retry: RetryConfig,
}

impl Config {
    pub(crate) fn request_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn sanitize_model(model: impl Into<String>) -> String {
    model.into().trim().to_string()
}

pub(crate) fn infer_embedding_dim(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-large" => Some(3072),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    /// Serves canned `(status, body)` responses, one per connection, and returns
    /// the base URL plus the received request bodies.
    pub(crate) async fn serve(
        responses: Vec<(u16, String)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut bodies = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                bodies.push(read_body(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            bodies
        });
        (format!("http://{address}/v1"), handle)
    }

    async fn read_body(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            buffer.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= end + 4 + length {
                    return String::from_utf8_lossy(&buffer[end + 4..end + 4 + length]).to_string();
                }
            }
            if read == 0 {
                return String::new();
            }
        }
    }

    pub(crate) fn client(base_url: &str) -> OpenAI {
        OpenAI::builder("sk-test")
            .base_url(base_url)
            .retry(RetryConfig {
                max_retries: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 2.0,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for_attempt(10), Duration::from_secs(30));
        assert_eq!(retry.delay_for_attempt(u32::MAX), Duration::from_secs(30));

        let limited = OpenAIError::RateLimit {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(retry.delay_for(&limited, 0), Duration::from_secs(2));
    }

    #[test]
    fn env_requires_api_key() {
        let err = Builder::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, OpenAIError::MissingCredentials { var } if var == API_KEY_VAR));

        let err = Builder::from_lookup(lookup(&[(API_KEY_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, OpenAIError::MissingCredentials { .. }));
    }

    #[test]
    fn env_configures_models() {
        let model = Builder::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            (BASE_URL_VAR, "http://localhost:8080/v1/"),
            (CHAT_MODEL_VAR, " llama3 "),
            (EMBEDDING_MODEL_VAR, "nomic-embed-text"),
            (EMBEDDING_DIM_VAR, "768"),
        ]))
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(model.chat_model(), "llama3");
        assert_eq!(model.config().embedding_model, "nomic-embed-text");
        assert_eq!(model.config().embedding_dimensions, 768);
        assert_eq!(
            model.config().request_url("/embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn env_rejects_unknown_dimensions() {
        let err = Builder::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            (EMBEDDING_MODEL_VAR, "nomic-embed-text"),
        ]))
        .unwrap_err();
        assert!(matches!(err, OpenAIError::InvalidConfig(_)));

        let err = Builder::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            (EMBEDDING_DIM_VAR, "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, OpenAIError::InvalidConfig(_)));
    }

    #[test]
    fn known_embedding_models_set_dimension() {
        let model = OpenAI::builder("sk-test")
            .embedding_model("text-embedding-3-large")
            .build()
            .unwrap();
        assert_eq!(model.config().embedding_dimensions, 3072);
    }

    #[tokio::test]
    async fn chat_completion_round_trip() {
        let (url, server) = serve(vec![(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Two billion."}}]}"#.into(),
        )])
        .await;
        let model = client(&url);

        let reply = model
            .respond(&[Message::user("How much did solar get?")])
            .await
            .unwrap();
        assert_eq!(reply, "Two billion.");

        let bodies = server.await.unwrap();
        let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["model"], DEFAULT_MODEL);
        assert_eq!(sent["messages"][0]["content"], "How much did solar get?");
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let (url, server) = serve(vec![
            (503, r#"{"error":{"message":"overloaded"}}"#.into()),
            (200, r#"{"choices":[{"message":{"content":"ok"}}]}"#.into()),
        ])
        .await;

        let reply = client(&url).respond(&[Message::user("hi")]).await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, server) = serve(vec![(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#.into(),
        )])
        .await;

        let err = client(&url)
            .respond(&[Message::user("hi")])
            .await
            .unwrap_err();
        let err = err.downcast::<OpenAIError>().unwrap();
        assert!(matches!(
            err,
            OpenAIError::Api { status: 401, ref message } if message == "Incorrect API key provided"
        ));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let (url, _server) = serve(vec![(200, r#"{"choices":[]}"#.into())]).await;
        let err = client(&url)
            .respond(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast::<OpenAIError>().unwrap(),
            OpenAIError::EmptyResponse(_)
        ));
    }
}
