//! Streaming client and error types.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{add_extra_headers, authorization_header, build_http_client};
use crate::model::{GenerationRequest, StreamEvent, Transcript};
use crate::ndjson::NdjsonResponseExt;
use crate::options::ClientConfig;
use crate::stream::{decode_events, SessionSlot};

/// Errors that can occur before a generation stream starts.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API key is missing")]
    MissingApiKey,

    #[error("API key contains characters not allowed in a header")]
    InvalidApiKey,

    #[error("base URL is missing")]
    MissingBaseUrl,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("model_id is required for a new session")]
    MissingModelId,

    #[error("session_id is required to resume a session")]
    MissingSessionId,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the request was rejected locally and nothing was sent.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            ClientError::MissingApiKey
                | ClientError::InvalidApiKey
                | ClientError::MissingBaseUrl
                | ClientError::EmptyPrompt
                | ClientError::MissingModelId
                | ClientError::MissingSessionId
        )
    }
}

/// Lazy sequence of events from one generation call.
///
/// Dropping it releases the underlying connection.
pub struct EventStream {
    events: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
    session: SessionSlot,
}

impl EventStream {
    /// Wrap an event stream together with the slot its decoder fills.
    pub fn new(events: impl Stream<Item = StreamEvent> + Send + 'static, session: SessionSlot) -> Self {
        Self {
            events: Box::pin(events),
            session,
        }
    }

    /// Session id the server acknowledged, once its line has been read.
    ///
    /// Pass it to [`GenerationRequest::resume`] to continue the conversation.
    pub fn session_id(&self) -> Option<String> {
        self.session.get()
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Client trait for the generation API.
///
/// # Required Methods
/// - `generate`: Send one request and stream back its events
/// - `config`: Accessor for the stored configuration
///
/// # Provided Methods (with default implementations)
/// - `generate_transcript`: Drain the stream into a [`Transcript`]
#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Send a generation request.
    ///
    /// Returns an error without touching the network when the configuration
    /// or the request is incomplete. Failures once the body is streaming
    /// arrive as a terminal [`StreamEvent::Failure`].
    async fn generate(&self, request: GenerationRequest) -> Result<EventStream, ClientError>;

    /// Get reference to the client configuration.
    fn config(&self) -> &ClientConfig;

    /// Send a request and fold every event it produces.
    async fn generate_transcript(
        &self,
        request: GenerationRequest,
    ) -> Result<Transcript, ClientError> {
        let mut stream = self.generate(request).await?;
        let mut transcript = Transcript::default();
        while let Some(event) = stream.next().await {
            transcript.push(event);
        }
        transcript.session_id = stream.session_id();
        Ok(transcript)
    }
}

/// HTTP implementation of [`StreamingClient`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http_client: reqwest::Client,
    authorization: Option<HeaderValue>,
}

impl ApiClient {
    /// Create a client, building its HTTP connection settings once.
    ///
    /// The API key is not checked here: empty keys and URLs, and keys that
    /// cannot form a header, are rejected per request. Only an invalid proxy
    /// or a TLS backend failure makes construction fail.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = build_http_client(&config)?;
        let authorization = authorization_header(&config.api_key).ok();
        Ok(Self {
            config,
            http_client,
            authorization,
        })
    }

    fn validate(&self, request: &GenerationRequest) -> Result<HeaderValue, ClientError> {
        if self.config.api_key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        let authorization = self
            .authorization
            .clone()
            .ok_or(ClientError::InvalidApiKey)?;
        if self.config.base_url.is_empty() {
            return Err(ClientError::MissingBaseUrl);
        }
        request.validate()?;
        Ok(authorization)
    }
}

#[async_trait]
impl StreamingClient for ApiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<EventStream, ClientError> {
        let authorization = self.validate(&request)?;

        debug!(
            url = %self.config.base_url,
            session = request.session.kind(),
            max_tokens = request.max_tokens,
            "sending generation request"
        );

        let req = self
            .http_client
            .post(&self.config.base_url)
            .header(AUTHORIZATION, authorization)
            .json(&request);
        let response = add_extra_headers(req, &self.config.extra_headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "generation request rejected");
            return Err(ClientError::Status { status, body });
        }

        let session = SessionSlot::default();
        let events = decode_events(response.json_lines(), session.clone());
        Ok(EventStream::new(events, session))
    }

    fn config(&self) -> &ClientConfig {
        &self.config
    }
}
