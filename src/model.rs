//! Request payloads and the events decoded from a generation stream.

use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::client::ClientError;
use crate::options::{DEFAULT_MAX_TOKENS, DEFAULT_ROLE, DEFAULT_SERVER_TIMEOUT_SECS};

/// Which server-side conversation a request belongs to.
///
/// Serialized as the `type` field plus exactly one id field, so a new
/// session can never carry a `session_id` and a resumed one never a `model_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Session {
    /// Start a new conversation with the given model.
    New { model_id: String },
    /// Continue an existing conversation.
    Resume { session_id: String },
}

impl Session {
    /// Wire name of the session kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Session::New { .. } => "new",
            Session::Resume { .. } => "resume",
        }
    }
}

/// One generation turn, serialized as the JSON request body.
///
/// # Example
/// ```rust
/// use sintelli::model::GenerationRequest;
///
/// let request = GenerationRequest::new("l0.sydney@latest", "Describe Rust briefly.")
///     .with_max_tokens(512)
///     .with_timeout(60);
///
/// let body = serde_json::to_value(&request).unwrap();
/// assert_eq!(body["type"], "new");
/// assert_eq!(body["input"], "Describe Rust briefly.");
/// ```
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    #[serde(flatten)]
    pub session: Session,

    /// User input text
    #[serde(rename = "input")]
    pub prompt: String,

    /// Optional encoded image attached to the turn
    pub image: Option<String>,

    /// Speaker role tag
    pub role: String,

    /// Generation length cap
    pub max_tokens: u32,

    /// Server-side advisory timeout in seconds
    pub timeout: u32,
}

impl GenerationRequest {
    /// Start a new session on `model_id`.
    pub fn new(model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::with_session(
            Session::New {
                model_id: model_id.into(),
            },
            prompt,
        )
    }

    /// Continue the session identified by `session_id`.
    pub fn resume(session_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::with_session(
            Session::Resume {
                session_id: session_id.into(),
            },
            prompt,
        )
    }

    /// Pick the session kind from optional ids.
    ///
    /// A non-empty `session_id` resumes that session; otherwise a non-empty
    /// `model_id` starts a new one.
    pub fn from_ids(
        prompt: impl Into<String>,
        session_id: Option<String>,
        model_id: Option<String>,
    ) -> Result<Self, ClientError> {
        match (session_id, model_id) {
            (Some(session_id), _) if !session_id.is_empty() => Ok(Self::resume(session_id, prompt)),
            (_, Some(model_id)) if !model_id.is_empty() => Ok(Self::new(model_id, prompt)),
            _ => Err(ClientError::MissingModelId),
        }
    }

    fn with_session(session: Session, prompt: impl Into<String>) -> Self {
        Self {
            session,
            prompt: prompt.into(),
            image: None,
            role: DEFAULT_ROLE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_SERVER_TIMEOUT_SECS,
        }
    }

    /// Attach an encoded image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the speaker role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Set the generation length cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the server-side timeout hint, in seconds.
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the fields the server requires.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.prompt.is_empty() {
            return Err(ClientError::EmptyPrompt);
        }
        match &self.session {
            Session::New { model_id } if model_id.is_empty() => Err(ClientError::MissingModelId),
            Session::Resume { session_id } if session_id.is_empty() => {
                Err(ClientError::MissingSessionId)
            }
            _ => Ok(()),
        }
    }
}

/// One unit of incremental generation progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub text: Option<String>,
    pub image: Option<String>,
    pub step: u64,
    pub tokens: u64,
}

/// Billing summary sent when generation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub cost: u64,
    pub cost_per_mtk: u64,
}

/// Why a stream stopped without completing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("undecodable line: {0}")]
    Decode(String),

    #[error("server reported an error{}", message_suffix(.0))]
    Upstream(Option<String>),

    #[error("stream ended before completion")]
    Truncated,
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
}

/// Event decoded from the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(Delta),
    Completion(Completion),
    Failure(FailureCause),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Delta(_))
    }
}

/// Everything a stream produced, folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Concatenated text fragments
    pub text: String,

    /// Image fragments in arrival order
    pub images: Vec<String>,

    /// Step counter from the latest delta
    pub step: u64,

    /// Token counter from the latest delta
    pub tokens: u64,

    pub completion: Option<Completion>,
    pub failure: Option<FailureCause>,

    /// Session id acknowledged by the server, for resuming later
    pub session_id: Option<String>,
}

impl Transcript {
    /// Fold one event into the transcript.
    pub fn push(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Delta(delta) => {
                if let Some(text) = delta.text {
                    self.text.push_str(&text);
                }
                if let Some(image) = delta.image {
                    self.images.push(image);
                }
                self.step = delta.step;
                self.tokens = delta.tokens;
            }
            StreamEvent::Completion(completion) => self.completion = Some(completion),
            StreamEvent::Failure(cause) => self.failure = Some(cause),
        }
    }

    /// True when the server reported completion.
    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }
}

impl Extend<StreamEvent> for Transcript {
    fn extend<I: IntoIterator<Item = StreamEvent>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}
