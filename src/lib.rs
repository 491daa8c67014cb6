//! # sintelli - Streaming Generation Client
//!
//! A small client for the Sintelli text/image generation API. A request
//! either starts a new session on a model or resumes an existing one; the
//! response is a JSON Lines stream decoded into [`StreamEvent`]s.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - New vs. resumed sessions as a tagged type
//! - Incremental JSON Lines decoding with exactly one terminal event
//! - Precondition and HTTP status failures reported before streaming starts
//!
//! ### Core Types
//!
//! - **`ClientConfig`**: API key, endpoint and transport settings
//! - **`GenerationRequest`**: One turn of input plus session selection
//! - **`StreamEvent`**: `Delta`, `Completion` or `Failure`
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use sintelli::client::{ApiClient, StreamingClient};
//! use sintelli::model::{GenerationRequest, StreamEvent};
//! use sintelli::options::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ClientConfig::with_api_key("your-api-key"))?;
//!
//!     let request = GenerationRequest::new("l0.sydney@latest", "Hello!");
//!     let mut stream = client.generate(request).await?;
//!
//!     while let Some(event) = stream.next().await {
//!         match event {
//!             StreamEvent::Delta(delta) => print!("{}", delta.text.unwrap_or_default()),
//!             StreamEvent::Completion(done) => println!("\ncost: {}", done.cost),
//!             StreamEvent::Failure(cause) => eprintln!("\nfailed: {}", cause),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod model;
pub mod ndjson;
pub mod options;
pub mod stream;

// Re-exports for convenience
pub use client::{ApiClient, ClientError, EventStream, StreamingClient};
pub use model::{Completion, Delta, FailureCause, GenerationRequest, Session, StreamEvent, Transcript};
pub use options::ClientConfig;
pub use stream::SessionSlot;
