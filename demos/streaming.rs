//! Streaming generation example.
//!
//! Run with:
//! ```bash
//! export SINTELLI_API_KEY="your-api-key"
//! cargo run --example streaming
//! ```

use futures::StreamExt;
use sintelli::client::{ApiClient, StreamingClient};
use sintelli::model::{GenerationRequest, StreamEvent};
use sintelli::options::ClientConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get API key from environment
    let api_key = std::env::var("SINTELLI_API_KEY")
        .expect("SINTELLI_API_KEY environment variable must be set");

    let client = ApiClient::new(ClientConfig::with_api_key(api_key))?;

    let request = GenerationRequest::new(
        "rand0mdevel0per/l0.sydney@latest",
        "Briefly describe the characteristics of the Rust language.",
    )
    .with_max_tokens(512)
    .with_timeout(60);

    println!("Starting a new generation session...\n");

    let mut stream = client.generate(request).await?;
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Delta(delta) => {
                if let Some(text) = delta.text {
                    print!("{}", text);
                }
                if delta.image.is_some() {
                    print!("[image]");
                }

                // Flush stdout to show text immediately
                use std::io::Write;
                std::io::stdout().flush()?;
            }
            StreamEvent::Completion(done) => {
                println!("\n\n=== Generation Complete ===");
                println!("cost: {}, cost_per_mtk: {}", done.cost, done.cost_per_mtk);
            }
            StreamEvent::Failure(cause) => {
                eprintln!("\nStream failed: {}", cause);
                return Err(cause.into());
            }
        }
    }

    Ok(())
}
