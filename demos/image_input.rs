//! Sends a local image to each vision-capable provider as a base64 data URL.
//!
//! ```bash
//! cargo run --example image_input -- path/to/image.jpg
//! ```

use std::time::{Duration, Instant};

use refrain::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    refrain::observability::init_tracing();

    let image_path = std::env::args().nth(1).unwrap_or_else(|| "panda.jpg".to_string());
    let image = match ContentPart::from_image_file(&image_path).await {
        Ok(part) => part,
        Err(e) => {
            println!("Cannot load {image_path}: {e}");
            return Ok(());
        }
    };

    let targets = [
        (ProviderConfig::openai_from_env(), "gpt-4o"),
        (ProviderConfig::gemini_from_env(), "gemini-1.5-pro"),
        (
            ProviderConfig::anthropic_from_env(),
            "claude-3-5-sonnet-20240620",
        ),
    ];

    let policy = RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_secs(2));

    for (config, model) in targets {
        println!("\n----- Testing {model} with image input -----");
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                println!("Skipping: {e}");
                continue;
            }
        };
        let backend = OpenAiCompatibleBackend::new(config)?;

        let request = ChatRequest::builder(model)
            .message(ChatMessage::user_parts(vec![
                ContentPart::text("What's in this image? Describe it in detail."),
                image.clone(),
            ]))
            .build();

        let started = Instant::now();
        match backend.complete_with_retry(request, &policy).await {
            InvocationResult::Completed { value, attempts } => {
                println!("Response from {model}:\n{}", value.all_text());
                println!(
                    "Response time: {:.2} seconds ({attempts} attempt(s))",
                    started.elapsed().as_secs_f64()
                );
            }
            InvocationResult::GaveUp { error, attempts } => {
                println!("Error with {model} after {attempts} attempt(s): {error}");
            }
            InvocationResult::Cancelled { .. } => println!("Cancelled {model}"),
        }
    }

    Ok(())
}
