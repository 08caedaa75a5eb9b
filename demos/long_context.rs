//! Feeds a long transcript to models with large context windows and asks for
//! a three-bullet summary.
//!
//! ```bash
//! cargo run --example long_context -- path/to/transcript.txt
//! ```

use std::time::{Duration, Instant};

use refrain::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    refrain::observability::init_tracing();

    let text_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "transcript.txt".to_string());
    let long_text = match tokio::fs::read_to_string(&text_path).await {
        Ok(text) => text,
        Err(e) => {
            println!("Cannot read {text_path}: {e}");
            return Ok(());
        }
    };
    println!(
        "Loaded text with {} characters (approximately {} tokens)",
        long_text.len(),
        long_text.len() / 4
    );

    let targets = [
        (ProviderConfig::openai_from_env(), "gpt-4-turbo"),
        (ProviderConfig::gemini_from_env(), "gemini-1.5-pro"),
        (
            ProviderConfig::anthropic_from_env(),
            "claude-3-5-sonnet-20240620",
        ),
    ];

    let policy = RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_secs(2))
        .with_jitter_range(Duration::from_millis(500));

    let prompt =
        format!("Please provide a 3-bullet summary of the following text:\n\n{long_text}");

    for (config, model) in targets {
        println!("\n----- Testing {model} with long context -----");
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                println!("Skipping: {e}");
                continue;
            }
        };
        let backend = OpenAiCompatibleBackend::new(config)?;

        let request = ChatRequest::builder(model)
            .user(prompt.clone())
            .max_tokens(500)
            .build();

        let started = Instant::now();
        match backend.complete_with_retry(request, &policy).await {
            InvocationResult::Completed { value, attempts } => {
                println!("Summary from {model}:\n{}", value.all_text());
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
