//! Sends the same one-line prompt to each configured provider and prints the
//! answer with timing, retrying transient failures.
//!
//! Needs `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `GOOGLE_API_KEY` in the
//! environment or a `.env` file; providers without a key are skipped.
//!
//! ```bash
//! cargo run --example basic_completion
//! ```

use std::time::{Duration, Instant};

use refrain::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    refrain::observability::init_tracing();

    let targets = [
        (ProviderConfig::openai_from_env(), "gpt-4o-mini"),
        (ProviderConfig::gemini_from_env(), "gemini-1.5-flash"),
        (
            ProviderConfig::anthropic_from_env(),
            "claude-3-5-sonnet-20240620",
        ),
    ];

    let policy = RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_secs(2))
        .with_jitter_range(Duration::from_millis(250));

    for (config, model) in targets {
        println!("\n----- Testing {model} -----");
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                println!("Skipping: {e}");
                continue;
            }
        };
        let backend = OpenAiCompatibleBackend::new(config)?;

        let request = ChatRequest::builder(model)
            .user("What is the capital of France? One word answer.")
            .build();

        let started = Instant::now();
        match backend.complete_with_retry(request, &policy).await {
            InvocationResult::Completed { value, attempts } => {
                println!("Response from {model}: {}", value.all_text());
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
