//! Streams a short completion from each provider, printing tokens as they
//! arrive plus time-to-first-token.
//!
//! ```bash
//! cargo run --example streaming
//! ```

use std::io::Write;
use std::time::Instant;

use futures_util::StreamExt;
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

    for (config, model) in targets {
        println!("\n----- Streaming test for {model} -----");
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                println!("Skipping: {e}");
                continue;
            }
        };
        let backend = OpenAiCompatibleBackend::new(config)?;

        let request = ChatRequest::builder(model)
            .user("Write a short poem about artificial intelligence.")
            .max_tokens(50)
            .build();

        let started = Instant::now();
        let mut first_token = None;
        let mut stream = match backend.complete_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                println!("Error with {model}: {e}");
                continue;
            }
        };

        let mut stdout = std::io::stdout();
        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::ContentDelta { delta, .. }) => {
                    first_token.get_or_insert_with(|| started.elapsed());
                    print!("{delta}");
                    stdout.flush()?;
                }
                Ok(ChatStreamEvent::StreamEnd { response }) => {
                    println!();
                    if let Some(usage) = response.usage {
                        println!("Tokens: {}", usage.total_tokens);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    println!("\nStream error with {model}: {e}");
                    break;
                }
            }
        }

        if let Some(ttft) = first_token {
            println!(
                "First token: {:.2}s, total: {:.2}s",
                ttft.as_secs_f64(),
                started.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
