//! Demonstrates retry handling against an overloaded provider without
//! touching the network: a scripted backend returns `Overloaded` failures
//! until it recovers, gives up, or gets cancelled.
//!
//! ```bash
//! cargo run --example overload_retry
//! ```

use std::time::{Duration, Instant};

use refrain::prelude::*;

#[tokio::main]
async fn main() {
    refrain::observability::init_tracing();

    let policy = RetryPolicy::new()
        .with_max_attempts(4)
        .with_initial_delay(Duration::from_millis(500))
        .with_backoff_multiplier(2.0)
        .with_jitter_range(Duration::from_millis(250));

    let request = ChatRequest::builder("scripted-model")
        .user("What is the capital of France? One word answer.")
        .build();

    println!("----- Provider recovers after two overloads -----");
    let backend = ScriptedBackend::new("flaky")
        .fail_times(2, ProviderError::Overloaded("Overloaded".into()))
        .then_text("Paris");
    let started = Instant::now();
    match backend.complete_with_retry(request.clone(), &policy).await {
        InvocationResult::Completed { value, attempts } => {
            println!(
                "Succeeded after {attempts} attempt(s) in {:.2}s: {}",
                started.elapsed().as_secs_f64(),
                value.all_text()
            );
        }
        InvocationResult::GaveUp { error, attempts } => {
            println!("Gave up after {attempts} attempt(s): {error}");
        }
        InvocationResult::Cancelled { attempts } => {
            println!("Cancelled after {attempts} attempt(s)");
        }
    }

    println!("\n----- Provider never recovers -----");
    let backend = ScriptedBackend::new("down")
        .fail_times(8, ProviderError::Overloaded("Overloaded".into()));
    match backend.complete_with_retry(request.clone(), &policy).await {
        InvocationResult::Completed { value, .. } => {
            println!("Unexpected success: {}", value.all_text());
        }
        InvocationResult::GaveUp { error, attempts } => {
            println!("Gave up after {attempts} attempt(s): {error}");
        }
        InvocationResult::Cancelled { attempts } => {
            println!("Cancelled after {attempts} attempt(s)");
        }
    }

    println!("\n----- Caller cancels during the first backoff -----");
    let backend = ScriptedBackend::new("down")
        .fail_times(8, ProviderError::Overloaded("Overloaded".into()));
    let slow_policy = RetryPolicy::new()
        .with_max_attempts(5)
        .with_initial_delay(Duration::from_secs(30));
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });
    let started = Instant::now();
    match backend
        .complete_with_retry_cancellable(request, &slow_policy, cancel)
        .await
    {
        InvocationResult::Cancelled { attempts } => {
            println!(
                "Cancelled after {attempts} attempt(s) in {:.2}s instead of waiting 30s",
                started.elapsed().as_secs_f64()
            );
        }
        other => println!("Unexpected outcome: {other:?}"),
    }
}
