//! Account Event Injector
//!
//! Publishes synthetic `AccountIngested` envelopes to the events subject
//! for local end-to-end runs of the estimation engine.

use estimation_engine::types::{encode_envelope, AccountIngested, EventEnvelope, Payload};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const SOURCE: &str = "test-injector";

/// Random account generator
struct AccountGenerator {
    rng: rand::rngs::ThreadRng,
}

impl AccountGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn generate(&mut self) -> EventEnvelope {
        let account = AccountIngested::new(
            uuid::Uuid::new_v4().to_string(),
            self.rng.gen_range(100.0..5000.0),
            self.rng.gen_range(10..=180),
        );
        EventEnvelope::new(SOURCE, Payload::AccountIngested(account))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("account_injector=info".parse()?),
        )
        .init();

    info!("Starting Account Event Injector");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("events");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(2000);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };
    let jetstream = async_nats::jetstream::new(client);

    let mut generator = AccountGenerator::new();

    for i in 0..count {
        let envelope = generator.generate();
        let payload = encode_envelope(&envelope);

        // Wait for the stream to confirm before sending the next one
        jetstream
            .publish(subject.to_string(), payload.into())
            .await?
            .await?;

        if let Some(account) = envelope.account_ingested() {
            info!(
                "Sent account {}/{}: balance=${:.2}, dpd={}",
                i + 1,
                count,
                account.outstanding_balance,
                account.days_past_due
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Published {} accounts", count);
    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = AccountGenerator::new();

    for i in 0..count {
        let envelope = generator.generate();

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample envelope {}: {:?}", i + 1, envelope);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
