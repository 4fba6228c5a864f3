//! Basic example showing how to use mongodb-tracing.
//!
//! Run with: OTEL_RUST_INSTRUMENTATION_MONGODB_ENABLED=true cargo run --example basic

use std::sync::Arc;

use async_trait::async_trait;
use mongodb_tracing::prelude::*;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stands in for a real connection: acknowledges every command.
struct LoopbackExecutor;

#[async_trait]
impl CommandExecutor for LoopbackExecutor {
    type Error = std::io::Error;

    async fn execute(&self, _command: &Command) -> Result<Value, Self::Error> {
        Ok(json!({"ok": 1}))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,mongodb_tracing=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Option 1: Decide from the environment
    let tracer = Arc::new(Tracer::from_env());

    // Option 2: With custom configuration
    // let tracer = Arc::new(Tracer::new(
    //     TracingConfig::default()
    //         .with_enabled(true)
    //         .with_database_name("shop")
    // ));

    // Option 3: Development config (full statements)
    // let tracer = Arc::new(Tracer::new(TracingConfig::development()));

    tracing::info!(enabled = tracer.is_enabled(), "Command tracing configured");

    let executor = LoopbackExecutor.with_tracing(tracer);

    let find = Command::try_from(json!({
        "find": "orders",
        "filter": {"status": "paid", "total": {"$gt": 100}},
        "sort": {"total": -1},
        "lsid": {"id": "session"},
    }))?;
    executor.execute(&find).await?;

    let update = Command::try_from(json!({
        "update": "orders",
        "updates": [
            {"q": {"_id": 1}, "u": {"$set": {"status": "shipped"}}},
            {"q": {"_id": 2}, "u": {"$set": {"status": "shipped"}}},
        ],
    }))?;
    executor.execute(&update).await?;

    Ok(())
}
