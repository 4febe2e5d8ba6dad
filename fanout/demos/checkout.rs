//! # Demo: checkout
//!
//! Runs a four-step checkout workflow:
//!
//! ```text
//! authorize ──► charge ──► analytics
//!                  └─────► notify
//! ```
//!
//! `authorize` fails twice before succeeding and is retried with a short
//! backoff. `analytics` always fails and shows up as a warning; `notify`
//! still runs.
//!
//! ## Run
//! ```bash
//! cargo run --example checkout
//! cargo run --example checkout -- fanout.json
//! RUST_LOG=fanout=debug cargo run --example checkout
//! ```

use fanout::logging::init_tracing;
use fanout::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn checkout_units() -> Vec<UnitSpec> {
    let attempts = Arc::new(AtomicUsize::new(0));
    let authorize = UnitSpec::from_fn("authorize", move |ctx, record| {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(UnitError::msg("card network timeout"));
        }
        let email = record.payload()["billingInformation"]["email"].clone();
        Ok(json!({ "authorized": true, "email": email, "attempt": ctx.attempt() }))
    })
    .with_retry(
        RetryPolicy::DEFAULT
            .with_initial_delay(Duration::from_millis(20))
            .with_max_delay(Duration::from_millis(200)),
    );

    let charge = UnitSpec::from_async("charge", |_ctx: UnitContext, record: RecordView| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        match record.result("authorize") {
            Some(_) => Ok(json!({ "charged": 4999, "currency": "USD" })),
            None => Err(UnitError::msg("no authorization to charge against")),
        }
    })
    .with_dependency("authorize");

    let analytics = UnitSpec::from_fn("analytics", |_, _| {
        Err(UnitError::msg("analytics backend unavailable"))
    })
    .with_dependency("charge");

    let notify = UnitSpec::from_fn("notify", |_, record| {
        let charged = record.has_result("charge");
        Ok(json!({ "sent": charged }))
    })
    .with_dependency("charge");

    vec![authorize, charge, analytics, notify]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => FanoutConfig::from_file(path)?,
        None => FanoutConfig::new(),
    };
    init_tracing(&config.logging)?;

    let orchestrator = OrchestratorBuilder::from_config(&config)?
        .units(checkout_units())
        .build()?;

    let request = Request::generated(json!({
        "device": { "ipAddress": "127.0.0.1" },
        "billingInformation": { "email": "test@test.com" }
    }));

    let record = orchestrator.orchestrate(request).await;
    println!("{}", record.to_json_pretty()?);

    // Give a configured journal time to flush.
    if orchestrator.journals() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
}
