//! Connects to a realtime endpoint and prints every delivered message.
//!
//! Endpoint comes from realtime.toml (or defaults), the credential from
//! the REALTIME_TOKEN environment variable.

use std::sync::Arc;
use std::time::Duration;

use realtime_client::{Message, RealtimeClient, RealtimeConfig, StaticToken};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = RealtimeConfig::load().unwrap_or_default();
    let token = std::env::var("REALTIME_TOKEN").unwrap_or_else(|_| "dev-token".to_string());

    let client = RealtimeClient::spawn(config, Arc::new(StaticToken::new(token)));

    let _feed = client.subscribe("*", |msg: &Message| {
        println!("[{}] {} {}", msg.timestamp, msg.kind, msg.data);
    });

    client.connect();

    loop {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let metrics = client.metrics();
        println!(
            "-- state={} received={} sent={} reconnects={}",
            client.state(),
            metrics.messages_received,
            metrics.messages_sent,
            metrics.reconnects_scheduled
        );
    }
}
