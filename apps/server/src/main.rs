//! Meetapp Server - Entry Point
//!
//! HTTP API plus the background notification worker, in one process.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    meetapp_server::run().await
}
