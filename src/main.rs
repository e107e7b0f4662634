use bluecat_provider::{init_logging, serve, BlueCatProvider};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting BlueCat provider");

    serve(BlueCatProvider::new()).await
}
