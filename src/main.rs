use hemmer_provider_whisparr::{init_logging, serve, WhisparrProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting Whisparr provider");
    serve(WhisparrProvider::new()).await
}
