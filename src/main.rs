use hemmer_provider_fivetran::{init_logging, serve, FivetranProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Fivetran provider");
    serve(FivetranProvider::new()).await
}
