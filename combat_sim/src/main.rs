#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Delegate to the server framework entry point.
    combat_sim::run_with_config().await
}
