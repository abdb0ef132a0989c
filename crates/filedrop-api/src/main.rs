use filedrop_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under many concurrent uploads.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (metadata store, storage, workers, routes)
    let (state, router) = filedrop_api::setup::initialize_app(config.clone()).await?;

    // Serve until SIGINT/SIGTERM; in-flight requests are allowed to finish
    filedrop_api::setup::server::start_server(&config, router).await?;

    // Then drain the worker pool within the configured budget
    let outcome = state.workers.shutdown(config.shutdown_timeout()).await;
    match outcome.into_result() {
        Ok(()) => tracing::info!("All accepted files processed, exiting"),
        Err(e) => tracing::warn!(error = %e, "Exiting with unfinished processing jobs"),
    }

    Ok(())
}
