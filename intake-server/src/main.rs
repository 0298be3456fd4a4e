use intake_server::{Config, Server, ServerState, init_logger_with_file, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv)
    setup_environment();

    // 2. Configuration
    let config = Config::from_env();

    // 3. Logging: file output in production, stdout otherwise
    if config.is_production() {
        std::fs::create_dir_all(config.log_dir())?;
        let log_dir = config.log_dir();
        init_logger_with_file(None, log_dir.to_str());
    } else {
        init_logger_with_file(None, None);
    }

    tracing::info!("Civic intake server starting...");

    // 4. State (database, services)
    let state = ServerState::initialize(&config).await?;

    // 5. HTTP server
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
