mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use cinefuse::{config, server};

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    // A server without a catalog credential cannot answer anything.
    config::validate_config(&config)?;

    tracing::info!("Starting cinefuse server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let ctx = server::AppContext::from_config(config);
    server::start_server(ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinefuse=trace,tower_http=debug".to_string()
        } else {
            "cinefuse=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Start { host, port } => {
            runtime.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate { config: path } => {
            let path = path.or(cli.config);
            let config = config::load_config_or_default(path.as_deref())?;
            config::validate_config(&config)?;
            println!("Configuration OK");
            Ok(())
        }
        Commands::Version => {
            println!("cinefuse {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
