//! Serve command - sync repositories and run the HTTP API

use crate::core::config::Config;
use crate::core::services::Services;
use crate::core::sync::spawn_workers;
use clap::Args;
use std::sync::Arc;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address, overriding the configured host and port
    #[arg(long, value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// Emit logs as JSON lines (also FATHOM_LOG_JSON=1)
    #[arg(long)]
    pub log_json: bool,
}

/// Listen address: the flag when given, otherwise `host:port` from config
pub fn listen_addr(args: &ServeArgs, config: &Config) -> String {
    args.addr
        .clone()
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port))
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.log_config();
    let addr = listen_addr(&args, &config);

    let services = Arc::new(Services::bootstrap(config).await?);
    let workers = spawn_workers(&services.sync, &services.registry);

    let served = crate::http::serve(services, &addr).await;

    for worker in workers {
        worker.abort();
    }
    tracing::info!("Shutdown complete");

    served?;
    Ok(())
}
