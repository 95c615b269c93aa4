//! Fathom entry point
//!
//! Parses the command line, initializes logging and dispatches to the
//! selected command.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fathom::cli::{output, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.log_json() || env_flag("FATHOM_LOG_JSON"));

    tracing::debug!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--format json` output stays parseable
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fathom=info,tower_http=info".into());

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}
