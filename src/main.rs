use deskpilot_lib::config::{self, AppConfig};
use deskpilot_lib::executor::dispatcher::Dispatcher;
use deskpilot_lib::{init_tracing, serve_lines, tool};

#[tokio::main]
async fn main() {
    init_tracing();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    if std::env::args().skip(1).any(|a| a == "--describe") {
        match tool::tool_definition().and_then(|def| serde_json::to_string_pretty(&def).map_err(Into::into)) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "cannot render tool definition");
                std::process::exit(1);
            }
        }
        return;
    }

    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config; using defaults");
        config::parse_config("").unwrap_or_else(|_| AppConfig::default())
    });

    let dispatcher = Dispatcher::new(cfg);
    tracing::info!(platform = %dispatcher.platform().name(), "deskpilot ready on stdio");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    if let Err(e) = serve_lines(&dispatcher, stdin, tokio::io::stdout()).await {
        tracing::error!(error = %e, "stdio loop failed");
        std::process::exit(1);
    }
}
