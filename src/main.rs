use clap::{Parser, ValueEnum};
use method_mcp::app::App;
use method_mcp::config::{Config, TransportMode};
use method_mcp::mcp::server::McpServer;
use method_mcp::services::logger::LogLevel;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "method-mcp")]
#[command(about = "Method CRM tools over the Model Context Protocol")]
#[command(version)]
struct Cli {
    /// Transport to serve on; overrides METHOD_TRANSPORT
    #[arg(short, long)]
    transport: Option<TransportChoice>,

    /// HTTP port; overrides METHOD_HTTP_PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Debug logging and a startup summary; same as METHOD_DEBUG=1
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportChoice {
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over POST /mcp
    Http,
}

impl From<TransportChoice> for TransportMode {
    fn from(choice: TransportChoice) -> Self {
        match choice {
            TransportChoice::Stdio => TransportMode::Stdio,
            TransportChoice::Http => TransportMode::Http,
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    if let Some(choice) = cli.transport {
        config.transport = choice.into();
    }
    if let Some(port) = cli.port {
        config.http_port = port;
    }
    if cli.debug {
        config.debug = true;
        config.log_level = LogLevel::Debug;
    }

    let app = App::initialize(config)?;
    for warning in &app.config.warnings {
        app.logger.warn(warning, None);
    }
    if app.config.debug {
        let mut summary = app.config.summary();
        if let Some(map) = summary.as_object_mut() {
            map.insert("auth_method".to_string(), app.client.auth_method().into());
        }
        app.logger.debug("startup configuration", Some(&summary));
    }

    let transport = app.config.transport;
    let port = app.config.http_port;
    let server = Arc::new(McpServer::new(Arc::new(app)));
    match transport {
        TransportMode::Stdio => server.run_stdio().await?,
        TransportMode::Http => server.run_http(port).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("method-mcp: {}", err);
        std::process::exit(1);
    }
}
