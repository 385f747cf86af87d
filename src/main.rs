use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mailtracking_mcp::{config::load_dotenv, MailtrackingServer, MongoConfig, MongoStore};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{transport::stdio, ServiceExt};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    /// MCP over stdin/stdout
    Stdio,
    /// Streamable HTTP at /mcp
    Http,
}

#[derive(Parser)]
#[command(name = "mailtracking-mcp")]
#[command(about = "An MCP server exposing mail-tracking records stored in MongoDB")]
struct Args {
    #[command(flatten)]
    mongo: MongoConfig,

    /// Transport to serve the MCP protocol over
    #[arg(long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// Port to listen on (http transport)
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to (http transport)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the stdio transport, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    load_dotenv();
    let args = Args::parse();

    tracing::info!("Starting mailtracking MCP server");
    let settings = args.mongo.validate()?;
    tracing::info!(
        url = %settings.redacted_url(),
        database = %settings.database,
        collection = %settings.collection,
        "Using MongoDB"
    );

    let store = MongoStore::connect(&settings).await?;
    let server = MailtrackingServer::new(Arc::new(store.clone()));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("Shutting down");
            shutdown.cancel();
        }
    });

    let served = match args.transport {
        Transport::Stdio => serve_stdio(server, shutdown).await,
        Transport::Http => serve_http(server, &args.host, args.port, shutdown).await,
    };

    store.shutdown().await;
    served
}

async fn serve_stdio(server: MailtrackingServer, shutdown: CancellationToken) -> anyhow::Result<()> {
    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Server error: {}", e))?;
    tracing::info!("MCP server started and listening for requests on stdio");

    let cancel = service.cancellation_token();
    let waiting = service.waiting();
    tokio::pin!(waiting);
    tokio::select! {
        result = &mut waiting => {
            result?;
            return Ok(());
        }
        () = shutdown.cancelled() => {
            cancel.cancel();
        }
    }
    // Let in-flight handlers finish before the database client goes away.
    waiting.await?;
    Ok(())
}

async fn serve_http(
    server: MailtrackingServer,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let app = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Mailtracking MCP server listening on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
