//! pagewalk - crawl a paginated JSON API into an on-disk result cache
//!
//! Startup wires the collaborators together: configuration supplies the
//! initial query template and the results directory, the status server
//! exposes home/echo/exit routes, and the crawler runs the fetch/merge/
//! persist pipeline. The initial chain is dispatched once the listener is
//! up, mirroring a post-listen startup hook.

use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagewalk::cli::Cli;
use pagewalk::config::Config;
use pagewalk::crawler::{self, Crawler};
use pagewalk::server::{self, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration errors are the one fatal class; everything downstream is
    // logged and folded into partial results by the crawler.
    let config = Config::load(&cli.config_path()?)?;
    let init_query = config.init_query()?;
    let root_dir = match cli.root_dir {
        Some(root_dir) => root_dir,
        None => config.root_dir()?,
    };
    let port = match cli.port {
        Some(port) => port,
        None => config.port()?,
    };

    let listener =
        tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
    let addr = listener.local_addr()?;
    info!(%addr, root_dir = %root_dir.display(), "listening");

    let (shutdown_tx, mut shutdown_rx) = server::shutdown_channel();
    let app = server::router(ServerState::new(addr, shutdown_tx));

    let (handle, crawler_task) = Crawler::spawn(root_dir);

    // Startup hook: dispatch the initial chain now that the server listens.
    let hook = tokio::spawn(crawler::on_started(handle, init_query));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.recv().await;
            info!("shutdown requested");
        })
        .await?;

    // All handles are gone once the hook finishes, letting the crawler
    // drain its queue and exit.
    hook.await?;
    crawler_task.await?;

    Ok(())
}
