//! Minimal status and control HTTP server
//!
//! Three routes, none of which touch the cache: a home page, an `/exit`
//! route that signals graceful shutdown, and a fallback echo page that
//! reflects the request URI back at the caller.

use std::net::SocketAddr;

use axum::{extract::State, http::Uri, response::Html, routing::get, Router};
use tokio::sync::mpsc;

/// Shared state for the status routes
#[derive(Debug, Clone)]
pub struct ServerState {
    addr: SocketAddr,
    shutdown: mpsc::Sender<()>,
}

impl ServerState {
    /// Creates server state advertising `addr` on its pages and signalling
    /// shutdown through `shutdown`
    pub fn new(addr: SocketAddr, shutdown: mpsc::Sender<()>) -> Self {
        Self { addr, shutdown }
    }
}

/// Creates the shutdown signal pair: the sender goes into `ServerState`, the
/// receiver feeds `axum::serve(...).with_graceful_shutdown`.
pub fn shutdown_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

/// Builds the three-route status router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/exit", get(exit))
        .fallback(echo)
        .with_state(state)
}

async fn home(State(state): State<ServerState>) -> Html<String> {
    Html(format!(
        "<html><body><p>pagewalk home http://{}</p></body></html>",
        state.addr
    ))
}

async fn echo(State(state): State<ServerState>, uri: Uri) -> Html<String> {
    Html(format!(
        "<html><body><p>pagewalk echo http://{}{}</p></body></html>",
        state.addr, uri
    ))
}

async fn exit(State(state): State<ServerState>) -> Html<&'static str> {
    // try_send because a second /exit while shutdown is pending is harmless.
    let _ = state.shutdown.try_send(());
    Html("<html><body><p>pagewalk shutting down</p></body></html>")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_server() -> (SocketAddr, tokio::task::JoinHandle<std::io::Result<()>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("listener has an address");
        let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
        let app = router(ServerState::new(addr, shutdown_tx));

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                })
                .await
        });

        (addr, server)
    }

    #[tokio::test]
    async fn test_home_page_names_the_server() {
        let (addr, server) = spawn_server().await;
        let client = reqwest::Client::new();

        let body = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should read");

        assert!(body.contains("pagewalk home"));
        assert!(body.contains(&addr.to_string()));

        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_fallback_echoes_request_uri() {
        let (addr, server) = spawn_server().await;
        let client = reqwest::Client::new();

        let body = client
            .get(format!("http://{addr}/some/unknown/route?x=1"))
            .send()
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should read");

        assert!(body.contains("pagewalk echo"));
        assert!(body.contains("/some/unknown/route?x=1"));

        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_exit_route_shuts_the_server_down() {
        let (addr, server) = spawn_server().await;
        let client = reqwest::Client::new();

        let body = client
            .get(format!("http://{addr}/exit"))
            .send()
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should read");
        assert!(body.contains("shutting down"));

        let result = server.await.expect("server task should not panic");
        assert!(result.is_ok(), "graceful shutdown should finish cleanly");
    }
}
