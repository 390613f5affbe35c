//! Local web UI for the workbook.

pub mod assets;
pub mod routes;
pub mod templates;

pub use assets::{content_type, StaticAssets};
pub use routes::{build_router, AppState};
pub use templates::{markdown_to_html, PageView, TemplateEngine, Templates};

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::signal;

use crate::config::DEFAULT_PORT;
use crate::session::Storage;
use crate::steps::Variant;

/// Find an available port starting from the given base port.
///
/// Tries ports sequentially until finding one that's available.
/// Returns the available port number.
pub fn find_available_port(base_port: u16) -> Option<u16> {
    (base_port..=base_port.saturating_add(100))
        .find(|&port| TcpListener::bind(("127.0.0.1", port)).is_ok())
}

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base port to try binding to (defaults to 3000).
    pub base_port: u16,
    /// Whether to open the browser automatically.
    pub open_browser: bool,
    /// Prompt library CSV loaded at startup, if present.
    pub bundled_csv: Option<PathBuf>,
    /// Variant shown when the URL does not name one.
    pub default_variant: Variant,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_PORT,
            open_browser: true,
            bundled_csv: None,
            default_variant: Variant::A,
        }
    }
}

/// Run the web server over the session saved in `storage`.
///
/// This function will:
/// 1. Open the saved session and load the bundled prompt library
/// 2. Find an available port starting from `config.base_port`
/// 3. Optionally open the browser
/// 4. Wait for Ctrl+C to gracefully shut down
pub async fn run_server(storage: Arc<dyn Storage>, config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(storage, config.default_variant)?
        .with_bundled_csv(config.bundled_csv.clone());
    state.load_bundled_prompts()?;

    let port = find_available_port(config.base_port)
        .ok_or_else(|| anyhow::anyhow!("No available port found"))?;

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let url = format!("http://{}", addr);

    let app = build_router(Arc::new(state));
    let listener = TokioTcpListener::bind(addr).await?;

    tracing::info!(%addr, "server listening");
    println!("Workbook running at: {}", url);
    println!("Press Ctrl+C to stop");

    if config.open_browser {
        if let Err(e) = webbrowser::open(&url) {
            tracing::warn!(error = %e, "failed to open browser");
            eprintln!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    println!("\nServer stopped");
    Ok(())
}

/// Wait for the shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
