//! # Veil Server
//!
//! REST front end for the encrypting dispatcher, built on `axum` and `axum-server`.
//! API documentation is served under `/scalar`.
//!
//! ## Example
//! ```no_run
//! use veil_server::Server;
//! use veil_domain::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .config(AppConfig::default())
//!         .port(8080)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod error;
mod handlers;
mod router;
mod state;

pub use error::{ApiError, ApiErrorExt, ErrorResponse};
pub use router::init as app;
pub use state::ApiState;

use anyhow::{Context, Result};
use axum_server::Handle;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use veil_core::bootstrap;
use veil_domain::config::AppConfig;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: AppConfig,
}

impl ServerBuilder {
    pub fn config(mut self, cfg: AppConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    fn validate_tls_config(&self) -> Result<()> {
        if let Some(tls) = &self.cfg.server.tls {
            if !tls.cert.exists() {
                anyhow::bail!("TLS certificate not found at: {}", tls.cert.display());
            }
            if !tls.key.exists() {
                anyhow::bail!("TLS key not found at: {}", tls.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = tls.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    warn!(
                        "SECURITY: TLS private key {} has insecure permissions (should be 600)",
                        tls.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Builds the key ring, connects to the store and prepares the router state.
    ///
    /// # Errors
    /// Returns an error if:
    /// * TLS certificate or key files are missing
    /// * key material is missing or malformed
    /// * the store cannot be reached
    pub async fn build(self) -> Result<Server> {
        self.validate_tls_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let state = Context::context(
            bootstrap::secure_store(&self.cfg).await,
            "Failed to initialize the store",
        )?;
        Ok(Server { cfg: self.cfg, state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    cfg: AppConfig,
    state: ApiState,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Serves requests until Ctrl+C or SIGTERM, then drains connections.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind or TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, tls = self.cfg.server.tls.is_some(), "Starting server");

        let app = router::init(self.state);

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        if let Some(tls) = &self.cfg.server.tls {
            info!("Starting HTTPS server on https://{address}");
            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                    .await
                    .context("Failed to load TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        } else {
            info!("Starting HTTP server on http://{address}");
            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")?;
        }

        info!("Server shutdown complete");
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }
    Ok(())
}
