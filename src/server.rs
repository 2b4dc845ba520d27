// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP server lifecycle.
//!
//! [`Server`] is owned by whoever starts it (`main`, or a test). Cancelling
//! its [`CancellationToken`] stops accepting connections and gives in-flight
//! requests the grace window to finish; requests still running after that
//! are abandoned, and their storage transactions are rolled back when their
//! connections drop.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::router;
use crate::state::AppState;

pub struct Server {
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    grace: Duration,
}

impl Server {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: SocketAddr, state: AppState, grace: Duration) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: router(state),
            shutdown: CancellationToken::new(),
            grace,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until the shutdown token is cancelled, then drain for at most the
    /// grace window.
    pub async fn run(self) -> std::io::Result<()> {
        let Server {
            listener,
            router,
            shutdown,
            grace,
        } = self;

        let drain = shutdown.clone();
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain.cancelled_owned().await })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => return result,
            _ = shutdown.cancelled() => {
                info!(grace_ms = grace.as_millis() as u64, "Shutdown requested, draining in-flight requests");
            }
        }

        match tokio::time::timeout(grace, serve).await {
            Ok(result) => {
                info!("Server stopped");
                result
            }
            Err(_) => {
                warn!("Grace window elapsed, abandoning in-flight requests");
                Ok(())
            }
        }
    }
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}
