// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tracing::{error, info};

use weather_data_service::{
    config::Config,
    server::{shutdown_signal, Server},
    state::AppState,
    storage::Store,
    telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(config.log_format);

    let database_path = config.database_path();
    let store = match Store::open(&database_path) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, path = %database_path.display(), "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    match store.run_migrations() {
        Ok(applied) => info!(applied, path = %database_path.display(), "Database ready"),
        Err(e) => {
            error!(error = %e, "Failed to apply migrations");
            return ExitCode::FAILURE;
        }
    }

    let server = match Server::bind(config.bind_addr(), AppState::new(store), config.shutdown_timeout).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, addr = %config.bind_addr(), "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    match server.local_addr() {
        Ok(addr) => info!(%addr, "Weather data service listening on http://{addr} (docs at /docs)"),
        Err(e) => error!(error = %e, "Listener has no local address"),
    }

    let token = server.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    if let Err(e) = server.run().await {
        error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
