// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured logging setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, DEFAULT_LOG_FILTER};

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Calling this twice is harmless: the second call
/// leaves the first subscriber in place.
pub fn init(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
