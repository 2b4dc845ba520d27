// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Weather Data Service - Telemetry Ingestion API
//!
//! Agents register and push timestamped sensor readings for named
//! variables; users query the stored series. Every business request runs
//! inside a single storage transaction, and every caller is authenticated
//! with HTTP Basic (users) or an agent token (agents).
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and the OpenAPI document
//! - `auth` - Credential hashing, verification and typed principals
//! - `executor` - Transactional request execution
//! - `server` - Listener lifecycle and graceful shutdown
//! - `storage` - Embedded transactional storage (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod server;
pub mod state;
pub mod storage;
pub mod telemetry;
