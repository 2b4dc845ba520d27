// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` or `Deserialize` and `ToSchema`
//! for JSON handling and OpenAPI documentation.
//!
//! Storage records in [`crate::storage::records`] carry credential material;
//! the response types here are the only shapes that leave the process.
//!
//! ## Model Categories
//!
//! - **Users**: Account registration
//! - **Agents**: Reporting devices and their issued tokens
//! - **Variables**: Named measurement series
//! - **Data**: Posted readings and queried series

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{Agent, Variable};

/// Response body for any create call that only reports the new id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CreatedResponse {
    pub id: u64,
}

// =============================================================================
// User Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Login email; must contain `@`.
    pub email: String,
    pub password: String,
}

// =============================================================================
// Agent Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAgentRequest {
    pub name: String,
}

/// Returned once, at creation. The token cannot be recovered later.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CreatedAgentResponse {
    pub id: u64,
    /// URL-safe base64 without padding.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AgentResponse {
    pub id: u64,
    pub name: String,
    pub created: DateTime<Utc>,
}

impl From<Agent> for AgentResponse {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
            created: agent.created,
        }
    }
}

// =============================================================================
// Variable Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariableRequest {
    pub name: String,
    pub units: String,
    /// Must be zero or greater.
    pub display_decimal_places: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariableResponse {
    pub id: u64,
    pub name: String,
    pub units: String,
    pub display_decimal_places: u32,
    pub created: DateTime<Utc>,
}

impl From<Variable> for VariableResponse {
    fn from(variable: Variable) -> Self {
        Self {
            id: variable.id,
            name: variable.name,
            units: variable.units,
            display_decimal_places: variable.display_decimal_places,
            created: variable.created,
        }
    }
}

// =============================================================================
// Data Models
// =============================================================================

/// A batch of readings taken at one instant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostDataPoints {
    pub time: DateTime<Utc>,
    pub data: Vec<PostDataPoint>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostDataPoint {
    /// Variable name.
    pub variable: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GetDataResult {
    pub data: Vec<GetDataResultVariable>,
}

/// One variable's series. `points` maps RFC 3339 timestamps to values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetDataResultVariable {
    pub id: u64,
    pub name: String,
    pub units: String,
    pub display_decimal_places: u32,
    pub points: BTreeMap<String, f64>,
}
