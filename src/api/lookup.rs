use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::AppState;
use crate::{
    error::{AppError, ErrorResponse, Result},
    models::{OwnerSafesResult, SafeOwnersResult},
};

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub query_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Safes that list the address as an owner.
    Owner,
    /// Owners of the Safe at the address.
    Safe,
}

impl FromStr for QueryType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "owner" => Ok(QueryType::Owner),
            "safe" => Ok(QueryType::Safe),
            other => Err(AppError::BadRequest(format!(
                "Unknown lookup type '{}', expected 'owner' or 'safe'",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LookupResponse {
    Owner { safes: OwnerSafesResult },
    Safe { safe: SafeOwnersResult },
}

/// `GET /api/lookup?address=0x..&type=owner|safe`
pub async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>> {
    let address = params
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("Address parameter is required".to_string()))?;
    let query_type = params
        .query_type
        .as_deref()
        .map(QueryType::from_str)
        .transpose()?
        .unwrap_or(QueryType::Owner);

    let response = match query_type {
        QueryType::Owner => state
            .lookup
            .safes_by_owner(address)
            .await
            .map(|safes| LookupResponse::Owner { safes }),
        QueryType::Safe => state
            .lookup
            .owners_by_safe(address)
            .await
            .map(|safe| LookupResponse::Safe { safe }),
    };

    match response {
        Ok(body) => Ok(Json(body)),
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!("Lookup for {} failed: {}", address, err);
            }
            Err(err)
        }
    }
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method not allowed".to_string(),
        }),
    )
}
