use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// Upstream transaction-service payloads

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub address: String,
    #[serde(default)]
    pub owners: Vec<String>,
    pub threshold: u32,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub master_copy: Option<String>,
    #[serde(default)]
    pub fallback_handler: Option<String>,
    #[serde(default)]
    pub guard: Option<String>,
    #[serde(default)]
    pub enabled_modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerSafesResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<SafeInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeDetails {
    pub address: String,
    #[serde(default)]
    pub nonce: Option<u64>,
    pub threshold: u32,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub master_copy: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub fallback_handler: Option<String>,
    #[serde(default)]
    pub guard: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

// Lookup results

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeRecord {
    pub address: String,
    pub threshold: u32,
    pub total_owners: usize,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRecord {
    pub address: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeOwnershipResult {
    pub address: String,
    pub name: Option<String>,
    pub threshold: u32,
    pub owners: Vec<OwnerRecord>,
}

/// Per-network results in registry order. A missing key means nothing was
/// found on that network (or the network failed).
pub type QueryResult<T> = IndexMap<String, T>;

pub type OwnerSafesResult = QueryResult<Vec<SafeRecord>>;
pub type SafeOwnersResult = QueryResult<SafeOwnershipResult>;
