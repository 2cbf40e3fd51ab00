use serde::Serialize;
use url::Url;

use crate::constants::{SAFE_APP_BASE_URL, SAFE_TX_SERVICE_BASE_URL};
use crate::error::{AppError, Result};

/// One Safe transaction-service deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
    pub name: String,
    pub base_url: String,
    pub chain_id: u64,
    /// Prefix used by the Safe web app, e.g. `matic` in `matic:0x...`.
    pub app_slug: String,
}

// (name, tx-service code, chain id, app slug)
const DEFAULT_NETWORKS: &[(&str, &str, u64, &str)] = &[
    ("ethereum", "eth", 1, "eth"),
    ("polygon", "pol", 137, "matic"),
    ("optimism", "oeth", 10, "oeth"),
    ("bnb", "bnb", 56, "bnb"),
    ("arbitrum", "arb1", 42161, "arb1"),
    ("gnosis", "gno", 100, "gno"),
    ("xlaychain", "okb", 196, "okb"),
];

impl NetworkDescriptor {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        chain_id: u64,
        app_slug: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            chain_id,
            app_slug: app_slug.into(),
        }
    }

    pub fn owner_safes_url(&self, owner: &str) -> String {
        format!(
            "{}/api/v2/owners/{}/safes/",
            self.base_url.trim_end_matches('/'),
            owner
        )
    }

    pub fn safe_details_url(&self, safe: &str) -> String {
        format!(
            "{}/api/v1/safes/{}/",
            self.base_url.trim_end_matches('/'),
            safe
        )
    }

    /// Whether `link` shares scheme, host and port with `base_url`.
    pub fn is_same_origin(&self, link: &str) -> bool {
        match (Url::parse(&self.base_url), Url::parse(link)) {
            (Ok(base), Ok(link)) => base.origin() == link.origin(),
            _ => false,
        }
    }

    /// Deep link into the Safe web app for `safe` on this network.
    pub fn safe_app_url(&self, safe: &str) -> String {
        format!("{}/home?safe={}:{}", SAFE_APP_BASE_URL, self.app_slug, safe)
    }
}

pub fn default_networks() -> Vec<NetworkDescriptor> {
    DEFAULT_NETWORKS
        .iter()
        .map(|(name, code, chain_id, slug)| {
            NetworkDescriptor::new(
                *name,
                format!("{}/{}", SAFE_TX_SERVICE_BASE_URL, code),
                *chain_id,
                *slug,
            )
        })
        .collect()
}

/// Restricts `networks` to `names`, keeping registry order.
pub fn select_networks(
    networks: Vec<NetworkDescriptor>,
    names: &[String],
) -> Result<Vec<NetworkDescriptor>> {
    if names.is_empty() {
        return Ok(networks);
    }

    let wanted: Vec<String> = names.iter().map(|n| n.trim().to_ascii_lowercase()).collect();
    if let Some(unknown) = wanted
        .iter()
        .find(|name| !networks.iter().any(|n| &n.name == *name))
    {
        return Err(AppError::Configuration(format!(
            "Unknown network in SAFE_NETWORKS: {}",
            unknown
        )));
    }

    Ok(networks
        .into_iter()
        .filter(|n| wanted.contains(&n.name))
        .collect())
}
