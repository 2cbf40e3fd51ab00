use futures_util::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    address::normalize_address,
    address_book::AddressBook,
    config::Config,
    constants::MAX_OWNER_SAFE_PAGES,
    error::{AppError, FetchError, Result},
    fetcher::RetryingFetcher,
    models::{
        OwnerRecord, OwnerSafesResponse, OwnerSafesResult, QueryResult, SafeDetails, SafeInfo,
        SafeOwnersResult, SafeOwnershipResult, SafeRecord,
    },
    networks::{default_networks, select_networks, NetworkDescriptor},
};

/// What one network contributed to a lookup.
#[derive(Debug)]
pub enum NetworkOutcome<T> {
    Found(T),
    Absent,
    Failed(FetchError),
}

/// Fans a lookup out over every configured network and merges the answers.
///
/// Each network is an independent best-effort sub-query: a 404 or an
/// exhausted retry on one network only drops that network's key from the
/// result. Only a malformed address or a missing API key fail the lookup.
#[derive(Debug, Clone)]
pub struct SafeLookup {
    networks: Arc<Vec<NetworkDescriptor>>,
    address_book: Arc<AddressBook>,
    fetcher: RetryingFetcher,
    api_key: Option<String>,
}

impl SafeLookup {
    pub fn new(
        networks: Vec<NetworkDescriptor>,
        address_book: Arc<AddressBook>,
        fetcher: RetryingFetcher,
        api_key: Option<String>,
    ) -> Self {
        Self {
            networks: Arc::new(networks),
            address_book,
            fetcher,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let networks = select_networks(default_networks(), &config.safe_networks)?;
        let address_book = AddressBook::load(config.address_book_path.as_deref())?;
        let fetcher = RetryingFetcher::from_config(config)?;

        tracing::info!(
            "Loaded {} network(s) and {} address book entries",
            networks.len(),
            address_book.len()
        );

        Ok(Self::new(
            networks,
            Arc::new(address_book),
            fetcher,
            config.safe_api_key.clone(),
        ))
    }

    pub fn networks(&self) -> &[NetworkDescriptor] {
        &self.networks
    }

    pub fn network(&self, name: &str) -> Option<&NetworkDescriptor> {
        self.networks.iter().find(|n| n.name == name)
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Configuration("SAFE_API_KEY is not set".to_string()))
    }

    /// Safes owned by `owner`, keyed by network name.
    pub async fn safes_by_owner(&self, owner: &str) -> Result<OwnerSafesResult> {
        let api_key = self.api_key()?;
        let owner = normalize_address(owner)?;

        let outcomes = join_all(
            self.networks
                .iter()
                .map(|network| self.owner_safes_on(network, &owner, api_key)),
        )
        .await;

        Ok(fold_outcomes(&self.networks, outcomes))
    }

    /// Owners and threshold of `safe` on every network where it exists.
    pub async fn owners_by_safe(&self, safe: &str) -> Result<SafeOwnersResult> {
        let api_key = self.api_key()?;
        let safe = normalize_address(safe)?;

        let outcomes = join_all(
            self.networks
                .iter()
                .map(|network| self.safe_details_on(network, &safe, api_key)),
        )
        .await;

        Ok(fold_outcomes(&self.networks, outcomes))
    }

    async fn owner_safes_on(
        &self,
        network: &NetworkDescriptor,
        owner: &str,
        api_key: &str,
    ) -> NetworkOutcome<Vec<SafeRecord>> {
        let mut safes = Vec::new();
        let mut next = Some(network.owner_safes_url(owner));
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_OWNER_SAFE_PAGES {
                tracing::warn!(
                    "{}: stopped after {} pages of safes for {}",
                    network.name,
                    pages,
                    owner
                );
                break;
            }
            pages += 1;

            let page: OwnerSafesResponse = match self.fetcher.get_json(&url, api_key).await {
                Ok(page) => page,
                Err(FetchError::NotFound) if safes.is_empty() => return NetworkOutcome::Absent,
                Err(FetchError::NotFound) => break,
                Err(err) => return NetworkOutcome::Failed(err),
            };

            safes.extend(
                page.results
                    .into_iter()
                    .map(|safe| self.safe_record(network, safe)),
            );
            next = match page.next.filter(|link| !link.trim().is_empty()) {
                Some(link) if network.is_same_origin(&link) => Some(link),
                Some(link) => {
                    tracing::warn!(
                        "{}: not following next link on another origin: {}",
                        network.name,
                        link
                    );
                    None
                }
                None => None,
            };
        }

        if safes.is_empty() {
            NetworkOutcome::Absent
        } else {
            NetworkOutcome::Found(safes)
        }
    }

    async fn safe_details_on(
        &self,
        network: &NetworkDescriptor,
        safe: &str,
        api_key: &str,
    ) -> NetworkOutcome<SafeOwnershipResult> {
        let url = network.safe_details_url(safe);
        match self.fetcher.get_json::<SafeDetails>(&url, api_key).await {
            Ok(details) => NetworkOutcome::Found(self.ownership_result(network, details)),
            Err(FetchError::NotFound) => NetworkOutcome::Absent,
            Err(err) => NetworkOutcome::Failed(err),
        }
    }

    fn safe_record(&self, network: &NetworkDescriptor, safe: SafeInfo) -> SafeRecord {
        let address = canonical_or_raw(safe.address);
        SafeRecord {
            name: self.name_for(network, &address),
            threshold: safe.threshold,
            total_owners: safe.owners.len(),
            address,
        }
    }

    fn ownership_result(
        &self,
        network: &NetworkDescriptor,
        details: SafeDetails,
    ) -> SafeOwnershipResult {
        let address = canonical_or_raw(details.address);
        let owners = details
            .owners
            .into_iter()
            .map(|owner| {
                let address = canonical_or_raw(owner);
                OwnerRecord {
                    name: self.name_for(network, &address),
                    address,
                }
            })
            .collect();

        SafeOwnershipResult {
            name: self.name_for(network, &address),
            address,
            threshold: details.threshold,
            owners,
        }
    }

    fn name_for(&self, network: &NetworkDescriptor, address: &str) -> Option<String> {
        self.address_book
            .name_for(network.chain_id, address)
            .map(str::to_string)
    }
}

// Upstream addresses are normally checksummed already; keep them verbatim if not parseable.
fn canonical_or_raw(address: String) -> String {
    normalize_address(&address).unwrap_or(address)
}

/// Keeps `Found` entries in network order, drops `Absent`, logs `Failed`.
pub fn fold_outcomes<T>(
    networks: &[NetworkDescriptor],
    outcomes: Vec<NetworkOutcome<T>>,
) -> QueryResult<T> {
    let mut result = IndexMap::new();
    for (network, outcome) in networks.iter().zip(outcomes) {
        match outcome {
            NetworkOutcome::Found(data) => {
                result.insert(network.name.clone(), data);
            }
            NetworkOutcome::Absent => {
                tracing::debug!("{}: nothing found", network.name);
            }
            NetworkOutcome::Failed(err) => {
                tracing::warn!("{}: {}", network.name, err);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_book::AddressBookEntry;
    use std::time::Duration;

    const OWNER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const SAFE: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const OWNER_B: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
    const OWNER_C: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";

    fn network(server: &mockito::Server, name: &str, chain_id: u64) -> NetworkDescriptor {
        NetworkDescriptor::new(name, format!("{}/{}", server.url(), name), chain_id, name)
    }

    fn lookup(networks: Vec<NetworkDescriptor>, api_key: Option<&str>) -> SafeLookup {
        let book = AddressBook::from_entries(vec![
            AddressBookEntry {
                address: SAFE.to_lowercase(),
                name: "Team Treasury".to_string(),
                chain_id: 1,
            },
            AddressBookEntry {
                address: OWNER.to_string(),
                name: "Alice".to_string(),
                chain_id: 1,
            },
        ]);
        let fetcher =
            RetryingFetcher::new(3, Duration::from_millis(1), Duration::from_secs(5))
                .expect("client should build");
        SafeLookup::new(networks, Arc::new(book), fetcher, api_key.map(str::to_string))
    }

    fn owner_path(network: &str) -> String {
        format!("/{}/api/v2/owners/{}/safes/", network, OWNER)
    }

    fn safe_path(network: &str) -> String {
        format!("/{}/api/v1/safes/{}/", network, SAFE)
    }

    fn owner_page(safes: serde_json::Value, next: Option<String>) -> String {
        serde_json::json!({
            "count": safes.as_array().map(|a| a.len()).unwrap_or(0),
            "next": next,
            "previous": null,
            "results": safes,
        })
        .to_string()
    }

    #[tokio::test]
    async fn invalid_address_fails_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let err = lookup.safes_by_owner("0x1234").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAddress(_)));
        let err = lookup.owners_by_safe("not-an-address").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAddress(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let server = mockito::Server::new_async().await;
        let lookup = lookup(vec![network(&server, "net1", 1)], None);

        assert!(matches!(
            lookup.safes_by_owner(OWNER).await,
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            lookup.safes_by_owner("garbage").await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn owner_lookup_builds_records_with_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", owner_path("net1").as_str())
            .match_header("authorization", "Bearer key")
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{
                    "address": SAFE,
                    "owners": [OWNER, OWNER_B, OWNER_C],
                    "threshold": 2,
                    "nonce": 0,
                    "masterCopy": null,
                    "fallbackHandler": null,
                    "guard": null,
                    "enabledModules": []
                }]),
                None,
            ))
            .expect(1)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup
            .safes_by_owner(&OWNER.to_lowercase())
            .await
            .expect("lookup should succeed");

        assert_eq!(
            serde_json::to_value(&result).expect("serialize"),
            serde_json::json!({
                "net1": [{
                    "address": SAFE,
                    "threshold": 2,
                    "totalOwners": 3,
                    "name": "Team Treasury"
                }]
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn all_not_found_is_an_empty_success() {
        let mut server = mockito::Server::new_async().await;
        let mocks = vec![
            server
                .mock("GET", owner_path("net1").as_str())
                .with_status(404)
                .expect(1)
                .create_async()
                .await,
            server
                .mock("GET", owner_path("net2").as_str())
                .with_status(404)
                .expect(1)
                .create_async()
                .await,
        ];
        let lookup = lookup(
            vec![network(&server, "net1", 1), network(&server, "net2", 137)],
            Some("key"),
        );

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert!(result.is_empty());
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn failing_network_does_not_hide_others() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(500)
            .expect(3)
            .create_async()
            .await;
        let healthy = server
            .mock("GET", owner_path("net2").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                None,
            ))
            .create_async()
            .await;
        let missing = server
            .mock("GET", owner_path("net3").as_str())
            .with_status(404)
            .create_async()
            .await;
        let lookup = lookup(
            vec![
                network(&server, "net1", 1),
                network(&server, "net2", 137),
                network(&server, "net3", 10),
            ],
            Some("key"),
        );

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["net2"]);
        assert_eq!(result["net2"][0].total_owners, 1);
        assert_eq!(result["net2"][0].name, None);
        failing.assert_async().await;
        healthy.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn empty_safe_list_contributes_no_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(serde_json::json!([]), None))
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn owner_lookup_follows_pagination_in_order() {
        let mut server = mockito::Server::new_async().await;
        let second_page = format!("{}/net1/page-2/", server.url());
        let first = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                Some(second_page),
            ))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/net1/page-2/")
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": OWNER_B, "owners": [OWNER, OWNER_C], "threshold": 2 }]),
                None,
            ))
            .expect(1)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        let addresses: Vec<&str> = result["net1"].iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, vec![SAFE, OWNER_B]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn failure_on_later_page_drops_network() {
        let mut server = mockito::Server::new_async().await;
        let second_page = format!("{}/net1/page-2/", server.url());
        let first = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                Some(second_page),
            ))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/net1/page-2/")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert!(result.is_empty());
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_on_later_page_keeps_earlier_pages() {
        let mut server = mockito::Server::new_async().await;
        let second_page = format!("{}/net1/page-2/", server.url());
        let _first = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                Some(second_page),
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/net1/page-2/")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert_eq!(result["net1"].len(), 1);
        assert_eq!(result["net1"][0].address, SAFE);
        second.assert_async().await;
    }

    #[tokio::test]
    async fn pagination_stops_at_page_cap() {
        let mut server = mockito::Server::new_async().await;
        let same_page = format!("{}{}", server.url(), owner_path("net1"));
        let looping = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                Some(same_page),
            ))
            .expect(MAX_OWNER_SAFE_PAGES)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert_eq!(result["net1"].len(), MAX_OWNER_SAFE_PAGES);
        looping.assert_async().await;
    }

    #[tokio::test]
    async fn next_link_on_another_origin_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", owner_path("net1").as_str())
            .with_status(200)
            .with_body(owner_page(
                serde_json::json!([{ "address": SAFE, "owners": [OWNER], "threshold": 1 }]),
                Some("http://attacker.invalid/collect".to_string()),
            ))
            .expect(1)
            .create_async()
            .await;
        let lookup = lookup(vec![network(&server, "net1", 1)], Some("key"));

        let result = lookup.safes_by_owner(OWNER).await.expect("lookup should succeed");
        assert_eq!(result["net1"].len(), 1);
        first.assert_async().await;
    }

    #[tokio::test]
    async fn safe_lookup_keeps_networks_separate() {
        let mut server = mockito::Server::new_async().await;
        let _mainnet = server
            .mock("GET", safe_path("net1").as_str())
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "address": SAFE,
                    "nonce": 3,
                    "threshold": 2,
                    "owners": [OWNER, OWNER_B],
                    "masterCopy": "0xd9Db270c1B5E3Bd161E8c8503c55cEABeE709552",
                    "modules": [],
                    "fallbackHandler": null,
                    "guard": null,
                    "version": "1.3.0"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _polygon = server
            .mock("GET", safe_path("net2").as_str())
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "address": SAFE,
                    "threshold": 1,
                    "owners": [OWNER_C.to_lowercase()]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _absent = server
            .mock("GET", safe_path("net3").as_str())
            .with_status(404)
            .create_async()
            .await;
        let lookup = lookup(
            vec![
                network(&server, "net1", 1),
                network(&server, "net2", 137),
                network(&server, "net3", 10),
            ],
            Some("key"),
        );

        let result = lookup
            .owners_by_safe(&SAFE.to_lowercase())
            .await
            .expect("lookup should succeed");

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["net1", "net2"]);

        let mainnet = &result["net1"];
        assert_eq!(mainnet.name.as_deref(), Some("Team Treasury"));
        assert_eq!(mainnet.threshold, 2);
        assert_eq!(
            mainnet.owners,
            vec![
                OwnerRecord {
                    address: OWNER.to_string(),
                    name: Some("Alice".to_string()),
                },
                OwnerRecord {
                    address: OWNER_B.to_string(),
                    name: None,
                },
            ]
        );

        let polygon = &result["net2"];
        assert_eq!(polygon.name, None);
        assert_eq!(polygon.threshold, 1);
        assert_eq!(polygon.owners.len(), 1);
        assert_eq!(polygon.owners[0].address, OWNER_C);
    }

    #[test]
    fn fold_keeps_order_and_drops_misses() {
        let networks = vec![
            NetworkDescriptor::new("a", "http://a", 1, "a"),
            NetworkDescriptor::new("b", "http://b", 2, "b"),
            NetworkDescriptor::new("c", "http://c", 3, "c"),
            NetworkDescriptor::new("d", "http://d", 4, "d"),
        ];
        let outcomes = vec![
            NetworkOutcome::Found(1),
            NetworkOutcome::Failed(FetchError::NotFound),
            NetworkOutcome::Absent,
            NetworkOutcome::Found(4),
        ];

        let result = fold_outcomes(&networks, outcomes);
        assert_eq!(result.into_iter().collect::<Vec<_>>(), vec![
            ("a".to_string(), 1),
            ("d".to_string(), 4),
        ]);
    }
}
