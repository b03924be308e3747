use std::collections::BTreeSet;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::ZonesConfig;
use crate::notifications::channel::REQUEST_TIMEOUT;
use crate::zones::snapshot::ZoneSnapshot;

const DEFAULT_PAGE_SIZE: usize = 50;
// Backstop against a provider that keeps returning hasNextPage=true.
const MAX_PAGES: usize = 200;

const ACCOUNTS_QUERY: &str = "\
query Accounts($first: Int!, $after: String) {
  accounts(first: $first, after: $after) {
    edges { node { id name } }
    pageInfo { hasNextPage endCursor }
  }
}";

const ACCOUNT_ZONES_QUERY: &str = "\
query AccountZones($account: ID!, $first: Int!, $after: String) {
  account(id: $account) {
    soundZones(first: $first, after: $after) {
      edges { node { id isPaired } }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("zone api is not configured: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("query failed: {0}")]
    Query(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// A per-account discovery failure. `account_id` is `None` when the
/// top-level accounts query itself failed.
#[derive(Debug, Clone)]
pub struct AccountFailure {
    pub account_id: Option<String>,
    pub message: String,
}

/// Aggregate outcome of one discovery run. Partial results are explicit:
/// zones from healthy accounts plus one failure entry per broken account.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub zones: BTreeSet<String>,
    pub failures: Vec<AccountFailure>,
}

impl Discovery {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZoneInventory {
    pub snapshots: Vec<ZoneSnapshot>,
    pub failures: Vec<AccountFailure>,
}

/// GraphQL client for the zone/account provider. All traversal is
/// sequential: one paginated accounts query, then one paginated sound-zones
/// query per account.
#[derive(Debug)]
pub struct ZoneApiClient {
    client: reqwest::Client,
    endpoint: String,
    auth_header: String,
    page_size: usize,
}

impl ZoneApiClient {
    pub fn new(config: Option<&ZonesConfig>) -> Result<Self, DiscoveryError> {
        let config = config
            .ok_or_else(|| DiscoveryError::Configuration("zones section missing".to_string()))?;
        if let Some(reason) = config.disabled_reason() {
            return Err(DiscoveryError::Configuration(reason));
        }
        let endpoint = config.endpoint.clone().unwrap_or_default();
        url::Url::parse(&endpoint)
            .map_err(|err| DiscoveryError::Configuration(format!("invalid endpoint: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| DiscoveryError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            auth_header: format!("Basic {}", config.api_token.as_deref().unwrap_or_default()),
            page_size: config.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }

    /// Enumerates every zone id visible to the configured credentials.
    /// A broken account sub-query is recorded and skipped; a broken
    /// accounts query yields an empty set with one failure entry.
    pub async fn discover_all(&self) -> Discovery {
        let inventory = self.snapshot_all().await;
        Discovery {
            zones: inventory
                .snapshots
                .into_iter()
                .map(|snapshot| snapshot.zone_id)
                .collect(),
            failures: inventory.failures,
        }
    }

    /// Same traversal as [`discover_all`], keeping the account id and
    /// pairing flag per zone.
    pub async fn snapshot_all(&self) -> ZoneInventory {
        let mut inventory = ZoneInventory::default();
        let accounts = match self.fetch_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::error!(
                    event = "discovery_failed",
                    error = %err,
                    "accounts query failed, returning empty discovery"
                );
                inventory.failures.push(AccountFailure {
                    account_id: None,
                    message: err.to_string(),
                });
                return inventory;
            }
        };

        for account in accounts {
            match self.fetch_account_zones(&account.id).await {
                Ok(zones) => {
                    for zone in zones {
                        inventory.snapshots.push(ZoneSnapshot {
                            zone_id: zone.id,
                            account_id: account.id.clone(),
                            is_paired: zone.is_paired,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        event = "discovery_account_skipped",
                        account_id = %account.id,
                        error = %err,
                        "zone sub-query failed, continuing with remaining accounts"
                    );
                    inventory.failures.push(AccountFailure {
                        account_id: Some(account.id.clone()),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            event = "discovery_complete",
            zones = inventory.snapshots.len(),
            failed_accounts = inventory.failures.len(),
            "discovery run finished"
        );
        inventory
    }

    async fn fetch_accounts(&self) -> Result<Vec<AccountNode>, DiscoveryError> {
        let mut accounts = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let variables = json!({ "first": self.page_size, "after": cursor });
            let data: AccountsData = self.post_query(ACCOUNTS_QUERY, variables).await?;
            let connection = data.accounts;
            accounts.extend(connection.edges.into_iter().map(|edge| edge.node));
            if !connection.page_info.has_next_page {
                return Ok(accounts);
            }
            match connection.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(accounts),
            }
        }
        Ok(accounts)
    }

    async fn fetch_account_zones(&self, account_id: &str) -> Result<Vec<ZoneNode>, DiscoveryError> {
        let mut zones = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let variables =
                json!({ "account": account_id, "first": self.page_size, "after": cursor });
            let data: AccountZonesData = self.post_query(ACCOUNT_ZONES_QUERY, variables).await?;
            let account = data.account.ok_or_else(|| {
                DiscoveryError::Query(format!("account {account_id} not visible"))
            })?;
            let connection = account.sound_zones;
            zones.extend(connection.edges.into_iter().map(|edge| edge.node));
            if !connection.page_info.has_next_page {
                return Ok(zones);
            }
            match connection.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(zones),
            }
        }
        Ok(zones)
    }

    async fn post_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, DiscoveryError> {
        let payload = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.auth_header)
            .json(&payload)
            .send()
            .await
            .map_err(|err| DiscoveryError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| DiscoveryError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_payload(&text)
    }
}

/// Decodes a GraphQL envelope. Responses carrying both `data` and `errors`
/// are treated as usable partial data; each error is logged at warn level.
fn parse_payload<T: DeserializeOwned>(body: &str) -> Result<T, DiscoveryError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|err| DiscoveryError::Decode(err.to_string()))?;
    for error in &envelope.errors {
        tracing::warn!(
            event = "graphql_error",
            detail = %error.message,
            "provider reported a query error"
        );
    }
    match envelope.data {
        Some(data) => Ok(data),
        None => {
            let joined = envelope
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if joined.is_empty() {
                Err(DiscoveryError::Decode("response carried no data".to_string()))
            } else {
                Err(DiscoveryError::Query(joined))
            }
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct AccountsData {
    accounts: Connection<AccountNode>,
}

#[derive(Deserialize)]
struct AccountZonesData {
    account: Option<AccountZones>,
}

#[derive(Deserialize)]
struct AccountZones {
    #[serde(rename = "soundZones")]
    sound_zones: Connection<ZoneNode>,
}

#[derive(Deserialize, Debug)]
struct Connection<T> {
    #[serde(default)]
    edges: Vec<Edge<T>>,
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
}

#[derive(Deserialize, Debug)]
struct Edge<T> {
    node: T,
}

#[derive(Deserialize, Default, Debug)]
struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AccountNode {
    id: String,
    #[allow(dead_code)]
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ZoneNode {
    id: String,
    #[serde(rename = "isPaired", default)]
    is_paired: bool,
}
