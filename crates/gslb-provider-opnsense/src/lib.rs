// # OPNsense GSLB Provider
//
// This crate steers an OPNsense Unbound host override between the primary
// and secondary address.
//
// ## Behavior
//
// - The host override UUID is resolved once, when the provider is created
// - Every read goes to the firewall; nothing is cached between calls
// - A switch keeps the override's record type and fields and replaces only
//   the server address, then reconfigures Unbound
// - A switch to the address the override already serves writes nothing
// - Dry-run mode performs reads but only logs the writes
// - No retries: a failed call fails the cycle, the next cycle tries again
//
// ## Security Requirements
//
// - API credentials NEVER appear in logs or `Debug` output
// - Credentials are sent as HTTP Basic auth, `key:secret`
//
// ## API Reference
//
// - Search overrides: POST `/api/unbound/settings/searchHostOverride/`
// - Read override: GET `/api/unbound/settings/getHostOverride/:uuid`
// - Update override: POST `/api/unbound/settings/setHostOverride/:uuid`
// - Apply changes: POST `/api/unbound/service/reconfigure`

use async_trait::async_trait;
use gslb_core::config::ProviderConfig;
use gslb_core::evaluator::ips_equal;
use gslb_core::traits::{GslbProvider, GslbProviderFactory};
use gslb_core::{Error, FailoverTarget, FailoverTargets, ProviderRegistry, Result};

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Provider name used in errors and the registry
const PROVIDER_NAME: &str = "opnsense";

/// Timeout for every API request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Rows requested from searchHostOverride
const SEARCH_ROW_COUNT: u32 = 10;

const SEARCH_PATH: &str = "/api/unbound/settings/searchHostOverride/";
const GET_PATH: &str = "/api/unbound/settings/getHostOverride/";
const SET_PATH: &str = "/api/unbound/settings/setHostOverride/";
const RECONFIGURE_PATH: &str = "/api/unbound/service/reconfigure";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    #[serde(rename = "rowCount")]
    row_count: u32,
    #[serde(rename = "searchPhrase")]
    search_phrase: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    rows: Vec<SearchRow>,
}

/// One row of a searchHostOverride answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchRow {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub domain: String,
    /// Human readable record type, e.g. "A (IPv4 address)"
    #[serde(default)]
    pub rr: String,
}

impl SearchRow {
    fn is_address_record(&self) -> bool {
        self.rr.starts_with("A ") || self.rr.starts_with("AAAA ")
    }

    fn matches(&self, host: &str) -> bool {
        self.hostname == host || format!("{}.{}", self.hostname, self.domain) == host
    }
}

/// Pick the UUID of the single address override that serves `host`
///
/// `host` may be given bare ("app") or fully qualified ("app.example.com").
/// Rows of other record types are ignored.
pub fn select_record_uuid(rows: &[SearchRow], host: &str) -> Result<String> {
    let mut found: Option<&SearchRow> = None;

    for row in rows.iter().filter(|row| row.is_address_record()) {
        if !row.matches(host) {
            continue;
        }
        if found.is_some() {
            return Err(Error::record(format!(
                "multiple GSLB records found for hostname {}",
                host
            )));
        }
        found = Some(row);
    }

    found.map(|row| row.uuid.clone()).ok_or_else(|| {
        Error::record(format!("no GSLB record found for hostname {}", host))
    })
}

/// Address record type of a host override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecordOption {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub selected: i64,
}

/// The record type selector as returned by getHostOverride
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecordChoice {
    #[serde(rename = "A", default)]
    pub a: RecordOption,
    #[serde(rename = "AAAA", default)]
    pub aaaa: RecordOption,
}

/// A host override as returned by getHostOverride
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HostOverride {
    #[serde(default)]
    pub enabled: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub rr: RecordChoice,
    #[serde(default)]
    pub mxprio: String,
    #[serde(default)]
    pub mx: String,
    #[serde(default)]
    pub ttl: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub description: String,
}

impl HostOverride {
    /// The selected address record type, A taking precedence
    pub fn selected_type(&self) -> Option<RecordType> {
        if self.rr.a.selected == 1 {
            Some(RecordType::A)
        } else if self.rr.aaaa.selected == 1 {
            Some(RecordType::Aaaa)
        } else {
            None
        }
    }

    /// The address this override currently serves
    pub fn current_ip(&self) -> Result<&str> {
        match self.selected_type() {
            Some(record_type) if self.server.is_empty() => Err(Error::record(format!(
                "host override record has {} record selected but no server IP set",
                record_type
            ))),
            Some(_) => Ok(&self.server),
            None => Err(Error::record(
                "host override record has no A or AAAA record selected",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetHostOverrideResponse {
    host: HostOverride,
}

#[derive(Debug, Serialize)]
struct SetHostOverrideRequest<'a> {
    host: HostOverrideUpdate<'a>,
}

/// Body of setHostOverride: the existing fields with a new server address
#[derive(Debug, Serialize)]
struct HostOverrideUpdate<'a> {
    enabled: &'a str,
    hostname: &'a str,
    domain: &'a str,
    rr: &'a str,
    mxprio: &'a str,
    mx: &'a str,
    ttl: &'a str,
    server: &'a str,
    description: &'a str,
}

impl<'a> HostOverrideUpdate<'a> {
    fn replacing_server(current: &'a HostOverride, record_type: RecordType, server: &'a str) -> Self {
        Self {
            enabled: &current.enabled,
            hostname: &current.hostname,
            domain: &current.domain,
            rr: record_type.as_str(),
            mxprio: &current.mxprio,
            mx: &current.mx,
            ttl: &current.ttl,
            server,
            description: &current.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetHostOverrideResponse {
    #[serde(default)]
    result: String,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    response: String,
}

/// OPNsense Unbound host override provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all reads (search, getHostOverride)
/// - Log the intended setHostOverride payload
/// - **NOT** modify the override or reconfigure Unbound
pub struct OpnSenseProvider {
    /// Base URL of the firewall, without trailing slash
    endpoint: String,

    /// API key, the part of "key:secret" before the first colon
    api_key: String,

    /// API secret
    /// ⚠️ NEVER log this value
    api_secret: String,

    /// Name of the managed record
    host: String,

    /// UUID of the managed host override
    record_uuid: String,

    /// Primary and secondary address
    targets: FailoverTargets,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: perform reads but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl fmt::Debug for OpnSenseProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpnSenseProvider")
            .field("endpoint", &self.endpoint)
            .field("credentials", &"<REDACTED>")
            .field("host", &self.host)
            .field("record_uuid", &self.record_uuid)
            .field("targets", &self.targets)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl OpnSenseProvider {
    /// Create a provider and resolve the managed host override
    ///
    /// Fails if the credentials are not of the form `key:secret`, the firewall
    /// cannot be reached, or `host` does not match exactly one A/AAAA override.
    pub async fn connect(
        endpoint: impl Into<String>,
        auth: impl Into<String>,
        host: impl Into<String>,
        targets: FailoverTargets,
        dry_run: bool,
    ) -> Result<Self> {
        let auth = auth.into();
        if auth.is_empty() {
            return Err(Error::config("OPNsense API credentials cannot be empty"));
        }
        let (api_key, api_secret) = auth.split_once(':').ok_or_else(|| {
            Error::config("OPNsense API credentials must have the form key:secret")
        })?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let mut provider = Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            host: host.into(),
            record_uuid: String::new(),
            targets,
            client,
            dry_run,
        };

        provider.record_uuid = provider
            .search_record_uuid()
            .await
            .map_err(|e| e.context("getting GSLB record"))?;

        tracing::info!(
            "Managing OPNsense host override {} for {} [mode: {}]",
            provider.record_uuid,
            provider.host,
            if dry_run { "DRY-RUN" } else { "LIVE" }
        );

        Ok(provider)
    }

    /// UUID of the managed host override
    pub fn record_uuid(&self) -> &str {
        &self.record_uuid
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.api_key, Some(&self.api_secret))
    }

    /// Send a request and decode a 200 answer as `T`
    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let response = self
            .authorize(request)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request: {}", operation, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(operation, status, &error_text));
        }

        response.json::<T>().await.map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("decoding {} response: {}", operation, e),
            )
        })
    }

    async fn search_record_uuid(&self) -> Result<String> {
        tracing::debug!("Searching OPNsense host overrides for {}", self.host);

        let request = self.client.post(self.url(SEARCH_PATH)).json(&SearchRequest {
            row_count: SEARCH_ROW_COUNT,
            search_phrase: &self.host,
        });
        let response: SearchResponse = self.call(request, "searchHostOverride").await?;

        select_record_uuid(&response.rows, &self.host)
    }

    async fn host_override(&self) -> Result<HostOverride> {
        let url = self.url(&format!("{}{}", GET_PATH, self.record_uuid));
        let response: GetHostOverrideResponse =
            self.call(self.client.get(url), "getHostOverride").await?;
        Ok(response.host)
    }

    async fn reconfigure(&self) -> Result<()> {
        let response: ServiceResponse = self
            .call(self.client.post(self.url(RECONFIGURE_PATH)), "reconfigure")
            .await?;

        if response.response != "OK" {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!(
                    "reconfigure request failed: unexpected result {}",
                    response.response
                ),
            ));
        }
        Ok(())
    }

    async fn switch_to(&self, target: FailoverTarget) -> Result<()> {
        let ip = self.targets.ip(target);

        let current = self
            .host_override()
            .await
            .map_err(|e| e.context("getting host override"))?;

        let record_type = current.selected_type().ok_or_else(|| {
            Error::record("host override record has no A or AAAA record selected")
        })?;

        if !current.server.is_empty() && ips_equal(&current.server, ip) {
            tracing::info!(
                "Host override for {} already serves {} IP {}",
                self.host,
                target,
                ip
            );
            return Ok(());
        }

        let body = SetHostOverrideRequest {
            host: HostOverrideUpdate::replacing_server(&current, record_type, ip),
        };
        let set_url = self.url(&format!("{}{}", SET_PATH, self.record_uuid));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                set_url,
                serde_json::to_string(&body)?
            );
            tracing::info!("[DRY-RUN] Would reconfigure Unbound");
            return Ok(());
        }

        let response: SetHostOverrideResponse = self
            .call(self.client.post(&set_url).json(&body), "setHostOverride")
            .await?;

        if response.result != "saved" {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!(
                    "setHostOverride request failed: unexpected result {}",
                    response.result
                ),
            ));
        }

        self.reconfigure()
            .await
            .map_err(|e| e.context("restarting Unbound service"))?;

        tracing::info!(
            "Host override for {} updated: {} -> {} ({})",
            self.host,
            current.server,
            ip,
            record_type
        );
        Ok(())
    }
}

/// Map a non-200 answer to an error
fn status_error(operation: &str, status: StatusCode, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{} rejected: invalid API credentials or insufficient privileges. Status: {}",
            operation, status
        )),
        404 => Error::not_found(format!("{} returned {}", operation, status)),
        429 => Error::provider(
            PROVIDER_NAME,
            format!("Rate limit exceeded during {}. Status: {}", operation, status),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!(
                "OPNsense server error (transient) during {}: {} - {}",
                operation, status, error_text
            ),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} request failed: {} - {}", operation, status, error_text),
        ),
    }
}

#[async_trait]
impl GslbProvider for OpnSenseProvider {
    async fn current_ip(&self) -> Result<String> {
        let current = self
            .host_override()
            .await
            .map_err(|e| e.context("getting host override"))?;
        current.current_ip().map(str::to_string)
    }

    async fn switch_to_primary(&self) -> Result<()> {
        self.switch_to(FailoverTarget::Primary).await
    }

    async fn switch_to_secondary(&self) -> Result<()> {
        self.switch_to(FailoverTarget::Secondary).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating OPNsense providers
pub struct OpnSenseFactory;

#[async_trait]
impl GslbProviderFactory for OpnSenseFactory {
    async fn create(
        &self,
        config: &ProviderConfig,
        host: &str,
        targets: &FailoverTargets,
    ) -> Result<Box<dyn GslbProvider>> {
        match config {
            ProviderConfig::OpnSense {
                endpoint,
                auth,
                dry_run,
            } => {
                if endpoint.is_empty() {
                    return Err(Error::config("OPNsense endpoint is required"));
                }
                if *dry_run {
                    tracing::warn!(
                        "OPNsense provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let provider = OpnSenseProvider::connect(
                    endpoint.clone(),
                    auth.clone(),
                    host,
                    targets.clone(),
                    *dry_run,
                )
                .await?;
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for OPNsense provider")),
        }
    }
}

/// Register the OPNsense provider with a registry
///
/// # Example
///
/// ```rust
/// use gslb_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// gslb_provider_opnsense::register(&registry);
/// assert!(registry.has_provider("opnsense"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(OpnSenseFactory));
}
