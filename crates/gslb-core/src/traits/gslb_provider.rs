// # GSLB Provider Trait
//
// Defines the port through which the failover evaluator reads and steers the
// managed DNS record.
//
// ## Implementations
//
// - OPNsense Unbound host overrides: `gslb-provider-opnsense` crate
// - Future: cloud DNS APIs, local zone file editors
//
// ## Usage
//
// ```rust,ignore
// use gslb_core::GslbProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* GslbProvider implementation */;
//
//     let current = provider.current_ip().await?;
//     if current != "192.0.2.10" {
//         provider.switch_to_primary().await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::evaluator::FailoverTargets;

/// Trait for DNS provider implementations
///
/// A provider owns exactly one managed record and knows the two addresses it
/// may point that record at. It answers "what does the record serve right now"
/// and performs the two switches. It decides nothing.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoint only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the scheduler's next tick is the retry)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Cache the record's address between calls
/// - ❌ Decide whether a switch is needed (owned by `FailoverEvaluator`)
///
/// The provider is the single source of truth for the record and may be edited
/// out-of-band, so every call must go to the backing service.
#[async_trait]
pub trait GslbProvider: Send + Sync {
    /// Address the managed record currently resolves to
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The configured address, exactly as the provider reports it
    /// - `Err(Error)`: If the request failed or the record is ambiguous or
    ///   incomplete (no address type selected, or no address value set)
    async fn current_ip(&self) -> Result<String, crate::Error>;

    /// Point the managed record at the primary address
    ///
    /// On success a subsequent [`current_ip`](Self::current_ip) returns the
    /// primary address. Calling this while already at the primary is harmless.
    async fn switch_to_primary(&self) -> Result<(), crate::Error>;

    /// Point the managed record at the secondary address
    ///
    /// On success a subsequent [`current_ip`](Self::current_ip) returns the
    /// secondary address. Calling this while already at the secondary is harmless.
    async fn switch_to_secondary(&self) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing GSLB providers from configuration
///
/// Creation is async because providers usually have to resolve the managed
/// record against their backend once before they can serve requests.
#[async_trait]
pub trait GslbProviderFactory: Send + Sync {
    /// Create a GslbProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    /// - `host`: Name of the managed record
    /// - `targets`: The primary and secondary addresses the record may serve
    async fn create(
        &self,
        config: &ProviderConfig,
        host: &str,
        targets: &FailoverTargets,
    ) -> Result<Box<dyn GslbProvider>, crate::Error>;
}
