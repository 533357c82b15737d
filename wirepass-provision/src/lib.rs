//! Provisioning API client for WirePass.
//!
//! Talks to the external access-control service that owns the actual VPN
//! profiles. The engine depends on the [`Provisioner`] trait so tests inject
//! fakes; [`HttpProvisioner`] is the production implementation against the
//! wg-easy style HTTP JSON API.

mod error;
mod http;

pub use error::{ProvisionError, ProvisionResult};
pub use http::{HttpConfig, HttpProvisioner};

use async_trait::async_trait;
use wirepass_types::ProfileRef;

/// Contract for the external provisioning system.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Finds or creates the profile with the given label and returns its
    /// reference. Labels are unique per subscriber+purpose, so a retry after
    /// a partial failure reuses the existing profile instead of creating a
    /// duplicate.
    async fn create_profile(&self, label: &str) -> ProvisionResult<ProfileRef>;

    /// Fetches the opaque credential/config artifact for a profile.
    async fn fetch_configuration(&self, profile: &ProfileRef) -> ProvisionResult<Vec<u8>>;

    /// Disables a profile. Idempotent: disabling an already-disabled profile
    /// succeeds.
    async fn disable_profile(&self, profile: &ProfileRef) -> ProvisionResult<()>;
}
