use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FunnelResult;

pub mod http;
pub mod memory;

pub use http::HttpWaitlistService;
pub use memory::MemoryWaitlistService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub referral_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update keyed by email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub referral_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The remote waitlist/leaderboard backend.
///
/// Every method fails with [`crate::FunnelError::Transport`] when the service
/// cannot be reached or rejects the request. A `false` from the verify calls
/// is a normal answer, not an error.
pub trait WaitlistService: Send + Sync + 'static {
    fn create_entry(
        &self,
        email: &str,
        name: Option<&str>,
        referral_code: Option<&str>,
    ) -> impl Future<Output = FunnelResult<WaitlistEntry>> + Send;

    fn update_entry(
        &self,
        email: &str,
        patch: &EntryPatch,
    ) -> impl Future<Output = FunnelResult<()>> + Send;

    fn total_count(&self) -> impl Future<Output = FunnelResult<u64>> + Send;

    /// Unordered as delivered.
    fn leaderboard(&self) -> impl Future<Output = FunnelResult<Vec<LeaderboardEntry>>> + Send;

    fn verify_follow(
        &self,
        email: &str,
        twitter_handle: &str,
    ) -> impl Future<Output = FunnelResult<bool>> + Send;

    fn verify_join(
        &self,
        email: &str,
        discord_handle: &str,
    ) -> impl Future<Output = FunnelResult<bool>> + Send;
}

/// Accepts a number, a numeric string or null. Anything unusable counts as 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(count)) => count,
        Some(Raw::Float(count)) if count.is_finite() && count > 0.0 => count as u64,
        Some(Raw::Text(count)) => count.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
