use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EntryPatch, LeaderboardEntry, WaitlistEntry, WaitlistService};
use crate::error::{FunnelError, FunnelResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTP client for the waitlist backend.
pub struct HttpWaitlistService {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct CreateEntryRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referral_code: Option<&'a str>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    username: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    verified: bool,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl HttpWaitlistService {
    pub fn new(base_url: &str) -> FunnelResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| FunnelError::Transport(format!("invalid service url {}: {}", base_url, err)))?;
        if base_url.cannot_be_a_base() {
            return Err(FunnelError::Transport(format!(
                "service url {} cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HttpWaitlistService { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn verify(&self, platform: &str, email: &str, username: &str) -> FunnelResult<bool> {
        let url = self.endpoint(&["verify", platform]);
        debug!(%url, username, "verification request");
        let response: VerifyResponse = self
            .client
            .post(url)
            .json(&VerifyRequest { email, username })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.verified)
    }
}

impl WaitlistService for HttpWaitlistService {
    async fn create_entry(
        &self,
        email: &str,
        name: Option<&str>,
        referral_code: Option<&str>,
    ) -> FunnelResult<WaitlistEntry> {
        let entry = self
            .client
            .post(self.endpoint(&["entries"]))
            .json(&CreateEntryRequest {
                email,
                name,
                referral_code,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(entry)
    }

    async fn update_entry(&self, email: &str, patch: &EntryPatch) -> FunnelResult<()> {
        self.client
            .patch(self.endpoint(&["entries", email]))
            .json(patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn total_count(&self) -> FunnelResult<u64> {
        let response: CountResponse = self
            .client
            .get(self.endpoint(&["entries", "count"]))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.count)
    }

    async fn leaderboard(&self) -> FunnelResult<Vec<LeaderboardEntry>> {
        let entries = self
            .client
            .get(self.endpoint(&["leaderboard"]))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(entries)
    }

    async fn verify_follow(&self, email: &str, twitter_handle: &str) -> FunnelResult<bool> {
        self.verify("twitter", email, twitter_handle).await
    }

    async fn verify_join(&self, email: &str, discord_handle: &str) -> FunnelResult<bool> {
        self.verify("discord", email, discord_handle).await
    }
}
