use std::{collections::HashSet, sync::Mutex};

use chrono::Utc;
use tracing::info;

use super::{EntryPatch, LeaderboardEntry, WaitlistEntry, WaitlistService};
use crate::{
    db::utils::generate_hash_id,
    error::{FunnelError, FunnelResult},
};

const REFERRAL_CODE_LEN: usize = 8;

#[derive(Default)]
struct Roster {
    entries: Vec<WaitlistEntry>,
    followers: HashSet<String>,
    members: HashSet<String>,
}

/// In-process waitlist backend with the same contract as the remote one.
#[derive(Default)]
pub struct MemoryWaitlistService {
    roster: Mutex<Roster>,
}

pub fn referral_code_for(email: &str) -> String {
    generate_hash_id(&email.to_ascii_lowercase())[..REFERRAL_CODE_LEN].to_string()
}

impl MemoryWaitlistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a Twitter handle as following the project account.
    pub fn add_follower(&self, handle: &str) -> FunnelResult<()> {
        self.with_roster(|roster| {
            roster.followers.insert(handle.to_ascii_lowercase());
            Ok(())
        })
    }

    /// Marks a Discord handle as a server member.
    pub fn add_member(&self, handle: &str) -> FunnelResult<()> {
        self.with_roster(|roster| {
            roster.members.insert(handle.to_ascii_lowercase());
            Ok(())
        })
    }

    pub fn entries(&self) -> FunnelResult<Vec<WaitlistEntry>> {
        self.with_roster(|roster| Ok(roster.entries.clone()))
    }

    fn with_roster<T>(&self, f: impl FnOnce(&mut Roster) -> FunnelResult<T>) -> FunnelResult<T> {
        let mut roster = self
            .roster
            .lock()
            .map_err(|err| FunnelError::Lock(err.to_string()))?;
        f(&mut roster)
    }

    fn is_listed(roster: &Roster, email: &str) -> bool {
        roster
            .entries
            .iter()
            .any(|entry| entry.email.eq_ignore_ascii_case(email))
    }
}

impl WaitlistService for MemoryWaitlistService {
    async fn create_entry(
        &self,
        email: &str,
        name: Option<&str>,
        referral_code: Option<&str>,
    ) -> FunnelResult<WaitlistEntry> {
        self.with_roster(|roster| {
            if Self::is_listed(roster, email) {
                return Err(FunnelError::Transport(format!(
                    "{} is already on the waitlist",
                    email
                )));
            }

            if let Some(code) = referral_code {
                if let Some(referrer) = roster
                    .entries
                    .iter_mut()
                    .find(|entry| entry.referral_code.as_deref() == Some(code))
                {
                    referrer.referral_count += 1;
                    info!(referrer = %referrer.email, "referral credited");
                }
            }

            let entry = WaitlistEntry {
                email: email.to_string(),
                name: name.map(str::to_string),
                referral_code: Some(referral_code_for(email)),
                wallet_address: None,
                referral_count: 0,
                created_at: Some(Utc::now()),
            };
            roster.entries.push(entry.clone());
            Ok(entry)
        })
    }

    async fn update_entry(&self, email: &str, patch: &EntryPatch) -> FunnelResult<()> {
        self.with_roster(|roster| {
            let entry = roster
                .entries
                .iter_mut()
                .find(|entry| entry.email.eq_ignore_ascii_case(email))
                .ok_or_else(|| FunnelError::Transport(format!("no waitlist entry for {}", email)))?;
            if let Some(wallet_address) = &patch.wallet_address {
                entry.wallet_address = Some(wallet_address.clone());
            }
            Ok(())
        })
    }

    async fn total_count(&self) -> FunnelResult<u64> {
        self.with_roster(|roster| Ok(roster.entries.len() as u64))
    }

    async fn leaderboard(&self) -> FunnelResult<Vec<LeaderboardEntry>> {
        self.with_roster(|roster| {
            Ok(roster
                .entries
                .iter()
                .map(|entry| LeaderboardEntry {
                    email: entry.email.clone(),
                    name: entry.name.clone(),
                    referral_count: entry.referral_count,
                    created_at: entry.created_at,
                })
                .collect())
        })
    }

    async fn verify_follow(&self, email: &str, twitter_handle: &str) -> FunnelResult<bool> {
        self.with_roster(|roster| {
            Ok(Self::is_listed(roster, email)
                && roster.followers.contains(&twitter_handle.to_ascii_lowercase()))
        })
    }

    async fn verify_join(&self, email: &str, discord_handle: &str) -> FunnelResult<bool> {
        self.with_roster(|roster| {
            Ok(Self::is_listed(roster, email)
                && roster.members.contains(&discord_handle.to_ascii_lowercase()))
        })
    }
}
