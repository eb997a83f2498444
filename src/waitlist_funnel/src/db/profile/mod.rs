use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod ops;

/// Storage key the profile document lives under.
pub const PROFILE_KEY: &str = "waitlist_user";

/// The visitor's durable record. One per client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub twitter_username: Option<String>,
    pub twitter_followed: bool,
    pub discord_username: Option<String>,
    pub discord_joined: bool,
    pub referral_code: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A partial profile. `None` means "leave the stored value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub wallet_address: Option<String>,
    pub twitter_username: Option<String>,
    pub twitter_followed: Option<bool>,
    pub discord_username: Option<String>,
    pub discord_joined: Option<bool>,
    pub referral_code: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Field-by-field shallow merge. Stamps `updated_at`.
    pub fn apply(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set_opt(&mut self.email, patch.email);
        set_opt(&mut self.name, patch.name);
        set_opt(&mut self.wallet_address, patch.wallet_address);
        set_opt(&mut self.twitter_username, patch.twitter_username);
        set(&mut self.twitter_followed, patch.twitter_followed);
        set_opt(&mut self.discord_username, patch.discord_username);
        set(&mut self.discord_joined, patch.discord_joined);
        set_opt(&mut self.referral_code, patch.referral_code);
        set_opt(&mut self.created_at, patch.created_at);

        // A social flag is meaningless without the handle it was verified for.
        if self.twitter_username.is_none() {
            self.twitter_followed = false;
        }
        if self.discord_username.is_none() {
            self.discord_joined = false;
        }
        self.updated_at = Some(now);
    }
}
