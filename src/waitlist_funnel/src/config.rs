use std::{env, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// How a social task treats a negative verification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPolicy {
    /// Slot completes only when the service confirms the follow/join.
    Strict,
    /// Slot completes once a well-formed handle is submitted.
    Lenient,
}

impl FromStr for SocialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SocialPolicy::Strict),
            "lenient" => Ok(SocialPolicy::Lenient),
            _ => Err(format!("Invalid SocialPolicy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelConfig {
    pub api_url: Option<String>,
    pub database_path: String,
    pub twitter_follow_url: String,
    pub discord_invite_url: String,
    pub site_origin: String,
    pub fallback_referral_link: String,
    pub dashboard_path: String,
    pub initial_waitlist_count: u64,
    pub page_size: usize,
    #[serde(with = "secs")]
    pub refresh_interval: Duration,
    pub verify_attempts: u32,
    #[serde(with = "millis")]
    pub verify_delay: Duration,
    pub social_policy: SocialPolicy,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        FunnelConfig {
            api_url: None,
            database_path: "waitlist.db".to_string(),
            twitter_follow_url: "https://twitter.com/intent/follow?screen_name=neftitxyz"
                .to_string(),
            discord_invite_url: "https://discord.gg/GHc9samP".to_string(),
            site_origin: "https://neftit.com".to_string(),
            fallback_referral_link: "https://neftit.com/waitlist".to_string(),
            dashboard_path: "/dashboard".to_string(),
            initial_waitlist_count: 1247,
            page_size: 10,
            refresh_interval: Duration::from_secs(30),
            verify_attempts: 3,
            verify_delay: Duration::from_millis(1000),
            social_policy: SocialPolicy::Strict,
        }
    }
}

impl FunnelConfig {
    /// Reads `WAITLIST_*` variables, falling back to the defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = FunnelConfig::default();
        FunnelConfig {
            api_url: env::var("WAITLIST_API_URL").ok().filter(|u| !u.trim().is_empty()),
            database_path: env::var("WAITLIST_DB_PATH").unwrap_or(defaults.database_path),
            twitter_follow_url: env::var("WAITLIST_TWITTER_FOLLOW_URL")
                .unwrap_or(defaults.twitter_follow_url),
            discord_invite_url: env::var("WAITLIST_DISCORD_INVITE_URL")
                .unwrap_or(defaults.discord_invite_url),
            site_origin: env::var("WAITLIST_SITE_ORIGIN").unwrap_or(defaults.site_origin),
            fallback_referral_link: env::var("WAITLIST_FALLBACK_REFERRAL_LINK")
                .unwrap_or(defaults.fallback_referral_link),
            dashboard_path: env::var("WAITLIST_DASHBOARD_PATH").unwrap_or(defaults.dashboard_path),
            initial_waitlist_count: parsed("WAITLIST_INITIAL_COUNT")
                .unwrap_or(defaults.initial_waitlist_count),
            page_size: parsed::<usize>("WAITLIST_PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
            refresh_interval: parsed::<u64>("WAITLIST_REFRESH_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            verify_attempts: parsed::<u32>("WAITLIST_VERIFY_ATTEMPTS")
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.verify_attempts),
            verify_delay: parsed::<u64>("WAITLIST_VERIFY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.verify_delay),
            social_policy: parsed("WAITLIST_SOCIAL_POLICY").unwrap_or(defaults.social_policy),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
