use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{
    config::FunnelConfig,
    error::FunnelResult,
    service::WaitlistService,
    task::TaskId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialKind {
    Twitter,
    Discord,
}

impl SocialKind {
    pub fn task(self) -> TaskId {
        match self {
            SocialKind::Twitter => TaskId::Twitter,
            SocialKind::Discord => TaskId::Discord,
        }
    }
}

impl fmt::Display for SocialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialKind::Twitter => f.write_str("twitter"),
            SocialKind::Discord => f.write_str("discord"),
        }
    }
}

/// Bounded retry around the follow/join checks.
///
/// Platforms take a moment to reflect a fresh follow, so a `false` answer is
/// retried after a fixed delay. Transport errors are returned immediately.
pub struct VerificationGateway<W> {
    service: Arc<W>,
    attempts: u32,
    delay: Duration,
}

impl<W: WaitlistService> VerificationGateway<W> {
    pub fn new(service: Arc<W>, config: &FunnelConfig) -> Self {
        VerificationGateway {
            service,
            attempts: config.verify_attempts.max(1),
            delay: config.verify_delay,
        }
    }

    pub async fn verify(&self, kind: SocialKind, email: &str, handle: &str) -> FunnelResult<bool> {
        for attempt in 1..=self.attempts {
            let verified = match kind {
                SocialKind::Twitter => self.service.verify_follow(email, handle).await?,
                SocialKind::Discord => self.service.verify_join(email, handle).await?,
            };
            if verified {
                debug!(%kind, handle, attempt, "verified");
                return Ok(true);
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(%kind, handle, attempts = self.attempts, "not verified");
        Ok(false)
    }
}
