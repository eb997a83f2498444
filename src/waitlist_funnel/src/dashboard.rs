use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::warn;

use crate::{
    config::FunnelConfig,
    db::profile::{ops::ProfileStore, Profile},
    error::FunnelResult,
    leaderboard::{poller::refresh_shared, LeaderboardPoller, LeaderboardReconciler},
    service::WaitlistService,
    ui::{ExternalActions, Notification, Notifier},
};

const TWEET_INTENT_URL: &str = "https://twitter.com/intent/tweet";
const SHARE_TEXT: &str = "Join me on the NEFTIT waitlist for the future of Web3! 🚀";

pub fn referral_link(config: &FunnelConfig, profile: Option<&Profile>) -> String {
    let Some(code) = profile.and_then(|profile| profile.referral_code.as_deref()) else {
        return config.fallback_referral_link.clone();
    };
    let base = format!("{}/waitlist", config.site_origin.trim_end_matches('/'));
    match Url::parse_with_params(&base, &[("ref", code)]) {
        Ok(url) => url.to_string(),
        Err(err) => {
            warn!(%err, origin = %config.site_origin, "cannot build referral link");
            config.fallback_referral_link.clone()
        }
    }
}

pub fn share_on_twitter_url(link: &str) -> String {
    Url::parse_with_params(TWEET_INTENT_URL, &[("text", SHARE_TEXT), ("url", link)])
        .map(String::from)
        .unwrap_or_else(|_| TWEET_INTENT_URL.to_string())
}

/// `Mar 7, 2026`
pub fn format_joined(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    pub email: String,
    pub name: Option<String>,
    pub referral_count: u64,
    pub is_you: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub referral_link: String,
    pub rank: Option<usize>,
    pub referral_count: u64,
    pub joined: Option<String>,
    pub current_page: usize,
    pub total_pages: usize,
    pub rows: Vec<RankedRow>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// The referral dashboard: leaderboard standing, paging and share links.
pub struct ReferralDashboard<W> {
    reconciler: Arc<Mutex<LeaderboardReconciler<W>>>,
    poller: Option<LeaderboardPoller>,
    store: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    actions: Arc<dyn ExternalActions>,
    config: FunnelConfig,
}

impl<W: WaitlistService> ReferralDashboard<W> {
    pub fn new(
        service: Arc<W>,
        store: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        actions: Arc<dyn ExternalActions>,
        config: FunnelConfig,
    ) -> Self {
        let reconciler = LeaderboardReconciler::new(service, store.clone(), notifier.clone(), &config);
        ReferralDashboard {
            reconciler: Arc::new(Mutex::new(reconciler)),
            poller: None,
            store,
            notifier,
            actions,
            config,
        }
    }

    /// Starts the periodic refresh. Must run inside a tokio runtime.
    pub fn mount(&mut self) {
        if self.poller.is_none() {
            self.poller = Some(LeaderboardPoller::spawn(
                self.reconciler.clone(),
                self.config.refresh_interval,
            ));
        }
    }

    pub fn unmount(&mut self) {
        self.poller.take();
    }

    pub fn is_mounted(&self) -> bool {
        self.poller.is_some()
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        self.poller.as_ref().map(LeaderboardPoller::subscribe)
    }

    pub async fn refresh(&self) -> FunnelResult<()> {
        refresh_shared(&self.reconciler).await
    }

    pub async fn set_page(&self, page: usize) -> bool {
        self.reconciler.lock().await.set_page(page)
    }

    pub async fn view(&self) -> DashboardView {
        let profile = self.store.load();
        let email = profile.as_ref().and_then(|profile| profile.email.clone());
        let reconciler = self.reconciler.lock().await;
        let standing = reconciler.standing();
        let offset = (reconciler.current_page() - 1) * reconciler.page_size();

        let rows = reconciler
            .visible()
            .iter()
            .enumerate()
            .map(|(i, entry)| RankedRow {
                rank: offset + i + 1,
                email: entry.email.clone(),
                name: entry.name.clone(),
                referral_count: entry.referral_count,
                is_you: email.as_deref() == Some(entry.email.as_str()),
            })
            .collect();

        DashboardView {
            referral_link: referral_link(&self.config, profile.as_ref()),
            rank: standing.rank,
            referral_count: standing.referral_count,
            joined: standing.joined_at.map(format_joined),
            current_page: reconciler.current_page(),
            total_pages: reconciler.total_pages(),
            rows,
            fetched_at: reconciler.snapshot().fetched_at(),
        }
    }

    /// Hands the link to the caller for the clipboard and confirms it.
    pub fn copy_referral_link(&self) -> String {
        let link = referral_link(&self.config, self.store.load().as_ref());
        self.notifier.notify(Notification::info(
            "Link copied!",
            "Referral link has been copied to clipboard.",
        ));
        link
    }

    pub fn share_on_twitter(&self) {
        let link = referral_link(&self.config, self.store.load().as_ref());
        self.actions.open_url(&share_on_twitter_url(&link));
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use super::*;
    use crate::{
        db::profile::{ops::MemoryProfileStore, ProfilePatch},
        testing::{joined_at, row, RecordingActions, RecordingNotifier, StubService},
    };

    struct Rig {
        service: Arc<StubService>,
        actions: Arc<RecordingActions>,
        notifier: Arc<RecordingNotifier>,
        dashboard: ReferralDashboard<StubService>,
    }

    fn rig(profile: Option<ProfilePatch>) -> Rig {
        let service = Arc::new(StubService::default());
        let store = Arc::new(MemoryProfileStore::new());
        if let Some(patch) = profile {
            store.merge(patch).unwrap();
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let actions = Arc::new(RecordingActions::default());
        let dashboard = ReferralDashboard::new(
            service.clone(),
            store,
            notifier.clone(),
            actions.clone(),
            FunnelConfig::default(),
        );
        Rig {
            service,
            actions,
            notifier,
            dashboard,
        }
    }

    fn me() -> ProfilePatch {
        ProfilePatch {
            email: Some("me@b.co".to_string()),
            referral_code: Some("c0ffee01".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn referral_link_falls_back_without_a_code() {
        let config = FunnelConfig::default();
        assert_eq!(referral_link(&config, None), "https://neftit.com/waitlist");

        let profile = Profile {
            referral_code: Some("c0ffee01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            referral_link(&config, Some(&profile)),
            "https://neftit.com/waitlist?ref=c0ffee01"
        );
    }

    #[test]
    fn share_url_encodes_text_and_link() {
        let url = share_on_twitter_url("https://neftit.com/waitlist?ref=c0ffee01");
        assert!(url.starts_with("https://twitter.com/intent/tweet?text=Join+me"));
        assert!(url.contains("url=https%3A%2F%2Fneftit.com%2Fwaitlist%3Fref%3Dc0ffee01"));
    }

    #[test]
    fn joined_date_is_short_and_unpadded() {
        assert_eq!(format_joined(joined_at()), "Mar 7, 2026");
    }

    #[tokio::test]
    async fn view_marks_the_user_row() {
        let rig = rig(Some(me()));
        rig.service.set_leaderboard(vec![
            row("a@b.co", 5),
            row("me@b.co", 9),
            row("c@b.co", 9),
        ]);
        rig.dashboard.refresh().await.unwrap();

        let view = rig.dashboard.view().await;
        assert_eq!(view.rank, Some(1));
        assert_eq!(view.referral_count, 9);
        assert_eq!(view.joined.as_deref(), Some("Mar 7, 2026"));
        assert_eq!(view.referral_link, "https://neftit.com/waitlist?ref=c0ffee01");
        assert_eq!(view.total_pages, 1);
        assert!(view.rows[0].is_you);
        assert_eq!(view.rows[2].rank, 3);
        assert!(view.fetched_at.is_some());
    }

    #[tokio::test]
    async fn second_page_rows_carry_absolute_ranks() {
        let rig = rig(None);
        rig.service.set_leaderboard(
            (0..15).map(|i| row(&format!("u{}@b.co", i), 100 - i)).collect(),
        );
        rig.dashboard.refresh().await.unwrap();
        assert!(rig.dashboard.set_page(2).await);

        let view = rig.dashboard.view().await;
        assert_eq!(view.current_page, 2);
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.rows[0].rank, 11);
        assert_eq!(view.rank, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_releases_the_timer() {
        let mut rig = rig(Some(me()));
        rig.dashboard.mount();
        assert!(rig.dashboard.is_mounted());
        rig.dashboard.subscribe().unwrap().changed().await.unwrap();

        rig.dashboard.unmount();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(rig.service.leaderboard_calls.load(Ordering::SeqCst), 1);
        assert!(rig.dashboard.subscribe().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn paging_does_not_wait_for_an_inflight_fetch() {
        let mut rig = rig(Some(me()));
        rig.service.set_leaderboard(
            (0..15).map(|i| row(&format!("u{}@b.co", i), 100 - i)).collect(),
        );
        rig.dashboard.refresh().await.unwrap();

        rig.service.slow_leaderboard(Duration::from_secs(8));
        rig.dashboard.mount();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.service.leaderboard_calls.load(Ordering::SeqCst), 2);

        let started = tokio::time::Instant::now();
        assert!(rig.dashboard.set_page(2).await);
        let view = rig.dashboard.view().await;
        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(view.current_page, 2);
        assert_eq!(view.rows[0].rank, 11);

        rig.dashboard.subscribe().unwrap().changed().await.unwrap();
        assert_eq!(rig.dashboard.view().await.current_page, 2);
    }

    #[test]
    fn copy_and_share_use_the_referral_link() {
        let rig = rig(Some(me()));
        let link = rig.dashboard.copy_referral_link();
        assert_eq!(link, "https://neftit.com/waitlist?ref=c0ffee01");
        assert_eq!(rig.notifier.last().unwrap().title, "Link copied!");

        rig.dashboard.share_on_twitter();
        let opened = rig.actions.opened.lock().unwrap().clone();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].contains("ref%3Dc0ffee01"));
    }
}
