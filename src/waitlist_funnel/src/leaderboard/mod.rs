use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::FunnelConfig,
    db::profile::ops::ProfileStore,
    error::FunnelResult,
    service::{LeaderboardEntry, WaitlistService},
    ui::{Notification, Notifier},
};

pub mod poller;

pub use poller::LeaderboardPoller;

/// Point-in-time leaderboard, highest referral count first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardSnapshot {
    entries: Vec<LeaderboardEntry>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Where the current user sits on the full board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1-based. `None` until the user shows up in the feed.
    pub rank: Option<usize>,
    pub referral_count: u64,
    pub joined_at: Option<DateTime<Utc>>,
}

impl LeaderboardSnapshot {
    pub fn empty() -> Self {
        LeaderboardSnapshot {
            entries: Vec::new(),
            fetched_at: None,
        }
    }

    /// Sorts descending by referral count; ties keep delivery order.
    pub fn from_entries(mut entries: Vec<LeaderboardEntry>, fetched_at: DateTime<Utc>) -> Self {
        entries.sort_by(|a, b| b.referral_count.cmp(&a.referral_count));
        LeaderboardSnapshot {
            entries,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        self.entries.len().div_ceil(page_size).max(1)
    }

    /// 1-based page slice. Empty past the end.
    pub fn page(&self, page: usize, page_size: usize) -> &[LeaderboardEntry] {
        let page_size = page_size.max(1);
        let start = page.saturating_sub(1).saturating_mul(page_size);
        if start >= self.entries.len() {
            return &[];
        }
        let end = (start + page_size).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Scans the whole board, not just the visible page.
    pub fn standing(&self, email: Option<&str>) -> Standing {
        let Some(email) = email else {
            return Standing::default();
        };
        self.entries
            .iter()
            .position(|entry| entry.email == email)
            .map(|index| {
                let entry = &self.entries[index];
                Standing {
                    rank: Some(index + 1),
                    referral_count: entry.referral_count,
                    joined_at: entry.created_at,
                }
            })
            .unwrap_or_default()
    }
}

/// Keeps the latest snapshot plus the page the user is looking at.
pub struct LeaderboardReconciler<W> {
    service: Arc<W>,
    store: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    snapshot: LeaderboardSnapshot,
    page_size: usize,
    current_page: usize,
}

impl<W: WaitlistService> LeaderboardReconciler<W> {
    pub fn new(
        service: Arc<W>,
        store: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        config: &FunnelConfig,
    ) -> Self {
        LeaderboardReconciler {
            service,
            store,
            notifier,
            snapshot: LeaderboardSnapshot::empty(),
            page_size: config.page_size.max(1),
            current_page: 1,
        }
    }

    /// Fetches a fresh board. On failure the previous snapshot stays in place.
    ///
    /// Holds `&mut self` across the fetch; shared reconcilers go through
    /// [`poller::refresh_shared`] instead.
    pub async fn refresh(&mut self) -> FunnelResult<&LeaderboardSnapshot> {
        let fetched = self.service.leaderboard().await;
        self.apply(fetched)
    }

    /// Installs the result of a fetch made elsewhere.
    pub fn apply(
        &mut self,
        fetched: FunnelResult<Vec<LeaderboardEntry>>,
    ) -> FunnelResult<&LeaderboardSnapshot> {
        match fetched {
            Ok(entries) => {
                self.snapshot = LeaderboardSnapshot::from_entries(entries, Utc::now());
                let total_pages = self.total_pages();
                if self.current_page > total_pages {
                    self.current_page = total_pages;
                }
                debug!(
                    entries = self.snapshot.entries().len(),
                    total_pages, "leaderboard refreshed"
                );
                Ok(&self.snapshot)
            }
            Err(err) => {
                warn!(%err, "leaderboard refresh failed");
                self.notifier.notify(Notification::error(
                    "Error",
                    "Failed to load leaderboard data",
                ));
                Err(err)
            }
        }
    }

    pub fn service(&self) -> Arc<W> {
        self.service.clone()
    }

    pub fn snapshot(&self) -> &LeaderboardSnapshot {
        &self.snapshot
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.snapshot.total_pages(self.page_size)
    }

    /// Moves to `page` when it exists. Returns whether the page changed hands.
    pub fn set_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn visible(&self) -> &[LeaderboardEntry] {
        self.snapshot.page(self.current_page, self.page_size)
    }

    pub fn standing(&self) -> Standing {
        let email = self.store.load().and_then(|profile| profile.email);
        self.snapshot.standing(email.as_deref())
    }
}
