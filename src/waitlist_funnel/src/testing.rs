//! Scripted collaborators shared by the unit tests.

use std::{
    collections::VecDeque,
    time::Duration,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use crate::{
    error::{FunnelError, FunnelResult},
    service::{EntryPatch, LeaderboardEntry, WaitlistEntry, WaitlistService},
    ui::{ExternalActions, Notification, Notifier, Severity},
};

pub fn joined_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub fn row(email: &str, referral_count: u64) -> LeaderboardEntry {
    LeaderboardEntry {
        email: email.to_string(),
        name: None,
        referral_count,
        created_at: Some(joined_at()),
    }
}

#[derive(Default)]
pub struct StubService {
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub leaderboard_calls: AtomicUsize,
    pub count_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_verify: AtomicBool,
    pub fail_leaderboard: AtomicBool,
    pub fail_count: AtomicBool,
    pub last_referral_code: Mutex<Option<String>>,
    verify_answers: Mutex<VecDeque<bool>>,
    verify_times: Mutex<Vec<Instant>>,
    leaderboard: Mutex<Vec<LeaderboardEntry>>,
    leaderboard_delay: Mutex<Option<Duration>>,
}

impl StubService {
    /// Answers for successive verify calls. Once drained every call says `false`.
    pub fn script_verify(&self, answers: impl IntoIterator<Item = bool>) {
        self.verify_answers.lock().unwrap().extend(answers);
    }

    pub fn always_verify(&self) {
        self.script_verify(std::iter::repeat(true).take(64));
    }

    pub fn verify_times(&self) -> Vec<Instant> {
        self.verify_times.lock().unwrap().clone()
    }

    pub fn set_leaderboard(&self, rows: Vec<LeaderboardEntry>) {
        *self.leaderboard.lock().unwrap() = rows;
    }

    /// Makes every later leaderboard fetch take `delay`.
    pub fn slow_leaderboard(&self, delay: Duration) {
        *self.leaderboard_delay.lock().unwrap() = Some(delay);
    }

    fn transport(flag: &AtomicBool, what: &str) -> FunnelResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(FunnelError::Transport(format!("{} unavailable", what)));
        }
        Ok(())
    }

    fn answer(&self) -> FunnelResult<bool> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verify_times.lock().unwrap().push(Instant::now());
        Self::transport(&self.fail_verify, "verification")?;
        Ok(self.verify_answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

impl WaitlistService for StubService {
    async fn create_entry(
        &self,
        email: &str,
        name: Option<&str>,
        referral_code: Option<&str>,
    ) -> FunnelResult<WaitlistEntry> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::transport(&self.fail_create, "create")?;
        *self.last_referral_code.lock().unwrap() = referral_code.map(str::to_string);
        Ok(WaitlistEntry {
            email: email.to_string(),
            name: name.map(str::to_string),
            referral_code: Some("c0ffee01".to_string()),
            wallet_address: None,
            referral_count: 0,
            created_at: Some(joined_at()),
        })
    }

    async fn update_entry(&self, _email: &str, _patch: &EntryPatch) -> FunnelResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Self::transport(&self.fail_update, "update")
    }

    async fn total_count(&self) -> FunnelResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Self::transport(&self.fail_count, "count")?;
        Ok(self.leaderboard.lock().unwrap().len() as u64)
    }

    async fn leaderboard(&self) -> FunnelResult<Vec<LeaderboardEntry>> {
        self.leaderboard_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.leaderboard_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Self::transport(&self.fail_leaderboard, "leaderboard")?;
        Ok(self.leaderboard.lock().unwrap().clone())
    }

    async fn verify_follow(&self, _email: &str, _twitter_handle: &str) -> FunnelResult<bool> {
        self.answer()
    }

    async fn verify_join(&self, _email: &str, _discord_handle: &str) -> FunnelResult<bool> {
        self.answer()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingActions {
    pub opened: Mutex<Vec<String>>,
    pub visited: Mutex<Vec<String>>,
}

impl ExternalActions for RecordingActions {
    fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }

    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}
