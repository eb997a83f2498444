use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tracing::{debug, info, warn};

use crate::{
    config::FunnelConfig,
    dashboard::ReferralDashboard,
    db::profile::ops::ProfileStore,
    service::WaitlistService,
    task::{Outcome, TaskEngine, TaskId, TaskInput, TaskState},
    ui::{ExternalActions, Notifier},
};

/// The waitlist page: task prompts, the live counter and the gate to the
/// dashboard.
pub struct FunnelController<W> {
    engine: TaskEngine<W>,
    service: Arc<W>,
    store: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    actions: Arc<dyn ExternalActions>,
    config: FunnelConfig,
    waitlist_count: AtomicU64,
    prompts: Mutex<HashSet<TaskId>>,
}

impl<W: WaitlistService> FunnelController<W> {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        service: Arc<W>,
        notifier: Arc<dyn Notifier>,
        actions: Arc<dyn ExternalActions>,
        config: FunnelConfig,
        referral_code: Option<String>,
    ) -> Self {
        let engine = TaskEngine::new(store.clone(), service.clone(), notifier.clone(), &config)
            .with_referral_code(referral_code);
        FunnelController {
            engine,
            service,
            store,
            notifier,
            actions,
            waitlist_count: AtomicU64::new(config.initial_waitlist_count),
            config,
            prompts: Mutex::new(HashSet::new()),
        }
    }

    pub fn engine(&self) -> &TaskEngine<W> {
        &self.engine
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    /// Opens the input prompt for `task`. Social tasks also open their
    /// follow or invite link. Completed tasks are left alone.
    pub fn begin(&self, task: TaskId) -> bool {
        if self.task_state().get(task) {
            debug!(%task, "task already completed");
            return false;
        }
        match task {
            TaskId::Twitter => self.actions.open_url(&self.config.twitter_follow_url),
            TaskId::Discord => self.actions.open_url(&self.config.discord_invite_url),
            TaskId::Email | TaskId::Wallet => {}
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.insert(task);
        }
        true
    }

    pub fn prompt_open(&self, task: TaskId) -> bool {
        self.prompts
            .lock()
            .map(|prompts| prompts.contains(&task))
            .unwrap_or(false)
    }

    pub fn dismiss(&self, task: TaskId) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.remove(&task);
        }
    }

    pub async fn submit(&self, input: TaskInput) -> Outcome {
        let task = input.task();
        let outcome = self.engine.submit(input).await;
        if outcome.is_completed() {
            self.dismiss(task);
        }
        outcome
    }

    pub fn task_state(&self) -> TaskState {
        self.engine.task_state()
    }

    pub fn outstanding(&self) -> Vec<TaskId> {
        self.task_state().outstanding()
    }

    pub fn can_enter(&self) -> bool {
        self.engine.can_enter()
    }

    /// Navigates to the dashboard when every task is done.
    pub fn enter(&self) -> bool {
        if !self.can_enter() {
            debug!(outstanding = ?self.outstanding(), "dashboard gate closed");
            return false;
        }
        info!(path = %self.config.dashboard_path, "entering dashboard");
        self.actions.navigate(&self.config.dashboard_path);
        true
    }

    /// Pulls the live waitlist size. Keeps the last known value on failure.
    pub async fn refresh_count(&self) -> u64 {
        match self.service.total_count().await {
            Ok(count) => {
                self.waitlist_count.store(count, Ordering::SeqCst);
                count
            }
            Err(err) => {
                warn!(%err, "waitlist count unavailable");
                self.waitlist_count.load(Ordering::SeqCst)
            }
        }
    }

    pub fn waitlist_count(&self) -> u64 {
        self.waitlist_count.load(Ordering::SeqCst)
    }

    pub fn dashboard(&self) -> ReferralDashboard<W> {
        ReferralDashboard::new(
            self.service.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.actions.clone(),
            self.config.clone(),
        )
    }
}
