use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::{validate, SlotState, TaskId, TaskInput, TaskState};
use crate::{
    config::{FunnelConfig, SocialPolicy},
    db::profile::{ops::ProfileStore, Profile, ProfilePatch},
    error::{FunnelError, FunnelResult, ValidationError},
    service::{EntryPatch, WaitlistService},
    ui::{Notification, Notifier},
    verify::{SocialKind, VerificationGateway},
};

/// What a submission resolved to. The engine never returns an error past this.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    /// The service answered "not yet" on every attempt (strict policy only).
    Unverified,
    /// Input was rejected locally. Nothing was sent.
    Rejected(ValidationError),
    Failed(FunnelError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

enum Prepared {
    Email {
        email: String,
        name: Option<String>,
    },
    Wallet {
        wallet_address: String,
    },
    Social {
        kind: SocialKind,
        handle: String,
        email: Option<String>,
    },
}

/// Drives the four funnel slots and reconciles each result into the profile.
pub struct TaskEngine<W> {
    store: Arc<dyn ProfileStore>,
    service: Arc<W>,
    gateway: VerificationGateway<W>,
    notifier: Arc<dyn Notifier>,
    policy: SocialPolicy,
    referral_code: Option<String>,
    slots: Mutex<[SlotState; 4]>,
}

impl<W: WaitlistService> TaskEngine<W> {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        service: Arc<W>,
        notifier: Arc<dyn Notifier>,
        config: &FunnelConfig,
    ) -> Self {
        let engine = TaskEngine {
            gateway: VerificationGateway::new(service.clone(), config),
            store,
            service,
            notifier,
            policy: config.social_policy,
            referral_code: None,
            slots: Mutex::new([SlotState::Pending; 4]),
        };
        engine.reload();
        engine
    }

    /// Referral code from the landing URL, forwarded on entry creation.
    pub fn with_referral_code(mut self, code: Option<String>) -> Self {
        self.referral_code = code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        self
    }

    pub fn referral_code(&self) -> Option<&str> {
        self.referral_code.as_deref()
    }

    pub fn policy(&self) -> SocialPolicy {
        self.policy
    }

    pub fn profile(&self) -> Option<Profile> {
        self.store.load()
    }

    /// Re-derives every idle slot from the stored profile.
    pub fn reload(&self) -> TaskState {
        let derived = self.derived_state();
        if let Ok(mut slots) = self.slots.lock() {
            for task in TaskId::ALL {
                let slot = &mut slots[task.index()];
                if *slot != SlotState::InProgress {
                    *slot = completion(derived.get(task));
                }
            }
        }
        derived
    }

    pub fn slot(&self, task: TaskId) -> SlotState {
        self.slots
            .lock()
            .map(|slots| slots[task.index()])
            .unwrap_or(SlotState::Pending)
    }

    pub fn task_state(&self) -> TaskState {
        let mut state = TaskState::default();
        for task in TaskId::ALL {
            state.set(task, self.slot(task) == SlotState::Completed);
        }
        state
    }

    pub fn can_enter(&self) -> bool {
        self.task_state().all_complete()
    }

    pub async fn submit(&self, input: TaskInput) -> Outcome {
        let task = input.task();
        let prepared = match self.prepare(input) {
            Ok(prepared) => prepared,
            Err(err) => {
                debug!(%task, %err, "input rejected");
                let (title, message) = err.notice();
                self.notifier.notify(Notification::error(title, message));
                return Outcome::Rejected(err);
            }
        };

        self.set_slot(task, SlotState::InProgress);
        info!(%task, "task submitted");

        let result = match prepared {
            Prepared::Email { email, name } => self.capture_email(email, name).await,
            Prepared::Wallet { wallet_address } => self.capture_wallet(wallet_address).await,
            Prepared::Social {
                kind,
                handle,
                email,
            } => self.verify_social(kind, handle, email).await,
        };

        match result {
            Ok(profile) => {
                let done = TaskState::from_profile(&profile).get(task);
                self.set_slot(task, completion(done));
                if done {
                    info!(%task, "task completed");
                    self.notifier.notify(success_notice(task));
                    Outcome::Completed
                } else {
                    self.notifier.notify(unverified_notice(task));
                    Outcome::Unverified
                }
            }
            Err(err) => {
                error!(%task, %err, "task submission failed");
                self.set_slot(task, completion(self.derived_state().get(task)));
                self.notifier.notify(failure_notice(task));
                Outcome::Failed(err)
            }
        }
    }

    fn prepare(&self, input: TaskInput) -> Result<Prepared, ValidationError> {
        let prepared = match input {
            TaskInput::Email { email, name } => Prepared::Email {
                email: validate::email(&email)?,
                name: name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
            },
            TaskInput::Wallet { wallet_address } => Prepared::Wallet {
                wallet_address: validate::wallet_address(&wallet_address)?,
            },
            TaskInput::Twitter { username } => {
                self.prepare_social(SocialKind::Twitter, validate::twitter_handle(&username)?)?
            }
            TaskInput::Discord { username } => {
                self.prepare_social(SocialKind::Discord, validate::discord_handle(&username)?)?
            }
        };
        Ok(prepared)
    }

    fn prepare_social(&self, kind: SocialKind, handle: String) -> Result<Prepared, ValidationError> {
        let email = self.known_email();
        if email.is_none() && self.policy == SocialPolicy::Strict {
            return Err(ValidationError::EmailRequired(kind.task()));
        }
        Ok(Prepared::Social {
            kind,
            handle,
            email,
        })
    }

    async fn capture_email(&self, email: String, name: Option<String>) -> FunnelResult<Profile> {
        let entry = self
            .service
            .create_entry(&email, name.as_deref(), self.referral_code.as_deref())
            .await?;
        info!(%email, referral_code = ?entry.referral_code, "waitlist entry created");

        self.store.merge(ProfilePatch {
            email: Some(email),
            name,
            referral_code: entry.referral_code,
            created_at: Some(entry.created_at.unwrap_or_else(Utc::now)),
            ..Default::default()
        })
    }

    async fn capture_wallet(&self, wallet_address: String) -> FunnelResult<Profile> {
        // Remote sync is best-effort; the local profile is what completes the slot.
        if let Some(email) = self.known_email() {
            let patch = EntryPatch {
                wallet_address: Some(wallet_address.clone()),
            };
            if let Err(err) = self.service.update_entry(&email, &patch).await {
                warn!(%email, %err, "wallet sync to waitlist service failed");
            }
        }

        self.store.merge(ProfilePatch {
            wallet_address: Some(wallet_address),
            ..Default::default()
        })
    }

    async fn verify_social(
        &self,
        kind: SocialKind,
        handle: String,
        email: Option<String>,
    ) -> FunnelResult<Profile> {
        let verified = match &email {
            Some(email) => self.gateway.verify(kind, email, &handle).await?,
            None => false,
        };
        let flag = match self.policy {
            SocialPolicy::Strict => verified,
            SocialPolicy::Lenient => true,
        };

        let patch = match kind {
            SocialKind::Twitter => ProfilePatch {
                twitter_username: Some(handle),
                twitter_followed: Some(flag),
                ..Default::default()
            },
            SocialKind::Discord => ProfilePatch {
                discord_username: Some(handle),
                discord_joined: Some(flag),
                ..Default::default()
            },
        };
        self.store.merge(patch)
    }

    fn known_email(&self) -> Option<String> {
        self.store.load().and_then(|profile| profile.email)
    }

    fn derived_state(&self) -> TaskState {
        self.store
            .load()
            .map(|profile| TaskState::from_profile(&profile))
            .unwrap_or_default()
    }

    fn set_slot(&self, task: TaskId, state: SlotState) {
        match self.slots.lock() {
            Ok(mut slots) => slots[task.index()] = state,
            Err(err) => warn!(%task, %err, "slot lock poisoned"),
        }
    }
}

fn completion(done: bool) -> SlotState {
    if done {
        SlotState::Completed
    } else {
        SlotState::Pending
    }
}

fn success_notice(task: TaskId) -> Notification {
    match task {
        TaskId::Email => Notification::info("Email Submitted!", "Email task completed successfully."),
        TaskId::Wallet => Notification::info(
            "Wallet Address Submitted!",
            "Wallet task completed successfully.",
        ),
        TaskId::Twitter => Notification::info(
            "Twitter Follow Verified!",
            "Twitter task completed successfully.",
        ),
        TaskId::Discord => Notification::info(
            "Discord Join Verified!",
            "Discord task completed successfully.",
        ),
    }
}

fn unverified_notice(task: TaskId) -> Notification {
    match task {
        TaskId::Discord => Notification::warning(
            "Join Not Verified",
            "We couldn't confirm you joined the server yet. Please try again in a moment.",
        ),
        _ => Notification::warning(
            "Follow Not Verified",
            "We couldn't confirm your follow yet. Please try again in a moment.",
        ),
    }
}

fn failure_notice(task: TaskId) -> Notification {
    let message = match task {
        TaskId::Email => "Something went wrong. Please try again.",
        TaskId::Wallet => "Failed to verify wallet. Please try again.",
        TaskId::Twitter => "Failed to verify Twitter follow. Please try again.",
        TaskId::Discord => "Failed to verify Discord join. Please try again.",
    };
    Notification::error("Error", message)
}
