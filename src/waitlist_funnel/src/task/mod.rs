use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::db::profile::Profile;

pub mod engine;
pub mod validate;

pub use engine::{Outcome, TaskEngine};

/// One of the four funnel slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskId {
    Email,
    Wallet,
    Twitter,
    Discord,
}

impl TaskId {
    pub const ALL: [TaskId; 4] = [TaskId::Email, TaskId::Wallet, TaskId::Twitter, TaskId::Discord];

    fn index(self) -> usize {
        match self {
            TaskId::Email => 0,
            TaskId::Wallet => 1,
            TaskId::Twitter => 2,
            TaskId::Discord => 3,
        }
    }

    pub fn input_label(self) -> &'static str {
        match self {
            TaskId::Email => "email address",
            TaskId::Wallet => "wallet address",
            TaskId::Twitter => "Twitter username",
            TaskId::Discord => "Discord username",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskId::Email => "email",
            TaskId::Wallet => "wallet",
            TaskId::Twitter => "twitter",
            TaskId::Discord => "discord",
        };
        f.write_str(name)
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(TaskId::Email),
            "wallet" | "address" => Ok(TaskId::Wallet),
            "twitter" | "x" => Ok(TaskId::Twitter),
            "discord" => Ok(TaskId::Discord),
            _ => Err(format!("Invalid TaskId: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    Pending,
    InProgress,
    Completed,
}

/// Completion flags derived from the profile. Never persisted on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub email: bool,
    pub wallet: bool,
    pub twitter: bool,
    pub discord: bool,
}

impl TaskState {
    pub fn from_profile(profile: &Profile) -> Self {
        TaskState {
            email: profile.email.is_some(),
            wallet: profile.wallet_address.is_some(),
            twitter: profile.twitter_followed && profile.twitter_username.is_some(),
            discord: profile.discord_joined && profile.discord_username.is_some(),
        }
    }

    pub fn get(&self, task: TaskId) -> bool {
        match task {
            TaskId::Email => self.email,
            TaskId::Wallet => self.wallet,
            TaskId::Twitter => self.twitter,
            TaskId::Discord => self.discord,
        }
    }

    pub fn set(&mut self, task: TaskId, done: bool) {
        match task {
            TaskId::Email => self.email = done,
            TaskId::Wallet => self.wallet = done,
            TaskId::Twitter => self.twitter = done,
            TaskId::Discord => self.discord = done,
        }
    }

    /// The "enter application" gate.
    pub fn all_complete(&self) -> bool {
        TaskId::ALL.iter().all(|task| self.get(*task))
    }

    pub fn outstanding(&self) -> Vec<TaskId> {
        TaskId::ALL
            .into_iter()
            .filter(|task| !self.get(*task))
            .collect()
    }
}

/// Raw user input for one submission, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    Email { email: String, name: Option<String> },
    Wallet { wallet_address: String },
    Twitter { username: String },
    Discord { username: String },
}

impl TaskInput {
    pub fn task(&self) -> TaskId {
        match self {
            TaskInput::Email { .. } => TaskId::Email,
            TaskInput::Wallet { .. } => TaskId::Wallet,
            TaskInput::Twitter { .. } => TaskId::Twitter,
            TaskInput::Discord { .. } => TaskId::Discord,
        }
    }
}
