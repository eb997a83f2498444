//! Presentation-side collaborators. The funnel only pushes into these.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Notification {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Info)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Warning)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Error)
    }
}

/// Toast sink. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Link opening and in-app navigation.
pub trait ExternalActions: Send + Sync {
    fn open_url(&self, url: &str);

    fn navigate(&self, path: &str);
}

/// Writes toasts to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            title,
            message,
            severity,
        } = notification;
        match severity {
            Severity::Info => info!(%title, %message, "notification"),
            Severity::Warning => warn!(%title, %message, "notification"),
            Severity::Error => error!(%title, %message, "notification"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActions;

impl ExternalActions for TracingActions {
    fn open_url(&self, url: &str) {
        info!(url, "open external link");
    }

    fn navigate(&self, path: &str) {
        info!(path, "navigate");
    }
}
