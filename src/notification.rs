//! Ongoing recording notification
//!
//! The recorder describes its state as a [`Notification`] and hands it to a
//! [`NotificationSink`]. The sink decides how to surface it.

use serde::{Deserialize, Serialize};

use crate::recorder::RecordingStatus;
use crate::NOTIFICATION_TITLE;

/// The session entry points an action can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionIcon {
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub icon: ActionIcon,
    pub command: SessionCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,

    /// `"{status} - {MM:SS}"`
    pub text: String,

    /// Stays up until the session stops
    pub ongoing: bool,

    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn for_session(status: RecordingStatus, elapsed: &str) -> Self {
        let toggle = if status == RecordingStatus::Paused {
            NotificationAction {
                label: "Resume".to_string(),
                icon: ActionIcon::Resume,
                command: SessionCommand::Resume,
            }
        } else {
            NotificationAction {
                label: "Pause".to_string(),
                icon: ActionIcon::Pause,
                command: SessionCommand::Pause,
            }
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            text: format!("{} - {}", status, elapsed),
            ongoing: status != RecordingStatus::Stopped,
            actions: vec![
                toggle,
                NotificationAction {
                    label: "Stop".to_string(),
                    icon: ActionIcon::Stop,
                    command: SessionCommand::Stop,
                },
            ],
        }
    }
}

/// Where the recorder sends its notification
pub trait NotificationSink: Send + Sync {
    /// Show or replace the notification
    fn post(&self, notification: &Notification);

    /// Take the notification down
    fn remove(&self);
}
