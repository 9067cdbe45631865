//! Permission gate
//!
//! Computes which grants the current platform level requires and whether
//! all of them are held. Nothing is cached: every query asks the grant
//! source again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::platform::PlatformLevel;

/// A grant the recorder may need before it can start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Microphone capture
    RecordAudio,
    /// Posting the ongoing recording notification
    PostNotifications,
    /// Writing to shared storage on older platforms
    WriteExternalStorage,
    /// Broad storage management on newer platforms
    ManageExternalStorage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordAudio => "record_audio",
            Self::PostNotifications => "post_notifications",
            Self::WriteExternalStorage => "write_external_storage",
            Self::ManageExternalStorage => "manage_external_storage",
        }
    }

    pub fn all() -> [Permission; 4] {
        [
            Self::RecordAudio,
            Self::PostNotifications,
            Self::WriteExternalStorage,
            Self::ManageExternalStorage,
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissions required at the given platform level, in request order
pub fn required_permissions(level: PlatformLevel) -> Vec<Permission> {
    let caps = level.capabilities();

    let mut required = if caps.requires_notification_permission {
        vec![Permission::RecordAudio, Permission::PostNotifications]
    } else {
        vec![Permission::RecordAudio, Permission::WriteExternalStorage]
    };

    if caps.requires_storage_manager {
        required.push(Permission::ManageExternalStorage);
    }

    required
}

/// Reports the current grant state of a permission
pub trait GrantSource: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// Grants declared up front, typically from the config file
#[derive(Debug, Clone, Default)]
pub struct ConfiguredGrants {
    granted: BTreeSet<Permission>,
}

impl ConfiguredGrants {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    /// Everything granted
    pub fn all() -> Self {
        Self::new(Permission::all())
    }
}

impl GrantSource for ConfiguredGrants {
    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}

/// Answers "may the recorder start?" for a platform level
pub struct PermissionGate {
    level: PlatformLevel,
    grants: Box<dyn GrantSource>,
}

impl PermissionGate {
    pub fn new(level: PlatformLevel, grants: Box<dyn GrantSource>) -> Self {
        Self { level, grants }
    }

    pub fn level(&self) -> PlatformLevel {
        self.level
    }

    pub fn required(&self) -> Vec<Permission> {
        required_permissions(self.level)
    }

    /// Required permissions that are not currently granted
    pub fn missing(&self) -> Vec<Permission> {
        self.required()
            .into_iter()
            .filter(|p| !self.grants.is_granted(*p))
            .collect()
    }

    pub fn has_all(&self) -> bool {
        self.required().iter().all(|p| self.grants.is_granted(*p))
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("level", &self.level)
            .field("missing", &self.missing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn newer_platforms_need_notifications_and_storage_manager() {
        assert_eq!(
            required_permissions(PlatformLevel(34)),
            vec![
                Permission::RecordAudio,
                Permission::PostNotifications,
                Permission::ManageExternalStorage
            ]
        );
    }

    #[test]
    fn older_platforms_need_legacy_storage_write() {
        assert_eq!(
            required_permissions(PlatformLevel(29)),
            vec![Permission::RecordAudio, Permission::WriteExternalStorage]
        );
        assert_eq!(
            required_permissions(PlatformLevel(31)),
            vec![
                Permission::RecordAudio,
                Permission::WriteExternalStorage,
                Permission::ManageExternalStorage
            ]
        );
    }

    #[test]
    fn reports_missing_grants() {
        let gate = PermissionGate::new(
            PlatformLevel(34),
            Box::new(ConfiguredGrants::new([Permission::RecordAudio])),
        );
        assert!(!gate.has_all());
        assert_eq!(
            gate.missing(),
            vec![Permission::PostNotifications, Permission::ManageExternalStorage]
        );
    }

    struct Toggle(Arc<AtomicBool>);

    impl GrantSource for Toggle {
        fn is_granted(&self, _permission: Permission) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn recomputes_on_every_query() {
        let flag = Arc::new(AtomicBool::new(false));
        let gate = PermissionGate::new(PlatformLevel(34), Box::new(Toggle(flag.clone())));
        assert!(!gate.has_all());

        flag.store(true, Ordering::SeqCst);
        assert!(gate.has_all());
        assert!(gate.missing().is_empty());
    }
}
