use std::path::PathBuf;

use async_trait::async_trait;

/// An authenticated, authorized user as the core needs to see it: capability
/// booleans and a jail root, never a credential (§3 "UserAccount").
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub username: String,
    pub home_directory: PathBuf,
    pub enabled: bool,
    pub can_upload: bool,
    pub can_download: bool,
    pub can_delete: bool,
    pub can_create_directory: bool,
    /// 0 means unlimited (§6 `maxUploadBytes`).
    pub max_upload_bytes: u64,
}

impl UserAccount {
    /// The smaller of this account's ceiling and the subsystem-wide one,
    /// ignoring whichever of the two is zero (unlimited); zero if both are
    /// unlimited (§3 invariant 4, glossary "Upload ceiling").
    pub fn effective_upload_ceiling(&self, subsystem_ceiling: u64) -> u64 {
        match (self.max_upload_bytes, subsystem_ceiling) {
            (0, s) => s,
            (u, 0) => u,
            (u, s) => u.min(s),
        }
    }
}

/// External collaborator (§6): given a username, answer whether the account
/// exists, is enabled, and what it's allowed to do. The core never
/// authenticates, that's the transport's job, already done by the time a
/// username reaches here.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn lookup(&self, username: &str) -> Option<UserAccount>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(max_upload_bytes: u64) -> UserAccount {
        UserAccount {
            username: "alice".into(),
            home_directory: PathBuf::from("/home/alice"),
            enabled: true,
            can_upload: true,
            can_download: true,
            can_delete: true,
            can_create_directory: true,
            max_upload_bytes,
        }
    }

    #[test]
    fn zero_on_both_sides_is_unlimited() {
        assert_eq!(account(0).effective_upload_ceiling(0), 0);
    }

    #[test]
    fn nonzero_side_wins_over_unlimited_side() {
        assert_eq!(account(0).effective_upload_ceiling(100), 100);
        assert_eq!(account(50).effective_upload_ceiling(0), 50);
    }

    #[test]
    fn smaller_nonzero_ceiling_wins() {
        assert_eq!(account(200).effective_upload_ceiling(50), 50);
        assert_eq!(account(10).effective_upload_ceiling(50), 10);
    }
}
