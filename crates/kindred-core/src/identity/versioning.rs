//! Selection of the current identity from an append-only version log.

use chrono::{DateTime, Utc};
use kindred_types::identity::{ApprovalStatus, IdentityKernel, IdentitySnapshot};

/// Which approval statuses may become "current".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Exclude versions that were only auto-approved.
    pub require_review: bool,
}

impl ApprovalPolicy {
    pub fn accepts(&self, status: ApprovalStatus) -> bool {
        match status {
            ApprovalStatus::Auto => !self.require_review,
            ApprovalStatus::Reviewed
            | ApprovalStatus::UserApproved
            | ApprovalStatus::SystemRollback => true,
        }
    }
}

/// Highest acceptable version, if any.
pub fn select_current<'a>(
    versions: impl IntoIterator<Item = &'a IdentitySnapshot>,
    policy: ApprovalPolicy,
) -> Option<&'a IdentitySnapshot> {
    versions
        .into_iter()
        .filter(|s| policy.accepts(s.approval_status))
        .max_by_key(|s| s.version)
}

/// Build the next version on top of `latest` (or version 1 when there is none).
pub fn next_version(
    latest: Option<&IdentitySnapshot>,
    kernel: IdentityKernel,
    approval_status: ApprovalStatus,
    reflection: impl Into<String>,
    timestamp: DateTime<Utc>,
) -> IdentitySnapshot {
    IdentitySnapshot {
        kernel,
        version: latest.map_or(1, |s| s.version + 1),
        timestamp,
        approval_status,
        reflection: reflection.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(v: u32, status: ApprovalStatus) -> IdentitySnapshot {
        let mut s = IdentitySnapshot::skeleton();
        s.version = v;
        s.approval_status = status;
        s
    }

    #[test]
    fn picks_highest_version() {
        let log = vec![
            version(1, ApprovalStatus::UserApproved),
            version(3, ApprovalStatus::Reviewed),
            version(2, ApprovalStatus::Auto),
        ];
        let current = select_current(&log, ApprovalPolicy::default()).unwrap();
        assert_eq!(current.version, 3);
    }

    #[test]
    fn review_policy_skips_auto_versions() {
        let log = vec![
            version(1, ApprovalStatus::Reviewed),
            version(2, ApprovalStatus::Auto),
        ];
        let policy = ApprovalPolicy {
            require_review: true,
        };
        assert_eq!(select_current(&log, policy).unwrap().version, 1);
        assert_eq!(
            select_current(&log, ApprovalPolicy::default())
                .unwrap()
                .version,
            2
        );
    }

    #[test]
    fn empty_log_has_no_current() {
        let log: Vec<IdentitySnapshot> = Vec::new();
        assert!(select_current(&log, ApprovalPolicy::default()).is_none());
    }

    #[test]
    fn next_version_increments() {
        let base = version(4, ApprovalStatus::Reviewed);
        let next = next_version(
            Some(&base),
            base.kernel.clone(),
            ApprovalStatus::Auto,
            "tweak",
            Utc::now(),
        );
        assert_eq!(next.version, 5);
        assert_eq!(next.reflection, "tweak");

        let first = next_version(None, base.kernel, ApprovalStatus::Reviewed, "", Utc::now());
        assert_eq!(first.version, 1);
    }
}
