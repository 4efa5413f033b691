//! Identity types for Kindred.
//!
//! An identity is an immutable kernel of traits wrapped in a versioned
//! snapshot. New versions are appended; existing ones are never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an invariant pattern is checked against generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantKind {
    /// The pattern must appear.
    Contains,
    /// The pattern must not appear.
    ContainsNot,
}

/// A rule every generated response must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    pub kind: InvariantKind,
    pub pattern: String,
}

impl Invariant {
    pub fn contains(pattern: impl Into<String>) -> Self {
        Self {
            kind: InvariantKind::Contains,
            pattern: pattern.into(),
        }
    }

    pub fn contains_not(pattern: impl Into<String>) -> Self {
        Self {
            kind: InvariantKind::ContainsNot,
            pattern: pattern.into(),
        }
    }
}

/// The agent's stable traits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKernel {
    pub name: String,
    pub role: String,
    pub core_values: Vec<String>,
    pub communication_style: String,
    pub expertise_domains: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
}

impl IdentityKernel {
    /// Render the kernel as the IDENTITY prompt section body.
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Name: {}\nRole: {}\nValues: {}\nStyle: {}\nDomains: {}",
            self.name,
            self.role,
            self.core_values.join(", "),
            self.communication_style,
            self.expertise_domains.join(", "),
        )
    }
}

/// Who signed off on an identity version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Auto,
    Reviewed,
    UserApproved,
    SystemRollback,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Auto => write!(f, "auto"),
            ApprovalStatus::Reviewed => write!(f, "reviewed"),
            ApprovalStatus::UserApproved => write!(f, "user_approved"),
            ApprovalStatus::SystemRollback => write!(f, "system_rollback"),
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ApprovalStatus::Auto),
            "reviewed" => Ok(ApprovalStatus::Reviewed),
            "user_approved" => Ok(ApprovalStatus::UserApproved),
            "system_rollback" => Ok(ApprovalStatus::SystemRollback),
            other => Err(format!("invalid approval status: '{other}'")),
        }
    }
}

/// One immutable version of the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub kernel: IdentityKernel,
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub approval_status: ApprovalStatus,
    pub reflection: String,
}

impl IdentitySnapshot {
    /// Name of the built-in identity used when no version has been stored.
    pub const SKELETON_NAME: &'static str = "Kindred Assistant";

    /// The fallback identity: version 0, conservative values, one
    /// restricted pattern.
    pub fn skeleton() -> Self {
        Self {
            kernel: IdentityKernel {
                name: Self::SKELETON_NAME.to_string(),
                role: "helpful assistant".to_string(),
                core_values: vec![
                    "honesty".to_string(),
                    "helpfulness".to_string(),
                    "safety".to_string(),
                ],
                communication_style: "neutral".to_string(),
                expertise_domains: vec!["general knowledge".to_string()],
                invariants: vec![Invariant::contains_not("illegal")],
            },
            version: 0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            approval_status: ApprovalStatus::SystemRollback,
            reflection: "Fallback".to_string(),
        }
    }

    pub fn to_prompt_text(&self) -> String {
        format!(
            "{}\nReflection: {}",
            self.kernel.to_prompt_text(),
            self.reflection
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_prompt_text() {
        let kernel = IdentitySnapshot::skeleton().kernel;
        let text = kernel.to_prompt_text();
        assert_eq!(
            text,
            "Name: Kindred Assistant\nRole: helpful assistant\nValues: honesty, helpfulness, safety\nStyle: neutral\nDomains: general knowledge"
        );
    }

    #[test]
    fn test_snapshot_prompt_text_appends_reflection() {
        let snapshot = IdentitySnapshot::skeleton();
        assert!(snapshot.to_prompt_text().ends_with("\nReflection: Fallback"));
    }

    #[test]
    fn test_skeleton_has_version_zero_and_restriction() {
        let snapshot = IdentitySnapshot::skeleton();
        assert_eq!(snapshot.version, 0);
        assert_eq!(
            snapshot.kernel.invariants,
            vec![Invariant::contains_not("illegal")]
        );
    }

    #[test]
    fn test_kernel_value_equality() {
        let a = IdentitySnapshot::skeleton().kernel;
        let mut b = a.clone();
        assert_eq!(a, b);
        b.role = "critic".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn test_approval_status_roundtrip() {
        for status in [
            ApprovalStatus::Auto,
            ApprovalStatus::Reviewed,
            ApprovalStatus::UserApproved,
            ApprovalStatus::SystemRollback,
        ] {
            let parsed: ApprovalStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("pending".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn test_invariant_kind_serde() {
        let inv = Invariant::contains_not("secret");
        let json = serde_json::to_string(&inv).unwrap();
        assert!(json.contains("\"contains_not\""));
    }
}
