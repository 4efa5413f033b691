//! Identity version repository trait definition.

use kindred_types::error::RepositoryError;
use kindred_types::identity::IdentitySnapshot;

use crate::identity::{ApprovalPolicy, select_current};

/// Append-only identity version log per user.
///
/// Each snapshot is immutable once saved.
pub trait IdentityRepository: Send + Sync {
    /// Save a new version. The version number must exceed every stored one,
    /// otherwise the call fails with `Conflict`.
    fn append(
        &self,
        user_id: &str,
        snapshot: &IdentitySnapshot,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All versions for a user, ascending by version.
    fn history(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<IdentitySnapshot>, RepositoryError>> + Send;

    /// Highest version acceptable under `policy`, if any.
    fn current(
        &self,
        user_id: &str,
        policy: ApprovalPolicy,
    ) -> impl std::future::Future<Output = Result<Option<IdentitySnapshot>, RepositoryError>> + Send
    {
        async move {
            let history = self.history(user_id).await?;
            Ok(select_current(&history, policy).cloned())
        }
    }
}
