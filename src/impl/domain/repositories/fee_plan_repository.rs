use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::{FeePlan, UserId};

#[async_trait]
pub trait FeePlanRepository: Send + Sync {
    /// Loads the user's fee plan, if any. Fails if the stored plan row does
    /// not parse into a valid plan (callers on the fee-computation path
    /// absorb that failure as "no fee").
    async fn find_for_user(&self, user_id: UserId) -> Result<Option<FeePlan>, ServerError>;

    /// Creates or replaces the user's plan (at most one plan per user).
    async fn put(&self, plan: FeePlan) -> Result<(), ServerError>;
}
