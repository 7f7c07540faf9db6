use crate::domain::models::Profile;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{GraphStore, GraphTx};
use std::sync::Arc;
use tracing::{info, instrument};

/// Follow edges between profiles.
///
/// A single edge set backs both the follower and the following view, so the two sides of a
/// relationship cannot drift apart.
#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn GraphStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Make `follower` follow `username`. Idempotent; returns the follower profile.
    #[instrument(skip(self))]
    pub async fn add_follower(&self, username: &str, follower: &str) -> ServiceResult<Profile> {
        metrics::track("add_follower", async {
            if username == follower {
                return Err(ServiceError::CannotFollowSelf(username.to_string()));
            }

            let mut tx = self.store.begin().await?;
            require_profile(tx.as_mut(), username).await?;
            let follower_profile = require_profile(tx.as_mut(), follower).await?;

            let created = tx.insert_follow(follower, username).await?;
            tx.commit().await?;

            if created {
                info!(followee = username, follower, "Follow created");
            }
            Ok(follower_profile)
        })
        .await
    }

    /// Remove `follower` from the followers of `username`
    #[instrument(skip(self))]
    pub async fn delete_follower(&self, username: &str, follower: &str) -> ServiceResult<bool> {
        metrics::track("delete_follower", self.unlink(follower, username)).await
    }

    /// Stop `username` from following `followee`
    #[instrument(skip(self))]
    pub async fn delete_following(&self, username: &str, followee: &str) -> ServiceResult<bool> {
        metrics::track("delete_following", self.unlink(username, followee)).await
    }

    async fn unlink(&self, follower: &str, followee: &str) -> ServiceResult<bool> {
        let mut tx = self.store.begin().await?;
        require_profile(tx.as_mut(), followee).await?;
        require_profile(tx.as_mut(), follower).await?;

        let removed = tx.delete_follow(follower, followee).await?;
        tx.commit().await?;

        if removed {
            info!(followee, follower, "Follow removed");
        }
        Ok(removed)
    }

    /// Profiles following `username`, sorted by username
    pub async fn get_followers(&self, username: &str) -> ServiceResult<Vec<Profile>> {
        metrics::track("get_followers", async {
            let mut tx = self.store.begin().await?;
            require_profile(tx.as_mut(), username).await?;
            tx.followers_of(username).await
        })
        .await
    }

    /// Profiles `username` follows, sorted by username
    pub async fn get_following(&self, username: &str) -> ServiceResult<Vec<Profile>> {
        metrics::track("get_following", async {
            let mut tx = self.store.begin().await?;
            require_profile(tx.as_mut(), username).await?;
            tx.following_of(username).await
        })
        .await
    }

    /// The profile of `follower`, provided it follows `username`
    pub async fn get_follower(&self, username: &str, follower: &str) -> ServiceResult<Profile> {
        metrics::track("get_follower", async {
            let mut tx = self.store.begin().await?;
            require_profile(tx.as_mut(), username).await?;
            if !tx.is_following(follower, username).await? {
                return Err(ServiceError::ProfileNotFound(follower.to_string()));
            }
            require_profile(tx.as_mut(), follower).await
        })
        .await
    }

    /// The profile of `followee`, provided `username` follows it
    pub async fn get_followed(&self, username: &str, followee: &str) -> ServiceResult<Profile> {
        metrics::track("get_followed", async {
            let mut tx = self.store.begin().await?;
            require_profile(tx.as_mut(), username).await?;
            if !tx.is_following(username, followee).await? {
                return Err(ServiceError::ProfileNotFound(followee.to_string()));
            }
            require_profile(tx.as_mut(), followee).await
        })
        .await
    }
}

async fn require_profile(tx: &mut dyn GraphTx, username: &str) -> ServiceResult<Profile> {
    tx.find_profile(username)
        .await?
        .ok_or_else(|| ServiceError::ProfileNotFound(username.to_string()))
}
