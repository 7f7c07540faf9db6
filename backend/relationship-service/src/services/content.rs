use crate::domain::models::{ContentKind, Profile, ReactableContent};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::GraphStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Posts and profiles, the roots that comments, reactions and follows attach to
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn GraphStore>,
}

impl ContentService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Create a post owned by `owner` with no comments yet
    #[instrument(skip(self))]
    pub async fn publish(&self, owner: &str) -> ServiceResult<ReactableContent> {
        metrics::track("publish", async {
            let mut tx = self.store.begin().await?;
            if tx.find_profile(owner).await?.is_none() {
                return Err(ServiceError::ProfileNotFound(owner.to_string()));
            }

            let content = tx.insert_content(owner, ContentKind::Post).await?;
            tx.commit().await?;

            info!(content_id = content.id, owner, "Post published");
            Ok(content)
        })
        .await
    }

    pub async fn get_content(&self, content_id: i64) -> ServiceResult<ReactableContent> {
        metrics::track("get_content", async {
            let mut tx = self.store.begin().await?;
            tx.find_content(content_id)
                .await?
                .ok_or(ServiceError::ContentNotFound(content_id))
        })
        .await
    }

    /// Idempotent; an existing profile is returned unchanged.
    ///
    /// Usernames are stored exactly as given and every lookup is exact, so a name that is empty
    /// or carries surrounding whitespace is rejected.
    pub async fn register_profile(&self, username: &str) -> ServiceResult<Profile> {
        metrics::track("register_profile", async {
            validate_username(username)?;

            let mut tx = self.store.begin().await?;
            let profile = tx.insert_profile(username).await?;
            tx.commit().await?;

            debug!(username, "Profile registered");
            Ok(profile)
        })
        .await
    }
}

fn validate_username(username: &str) -> ServiceResult<()> {
    if username.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "username must not be empty".to_string(),
        ));
    }
    if username.trim() != username {
        return Err(ServiceError::InvalidInput(format!(
            "username {:?} has surrounding whitespace",
            username
        )));
    }
    Ok(())
}
