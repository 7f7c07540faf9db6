use crate::domain::models::{Reaction, ReactionType};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::GraphStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reactions on posts and comments. A profile holds at most one reaction per content.
#[derive(Clone)]
pub struct ReactionService {
    store: Arc<dyn GraphStore>,
}

impl ReactionService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// React to a content, replacing the type of an earlier reaction by the same profile
    #[instrument(skip(self))]
    pub async fn react(
        &self,
        content_id: i64,
        reactor: &str,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction> {
        metrics::track("react", async {
            let mut tx = self.store.begin().await?;

            tx.lock_content(content_id)
                .await?
                .ok_or(ServiceError::ContentNotFound(content_id))?;
            if tx.find_profile(reactor).await?.is_none() {
                return Err(ServiceError::ProfileNotFound(reactor.to_string()));
            }

            let reaction = match tx.find_reaction_by(reactor, content_id).await? {
                Some(existing) if existing.reaction_type == reaction_type => existing,
                Some(existing) => tx.update_reaction_type(existing.id, reaction_type).await?,
                None => tx.insert_reaction(reactor, content_id, reaction_type).await?,
            };

            tx.commit().await?;

            info!(
                reaction_id = reaction.id,
                content_id,
                reaction_type = %reaction.reaction_type,
                "Reaction stored"
            );
            Ok(reaction)
        })
        .await
    }

    /// Reactions on a content, oldest first
    pub async fn get_reactions(&self, content_id: i64) -> ServiceResult<Vec<Reaction>> {
        metrics::track("get_reactions", async {
            let mut tx = self.store.begin().await?;
            tx.find_content(content_id)
                .await?
                .ok_or(ServiceError::ContentNotFound(content_id))?;
            tx.reactions_on(content_id).await
        })
        .await
    }

    /// Remove one reaction from the content it targets. The reactor profile stays.
    #[instrument(skip(self))]
    pub async fn remove_reaction(&self, content_id: i64, reaction_id: i64) -> ServiceResult<()> {
        metrics::track("remove_reaction", async {
            let mut tx = self.store.begin().await?;

            tx.lock_content(content_id)
                .await?
                .ok_or(ServiceError::ContentNotFound(content_id))?;
            let reaction = tx
                .find_reaction(reaction_id)
                .await?
                .ok_or(ServiceError::ReactionNotFound(reaction_id))?;
            if reaction.content_id != content_id {
                return Err(ServiceError::ReactionNotOnContent {
                    reaction_id,
                    content_id,
                });
            }

            tx.delete_reaction(reaction_id).await?;
            tx.commit().await?;

            info!(reaction_id, content_id, "Reaction removed");
            Ok(())
        })
        .await
    }

    /// True when `username` owns the reaction; false when the reaction does not exist
    pub async fn is_reactor(&self, username: &str, reaction_id: i64) -> ServiceResult<bool> {
        metrics::track("is_reactor", async {
            let mut tx = self.store.begin().await?;
            let is_reactor = tx
                .find_reaction(reaction_id)
                .await?
                .map(|reaction| reaction.reactor == username)
                .unwrap_or(false);

            debug!(username, reaction_id, is_reactor, "Checked reaction ownership");
            Ok(is_reactor)
        })
        .await
    }
}
