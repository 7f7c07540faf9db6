pub mod comments;
pub mod content;
pub mod follow;
pub mod media;
pub mod reactions;

pub use comments::CommentService;
pub use content::ContentService;
pub use follow::FollowService;
pub use media::MediaUpload;
pub use reactions::ReactionService;

use crate::config::GraphConfig;
use crate::error::ServiceResult;
use crate::repository::GraphStore;
use std::sync::Arc;

/// Entry point to every relationship graph operation, all sharing one store
#[derive(Clone)]
pub struct RelationshipGraph {
    pub content: ContentService,
    pub comments: CommentService,
    pub reactions: ReactionService,
    pub follows: FollowService,
    store: Arc<dyn GraphStore>,
}

impl RelationshipGraph {
    pub fn new(store: Arc<dyn GraphStore>, config: &GraphConfig) -> Self {
        Self {
            content: ContentService::new(store.clone()),
            comments: CommentService::new(store.clone(), config),
            reactions: ReactionService::new(store.clone()),
            follows: FollowService::new(store.clone()),
            store,
        }
    }

    /// Readiness probe against the backing store
    pub async fn ping(&self) -> ServiceResult<()> {
        self.store.ping().await
    }
}
