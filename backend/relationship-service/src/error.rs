/// Error types for relationship-service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Content not found: {0}")]
    ContentNotFound(i64),

    #[error("Comment not found: {0}")]
    CommentNotFound(i64),

    #[error("Comment {comment_id} does not belong to content {content_id}")]
    CommentNotOnContent { comment_id: i64, content_id: i64 },

    #[error("Reaction not found: {0}")]
    ReactionNotFound(i64),

    #[error("Reaction {reaction_id} does not belong to content {content_id}")]
    ReactionNotOnContent { reaction_id: i64, content_id: i64 },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Profile {0} cannot follow itself")]
    CannotFollowSelf(String),

    #[error("Media I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// True for failures caused by a referenced entity that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::ContentNotFound(_)
                | ServiceError::CommentNotFound(_)
                | ServiceError::ReactionNotFound(_)
                | ServiceError::ProfileNotFound(_)
        )
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ContentNotFound(_) => "content_not_found",
            ServiceError::CommentNotFound(_) => "comment_not_found",
            ServiceError::CommentNotOnContent { .. } => "comment_not_on_content",
            ServiceError::ReactionNotFound(_) => "reaction_not_found",
            ServiceError::ReactionNotOnContent { .. } => "reaction_not_on_content",
            ServiceError::ProfileNotFound(_) => "profile_not_found",
            ServiceError::CannotFollowSelf(_) => "cannot_follow_self",
            ServiceError::Io(_) => "io",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Database(_) => "database",
            ServiceError::Internal(_) => "internal",
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_grouping() {
        assert!(ServiceError::CommentNotFound(1).is_not_found());
        assert!(ServiceError::ProfileNotFound("bob".into()).is_not_found());
        assert!(!ServiceError::CannotFollowSelf("bob".into()).is_not_found());
        assert!(!ServiceError::CommentNotOnContent {
            comment_id: 1,
            content_id: 2
        }
        .is_not_found());
    }

    #[test]
    fn test_display() {
        let err = ServiceError::CommentNotOnContent {
            comment_id: 42,
            content_id: 7,
        };
        assert_eq!(err.to_string(), "Comment 42 does not belong to content 7");
        assert_eq!(err.kind(), "comment_not_on_content");
    }
}
