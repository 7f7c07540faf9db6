use crate::config::{GraphConfig, TextUpdatePolicy};
use crate::domain::models::{Comment, CommentDeletion, MediaPayload, NewComment};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{GraphStore, GraphTx};
use crate::services::media::{self, MediaUpload};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Comment side of the relationship graph.
///
/// Keeps `num_of_comments` on the parent content equal to the number of live comments, and
/// removes a comment's reactions, replies and media together with it.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn GraphStore>,
    text_update_policy: TextUpdatePolicy,
    compression_level: u32,
}

impl CommentService {
    pub fn new(store: Arc<dyn GraphStore>, config: &GraphConfig) -> Self {
        Self {
            store,
            text_update_policy: config.text_update_policy,
            compression_level: config.compression_level,
        }
    }

    /// Post a comment on a post or on another comment.
    ///
    /// Without media bytes the comment gets the placeholder media record. Text defaults to "".
    #[instrument(skip(self, media, text))]
    pub async fn add_comment(
        &self,
        content_id: i64,
        author: &str,
        media: Option<MediaUpload>,
        text: Option<String>,
    ) -> ServiceResult<Comment> {
        metrics::track(
            "add_comment",
            self.add_comment_inner(content_id, author, media, text),
        )
        .await
    }

    async fn add_comment_inner(
        &self,
        content_id: i64,
        author: &str,
        media: Option<MediaUpload>,
        text: Option<String>,
    ) -> ServiceResult<Comment> {
        let payload = media::prepare_upload(media, self.compression_level)
            .await?
            .unwrap_or_else(MediaPayload::placeholder);

        let mut tx = self.store.begin().await?;

        tx.lock_content(content_id)
            .await?
            .ok_or(ServiceError::ContentNotFound(content_id))?;
        if tx.find_profile(author).await?.is_none() {
            return Err(ServiceError::ProfileNotFound(author.to_string()));
        }

        let record = tx.insert_media(&payload).await?;
        let comment = tx
            .insert_comment(NewComment {
                author: author.to_string(),
                commented_on: content_id,
                text: text.unwrap_or_default(),
                media_id: record.id,
            })
            .await?;
        let num_of_comments = tx.adjust_comment_count(content_id, 1).await?;

        tx.commit().await?;

        info!(
            comment_id = comment.id,
            content_id, num_of_comments, "Comment added"
        );
        Ok(comment)
    }

    pub async fn get_comment(&self, comment_id: i64) -> ServiceResult<Comment> {
        metrics::track("get_comment", async {
            let mut tx = self.store.begin().await?;
            tx.find_comment(comment_id)
                .await?
                .ok_or(ServiceError::CommentNotFound(comment_id))
        })
        .await
    }

    /// Direct comments on a content, oldest first
    pub async fn get_comments(&self, content_id: i64) -> ServiceResult<Vec<Comment>> {
        metrics::track("get_comments", async {
            let mut tx = self.store.begin().await?;
            tx.find_content(content_id)
                .await?
                .ok_or(ServiceError::ContentNotFound(content_id))?;
            tx.comments_on(content_id).await
        })
        .await
    }

    /// Delete a comment from the content it was posted on.
    ///
    /// The whole reply subtree goes with it, each comment taking its reactions and media along.
    /// Profiles are never touched. The parent counter drops by exactly one.
    #[instrument(skip(self))]
    pub async fn delete_comment(
        &self,
        content_id: i64,
        comment_id: i64,
    ) -> ServiceResult<CommentDeletion> {
        let deletion = metrics::track(
            "delete_comment",
            self.delete_comment_inner(content_id, comment_id),
        )
        .await?;

        metrics::record_cascade_removed("reaction", deletion.reactions_removed);
        metrics::record_cascade_removed("reply", deletion.replies_removed);
        Ok(deletion)
    }

    async fn delete_comment_inner(
        &self,
        content_id: i64,
        comment_id: i64,
    ) -> ServiceResult<CommentDeletion> {
        let mut tx = self.store.begin().await?;

        tx.lock_content(content_id)
            .await?
            .ok_or(ServiceError::ContentNotFound(content_id))?;
        let comment = owned_comment(tx.as_mut(), content_id, comment_id).await?;

        let replies = collect_replies(tx.as_mut(), comment.id).await?;
        let mut deletion = CommentDeletion {
            comment_id,
            reactions_removed: 0,
            replies_removed: replies.len() as u64,
        };

        // Deepest replies sit at the end of the breadth-first walk
        for reply in replies.iter().rev() {
            deletion.reactions_removed += tx.delete_reactions_on(reply.id).await?;
            tx.delete_comment(reply.id).await?;
            tx.delete_media(reply.media.id).await?;
        }

        deletion.reactions_removed += tx.delete_reactions_on(comment.id).await?;
        let num_of_comments = tx.adjust_comment_count(content_id, -1).await?;
        tx.delete_comment(comment.id).await?;
        tx.delete_media(comment.media.id).await?;

        tx.commit().await?;

        info!(
            comment_id,
            content_id,
            num_of_comments,
            reactions_removed = deletion.reactions_removed,
            replies_removed = deletion.replies_removed,
            "Comment deleted"
        );
        Ok(deletion)
    }

    /// Replace media and/or text of a comment.
    ///
    /// Non-empty media bytes overwrite the existing media record in place. A missing `text`
    /// is resolved by the configured [`TextUpdatePolicy`].
    #[instrument(skip(self, media, text))]
    pub async fn update_comment(
        &self,
        content_id: i64,
        comment_id: i64,
        media: Option<MediaUpload>,
        text: Option<String>,
    ) -> ServiceResult<Comment> {
        metrics::track(
            "update_comment",
            self.update_comment_inner(content_id, comment_id, media, text),
        )
        .await
    }

    async fn update_comment_inner(
        &self,
        content_id: i64,
        comment_id: i64,
        media: Option<MediaUpload>,
        text: Option<String>,
    ) -> ServiceResult<Comment> {
        let payload = media::prepare_upload(media, self.compression_level).await?;

        let mut tx = self.store.begin().await?;

        tx.lock_content(content_id)
            .await?
            .ok_or(ServiceError::ContentNotFound(content_id))?;
        let comment = owned_comment(tx.as_mut(), content_id, comment_id).await?;

        if let Some(payload) = &payload {
            tx.replace_media_payload(comment.media.id, payload).await?;
        }

        let text = match (text, self.text_update_policy) {
            (Some(text), _) => Some(text),
            (None, TextUpdatePolicy::Keep) => None,
            (None, TextUpdatePolicy::Clear) => Some(String::new()),
        };
        if let Some(text) = &text {
            tx.update_comment_text(comment_id, text).await?;
        }

        let updated = tx
            .find_comment(comment_id)
            .await?
            .ok_or(ServiceError::CommentNotFound(comment_id))?;

        tx.commit().await?;

        info!(
            comment_id,
            content_id,
            media_replaced = payload.is_some(),
            text_changed = text.is_some(),
            "Comment updated"
        );
        Ok(updated)
    }

    /// True when `username` wrote the comment; false when the comment does not exist
    pub async fn is_comment_author(&self, username: &str, comment_id: i64) -> ServiceResult<bool> {
        metrics::track("is_comment_author", async {
            let mut tx = self.store.begin().await?;
            let is_author = tx
                .find_comment(comment_id)
                .await?
                .map(|comment| comment.author == username)
                .unwrap_or(false);

            debug!(username, comment_id, is_author, "Checked comment authorship");
            Ok(is_author)
        })
        .await
    }
}

/// Load a comment and make sure it was posted on `content_id`
async fn owned_comment(
    tx: &mut dyn GraphTx,
    content_id: i64,
    comment_id: i64,
) -> ServiceResult<Comment> {
    let comment = tx
        .find_comment(comment_id)
        .await?
        .ok_or(ServiceError::CommentNotFound(comment_id))?;

    if comment.commented_on != content_id {
        return Err(ServiceError::CommentNotOnContent {
            comment_id,
            content_id,
        });
    }
    Ok(comment)
}

/// Every reply below `comment_id`, breadth first.
///
/// Each comment's row is locked before its replies are listed, ancestors before descendants,
/// so writers already working under any comment of the subtree finish first and their rows
/// are part of the listing.
async fn collect_replies(tx: &mut dyn GraphTx, comment_id: i64) -> ServiceResult<Vec<Comment>> {
    lock_comment_row(tx, comment_id).await?;
    let mut replies = tx.comments_on(comment_id).await?;
    let mut cursor = 0;
    while cursor < replies.len() {
        let reply_id = replies[cursor].id;
        lock_comment_row(tx, reply_id).await?;
        let nested = tx.comments_on(reply_id).await?;
        replies.extend(nested);
        cursor += 1;
    }
    Ok(replies)
}

async fn lock_comment_row(tx: &mut dyn GraphTx, comment_id: i64) -> ServiceResult<()> {
    tx.lock_content(comment_id)
        .await?
        .ok_or(ServiceError::CommentNotFound(comment_id))?;
    Ok(())
}
