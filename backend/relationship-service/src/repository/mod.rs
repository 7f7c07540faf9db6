//! Storage seam for the relationship graph.
//!
//! Every service operation opens one [`GraphTx`] through [`GraphStore::begin`], performs all of
//! its reads and writes on it, and calls [`GraphTx::commit`]. Dropping a transaction without
//! committing rolls everything back, so an early `?` return never leaves partial state.

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, MemoryGraphStore, StoreCounts};
pub use postgres::PgGraphStore;

use crate::domain::models::{
    Comment, ContentKind, MediaPayload, MediaRecord, NewComment, Profile, ReactableContent,
    Reaction, ReactionType,
};
use crate::error::ServiceResult;
use async_trait::async_trait;

/// Factory for units of work.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> ServiceResult<Box<dyn GraphTx>>;

    /// Cheap liveness check used by readiness probes
    async fn ping(&self) -> ServiceResult<()>;
}

/// One all-or-nothing unit of work against the relationship graph.
#[async_trait]
pub trait GraphTx: Send {
    // ========== Content ==========

    async fn insert_content(&mut self, owner: &str, kind: ContentKind)
        -> ServiceResult<ReactableContent>;

    async fn find_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>>;

    /// Like `find_content`, but holds the row exclusively until the unit of work ends.
    /// Mutations that read-then-write a content's comment collection must lock first.
    async fn lock_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>>;

    /// Add `delta` to `num_of_comments` and return the new value
    async fn adjust_comment_count(&mut self, id: i64, delta: i64) -> ServiceResult<i64>;

    // ========== Comments ==========

    async fn find_comment(&mut self, id: i64) -> ServiceResult<Option<Comment>>;

    /// Direct comments on a content, in insertion order
    async fn comments_on(&mut self, content_id: i64) -> ServiceResult<Vec<Comment>>;

    /// Insert the comment together with its reactable content row
    async fn insert_comment(&mut self, comment: NewComment) -> ServiceResult<Comment>;

    async fn update_comment_text(&mut self, id: i64, text: &str) -> ServiceResult<()>;

    /// Remove the comment and its reactable content row. Reactions, replies and the media
    /// record must already be gone or be removed afterwards (media only).
    async fn delete_comment(&mut self, id: i64) -> ServiceResult<()>;

    // ========== Media ==========

    async fn insert_media(&mut self, payload: &MediaPayload) -> ServiceResult<MediaRecord>;

    /// Replace payload and mime type of an existing record in place
    async fn replace_media_payload(&mut self, id: i64, payload: &MediaPayload)
        -> ServiceResult<()>;

    async fn delete_media(&mut self, id: i64) -> ServiceResult<()>;

    // ========== Reactions ==========

    async fn find_reaction(&mut self, id: i64) -> ServiceResult<Option<Reaction>>;

    async fn find_reaction_by(
        &mut self,
        reactor: &str,
        content_id: i64,
    ) -> ServiceResult<Option<Reaction>>;

    /// Reactions on a content, in insertion order
    async fn reactions_on(&mut self, content_id: i64) -> ServiceResult<Vec<Reaction>>;

    async fn insert_reaction(
        &mut self,
        reactor: &str,
        content_id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction>;

    async fn update_reaction_type(
        &mut self,
        id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction>;

    async fn delete_reaction(&mut self, id: i64) -> ServiceResult<()>;

    /// Delete every reaction on a content; returns how many were removed
    async fn delete_reactions_on(&mut self, content_id: i64) -> ServiceResult<u64>;

    // ========== Profiles & follow edges ==========

    async fn find_profile(&mut self, username: &str) -> ServiceResult<Option<Profile>>;

    /// Idempotent; returns the stored profile
    async fn insert_profile(&mut self, username: &str) -> ServiceResult<Profile>;

    /// Returns true when a new edge was created
    async fn insert_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool>;

    /// Returns true when an edge was removed
    async fn delete_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool>;

    async fn is_following(&mut self, follower: &str, followee: &str) -> ServiceResult<bool>;

    /// Profiles following `username`, sorted by username
    async fn followers_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>>;

    /// Profiles `username` follows, sorted by username
    async fn following_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>>;

    // ========== Boundary ==========

    async fn commit(self: Box<Self>) -> ServiceResult<()>;
}
