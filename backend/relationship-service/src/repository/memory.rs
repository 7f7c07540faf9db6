//! In-memory graph store.
//!
//! The whole arena sits behind one async mutex. A unit of work holds the owned guard for its
//! lifetime and mutates a working copy; commit swaps the copy in, drop discards it. That gives
//! serializable isolation, which is what the PostgreSQL backend approximates with row locks.
//!
//! Referential rules mirror the SQL schema (no dangling parent ids, no deleting rows that are
//! still referenced) so ordering bugs in the services show up in tests.

use crate::domain::models::{
    Comment, ContentKind, MediaPayload, MediaRecord, NewComment, Profile, ReactableContent,
    Reaction, ReactionType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::{GraphStore, GraphTx};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Storage step that can be forced to fail, for exercising rollback paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertMedia,
    InsertComment,
    AdjustCommentCount,
    UpdateCommentText,
    ReplaceMediaPayload,
    DeleteComment,
    DeleteMedia,
    DeleteReactions,
    Commit,
}

/// Row counts per table, for asserting that nothing leaked or got orphaned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub contents: usize,
    pub comments: usize,
    pub media: usize,
    pub reactions: usize,
    pub profiles: usize,
    pub follows: usize,
}

#[derive(Debug, Clone)]
struct CommentRow {
    author: String,
    commented_on: i64,
    text: String,
    media_id: i64,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    next_content_id: i64,
    next_media_id: i64,
    next_reaction_id: i64,
    contents: BTreeMap<i64, ReactableContent>,
    comments: BTreeMap<i64, CommentRow>,
    media: BTreeMap<i64, MediaRecord>,
    reactions: BTreeMap<i64, Reaction>,
    profiles: BTreeMap<String, Profile>,
    /// (follower, followee)
    follows: BTreeSet<(String, String)>,
}

#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
    fail_point: Arc<std::sync::Mutex<Option<FailPoint>>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent unit of work fail when it reaches `point`. `None` clears it.
    pub fn fail_on(&self, point: Option<FailPoint>) {
        *self.fail_point.lock().unwrap_or_else(PoisonError::into_inner) = point;
    }

    pub async fn counts(&self) -> StoreCounts {
        let state = self.state.lock().await;
        StoreCounts {
            contents: state.contents.len(),
            comments: state.comments.len(),
            media: state.media.len(),
            reactions: state.reactions.len(),
            profiles: state.profiles.len(),
            follows: state.follows.len(),
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn begin(&self) -> ServiceResult<Box<dyn GraphTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let fail_point = *self.fail_point.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Box::new(MemoryGraphTx {
            guard,
            working,
            fail_point,
        }))
    }

    async fn ping(&self) -> ServiceResult<()> {
        Ok(())
    }
}

pub struct MemoryGraphTx {
    guard: OwnedMutexGuard<GraphState>,
    working: GraphState,
    fail_point: Option<FailPoint>,
}

fn constraint(msg: String) -> ServiceError {
    ServiceError::Internal(format!("constraint violation: {}", msg))
}

impl MemoryGraphTx {
    fn check(&self, point: FailPoint) -> ServiceResult<()> {
        if self.fail_point == Some(point) {
            return Err(ServiceError::Internal(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }

    fn assemble(&self, id: i64, row: &CommentRow) -> ServiceResult<Comment> {
        let content = self
            .working
            .contents
            .get(&id)
            .ok_or_else(|| constraint(format!("comment {} has no content row", id)))?;
        let media = self
            .working
            .media
            .get(&row.media_id)
            .ok_or_else(|| constraint(format!("comment {} has no media row", id)))?;
        Ok(Comment {
            id,
            author: row.author.clone(),
            commented_on: row.commented_on,
            text: row.text.clone(),
            media: media.clone(),
            num_of_comments: content.num_of_comments,
            created_at: content.created_at,
        })
    }

    fn require_profile(&self, username: &str) -> ServiceResult<()> {
        if self.working.profiles.contains_key(username) {
            Ok(())
        } else {
            Err(constraint(format!("unknown profile {}", username)))
        }
    }

    fn profiles_for<'a>(&self, usernames: impl Iterator<Item = &'a String>) -> Vec<Profile> {
        let mut profiles: Vec<Profile> = usernames
            .filter_map(|name| self.working.profiles.get(name).cloned())
            .collect();
        profiles.sort_by(|a, b| a.username.cmp(&b.username));
        profiles
    }
}

#[async_trait]
impl GraphTx for MemoryGraphTx {
    async fn insert_content(
        &mut self,
        owner: &str,
        kind: ContentKind,
    ) -> ServiceResult<ReactableContent> {
        self.require_profile(owner)?;
        self.working.next_content_id += 1;
        let content = ReactableContent {
            id: self.working.next_content_id,
            owner: owner.to_string(),
            kind,
            num_of_comments: 0,
            created_at: Utc::now(),
        };
        self.working.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn find_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>> {
        Ok(self.working.contents.get(&id).cloned())
    }

    async fn lock_content(&mut self, id: i64) -> ServiceResult<Option<ReactableContent>> {
        // The whole arena is already held exclusively
        self.find_content(id).await
    }

    async fn adjust_comment_count(&mut self, id: i64, delta: i64) -> ServiceResult<i64> {
        self.check(FailPoint::AdjustCommentCount)?;
        let content = self
            .working
            .contents
            .get_mut(&id)
            .ok_or(ServiceError::ContentNotFound(id))?;
        let next = content.num_of_comments + delta;
        if next < 0 {
            return Err(constraint(format!(
                "num_of_comments of {} would become negative",
                id
            )));
        }
        content.num_of_comments = next;
        Ok(next)
    }

    async fn find_comment(&mut self, id: i64) -> ServiceResult<Option<Comment>> {
        match self.working.comments.get(&id) {
            Some(row) => self.assemble(id, row).map(Some),
            None => Ok(None),
        }
    }

    async fn comments_on(&mut self, content_id: i64) -> ServiceResult<Vec<Comment>> {
        // BTreeMap iteration is id order, and ids are handed out in insertion order
        self.working
            .comments
            .iter()
            .filter(|(_, row)| row.commented_on == content_id)
            .map(|(id, row)| self.assemble(*id, row))
            .collect()
    }

    async fn insert_comment(&mut self, comment: NewComment) -> ServiceResult<Comment> {
        self.check(FailPoint::InsertComment)?;
        if !self.working.contents.contains_key(&comment.commented_on) {
            return Err(constraint(format!(
                "parent content {} does not exist",
                comment.commented_on
            )));
        }
        if !self.working.media.contains_key(&comment.media_id) {
            return Err(constraint(format!(
                "media {} does not exist",
                comment.media_id
            )));
        }
        if self
            .working
            .comments
            .values()
            .any(|row| row.media_id == comment.media_id)
        {
            return Err(constraint(format!(
                "media {} already owned by another comment",
                comment.media_id
            )));
        }

        let content = self.insert_content(&comment.author, ContentKind::Comment).await?;
        let row = CommentRow {
            author: comment.author,
            commented_on: comment.commented_on,
            text: comment.text,
            media_id: comment.media_id,
        };
        let assembled = self.assemble(content.id, &row)?;
        self.working.comments.insert(content.id, row);
        Ok(assembled)
    }

    async fn update_comment_text(&mut self, id: i64, text: &str) -> ServiceResult<()> {
        self.check(FailPoint::UpdateCommentText)?;
        let row = self
            .working
            .comments
            .get_mut(&id)
            .ok_or(ServiceError::CommentNotFound(id))?;
        row.text = text.to_string();
        Ok(())
    }

    async fn delete_comment(&mut self, id: i64) -> ServiceResult<()> {
        self.check(FailPoint::DeleteComment)?;
        if self
            .working
            .comments
            .values()
            .any(|row| row.commented_on == id)
        {
            return Err(constraint(format!("comment {} still has replies", id)));
        }
        if self.working.reactions.values().any(|r| r.content_id == id) {
            return Err(constraint(format!("comment {} still has reactions", id)));
        }
        self.working
            .comments
            .remove(&id)
            .ok_or(ServiceError::CommentNotFound(id))?;
        self.working.contents.remove(&id);
        Ok(())
    }

    async fn insert_media(&mut self, payload: &MediaPayload) -> ServiceResult<MediaRecord> {
        self.check(FailPoint::InsertMedia)?;
        self.working.next_media_id += 1;
        let record = MediaRecord {
            id: self.working.next_media_id,
            data: payload.data.clone(),
            mime_type: payload.mime_type.clone(),
        };
        self.working.media.insert(record.id, record.clone());
        Ok(record)
    }

    async fn replace_media_payload(
        &mut self,
        id: i64,
        payload: &MediaPayload,
    ) -> ServiceResult<()> {
        self.check(FailPoint::ReplaceMediaPayload)?;
        let record = self
            .working
            .media
            .get_mut(&id)
            .ok_or_else(|| constraint(format!("media {} does not exist", id)))?;
        record.data = payload.data.clone();
        record.mime_type = payload.mime_type.clone();
        Ok(())
    }

    async fn delete_media(&mut self, id: i64) -> ServiceResult<()> {
        self.check(FailPoint::DeleteMedia)?;
        if self.working.comments.values().any(|row| row.media_id == id) {
            return Err(constraint(format!("media {} is still referenced", id)));
        }
        self.working.media.remove(&id);
        Ok(())
    }

    async fn find_reaction(&mut self, id: i64) -> ServiceResult<Option<Reaction>> {
        Ok(self.working.reactions.get(&id).cloned())
    }

    async fn find_reaction_by(
        &mut self,
        reactor: &str,
        content_id: i64,
    ) -> ServiceResult<Option<Reaction>> {
        Ok(self
            .working
            .reactions
            .values()
            .find(|r| r.reactor == reactor && r.content_id == content_id)
            .cloned())
    }

    async fn reactions_on(&mut self, content_id: i64) -> ServiceResult<Vec<Reaction>> {
        Ok(self
            .working
            .reactions
            .values()
            .filter(|r| r.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn insert_reaction(
        &mut self,
        reactor: &str,
        content_id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction> {
        self.require_profile(reactor)?;
        if !self.working.contents.contains_key(&content_id) {
            return Err(constraint(format!("content {} does not exist", content_id)));
        }
        if self
            .working
            .reactions
            .values()
            .any(|r| r.reactor == reactor && r.content_id == content_id)
        {
            return Err(constraint(format!(
                "{} already reacted to {}",
                reactor, content_id
            )));
        }
        self.working.next_reaction_id += 1;
        let reaction = Reaction {
            id: self.working.next_reaction_id,
            reactor: reactor.to_string(),
            reaction_type,
            content_id,
            created_at: Utc::now(),
        };
        self.working.reactions.insert(reaction.id, reaction.clone());
        Ok(reaction)
    }

    async fn update_reaction_type(
        &mut self,
        id: i64,
        reaction_type: ReactionType,
    ) -> ServiceResult<Reaction> {
        let reaction = self
            .working
            .reactions
            .get_mut(&id)
            .ok_or(ServiceError::ReactionNotFound(id))?;
        reaction.reaction_type = reaction_type;
        Ok(reaction.clone())
    }

    async fn delete_reaction(&mut self, id: i64) -> ServiceResult<()> {
        self.working.reactions.remove(&id);
        Ok(())
    }

    async fn delete_reactions_on(&mut self, content_id: i64) -> ServiceResult<u64> {
        self.check(FailPoint::DeleteReactions)?;
        let before = self.working.reactions.len();
        self.working
            .reactions
            .retain(|_, r| r.content_id != content_id);
        Ok((before - self.working.reactions.len()) as u64)
    }

    async fn find_profile(&mut self, username: &str) -> ServiceResult<Option<Profile>> {
        Ok(self.working.profiles.get(username).cloned())
    }

    async fn insert_profile(&mut self, username: &str) -> ServiceResult<Profile> {
        let profile = self
            .working
            .profiles
            .entry(username.to_string())
            .or_insert_with(|| Profile {
                username: username.to_string(),
                created_at: Utc::now(),
            });
        Ok(profile.clone())
    }

    async fn insert_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        self.require_profile(follower)?;
        self.require_profile(followee)?;
        if follower == followee {
            return Err(constraint(format!("{} cannot follow itself", follower)));
        }
        Ok(self
            .working
            .follows
            .insert((follower.to_string(), followee.to_string())))
    }

    async fn delete_follow(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        Ok(self
            .working
            .follows
            .remove(&(follower.to_string(), followee.to_string())))
    }

    async fn is_following(&mut self, follower: &str, followee: &str) -> ServiceResult<bool> {
        Ok(self
            .working
            .follows
            .contains(&(follower.to_string(), followee.to_string())))
    }

    async fn followers_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>> {
        let names = self
            .working
            .follows
            .iter()
            .filter(|(_, followee)| followee == username)
            .map(|(follower, _)| follower);
        Ok(self.profiles_for(names))
    }

    async fn following_of(&mut self, username: &str) -> ServiceResult<Vec<Profile>> {
        let names = self
            .working
            .follows
            .iter()
            .filter(|(follower, _)| follower == username)
            .map(|(_, followee)| followee);
        Ok(self.profiles_for(names))
    }

    async fn commit(self: Box<Self>) -> ServiceResult<()> {
        self.check(FailPoint::Commit)?;
        let MemoryGraphTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
