use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a reactable content row. Comments share the identity space with posts,
/// so a comment can itself be commented on and reacted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "comment" => Ok(ContentKind::Comment),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// Reactable content - anything that carries comments and reactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactableContent {
    pub id: i64,
    pub owner: String,
    pub kind: ContentKind,
    /// Always equals the number of live comments whose `commented_on` is this id
    pub num_of_comments: i64,
    pub created_at: DateTime<Utc>,
}

/// Media record owned by exactly one comment. `data` is the compressed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaRecord {
    pub id: i64,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Comment entity - a reactable content posted on another reactable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author: String,
    /// Back reference to the content (post or comment) this comment was posted on
    pub commented_on: i64,
    pub text: String,
    pub media: MediaRecord,
    /// Number of direct replies
    pub num_of_comments: i64,
    pub created_at: DateTime<Utc>,
}

/// Mime type of the placeholder media attached to text-only comments
pub const PLACEHOLDER_MIME_TYPE: &str = "text/plain";
/// Size of the zero-filled placeholder payload
pub const PLACEHOLDER_MEDIA_LEN: usize = 10;

/// Media payload ready to be written: `data` is already compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl MediaPayload {
    /// Placeholder stored when a comment carries no media, keeping the media column non-null
    pub fn placeholder() -> Self {
        Self {
            data: vec![0u8; PLACEHOLDER_MEDIA_LEN],
            mime_type: PLACEHOLDER_MIME_TYPE.to_string(),
        }
    }
}

/// Fields needed to persist a new comment inside a unit of work
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: String,
    pub commented_on: i64,
    pub text: String,
    pub media_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionType {
    Like,
    Dislike,
    Love,
    Support,
    Haha,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "LIKE",
            ReactionType::Dislike => "DISLIKE",
            ReactionType::Love => "LOVE",
            ReactionType::Support => "SUPPORT",
            ReactionType::Haha => "HAHA",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIKE" => Ok(ReactionType::Like),
            "DISLIKE" => Ok(ReactionType::Dislike),
            "LOVE" => Ok(ReactionType::Love),
            "SUPPORT" => Ok(ReactionType::Support),
            "HAHA" => Ok(ReactionType::Haha),
            other => Err(format!("unknown reaction type: {}", other)),
        }
    }
}

/// Reaction entity - one profile reacting to one reactable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub reactor: String,
    pub reaction_type: ReactionType,
    /// Back reference to the post or comment this reaction targets
    pub content_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Profile entity. Follower/following sets are derived from follow edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a cascading comment delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDeletion {
    pub comment_id: i64,
    pub reactions_removed: u64,
    pub replies_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_type_parse() {
        assert_eq!("LIKE".parse::<ReactionType>().unwrap(), ReactionType::Like);
        assert_eq!("haha".parse::<ReactionType>().unwrap(), ReactionType::Haha);
        assert!("ANGRY".parse::<ReactionType>().is_err());
    }

    #[test]
    fn test_reaction_type_serializes_uppercase() {
        let json = serde_json::to_string(&ReactionType::Support).unwrap();
        assert_eq!(json, "\"SUPPORT\"");
        assert_eq!(ReactionType::Dislike.to_string(), "DISLIKE");
    }

    #[test]
    fn test_content_kind_round_trip_names() {
        assert_eq!(ContentKind::Post.as_str(), "post");
        assert_eq!("comment".parse::<ContentKind>().unwrap(), ContentKind::Comment);
        assert!("story".parse::<ContentKind>().is_err());
    }
}
