pub mod models;

pub use models::{
    Comment, CommentDeletion, ContentKind, MediaPayload, MediaRecord, NewComment, Profile,
    ReactableContent, Reaction, ReactionType, PLACEHOLDER_MEDIA_LEN, PLACEHOLDER_MIME_TYPE,
};
