//! Post content types shared between storage and the service layer.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::PostId;

/// Who can see a post in feeds.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Mutual friends of the author (and the author).
    Friends,
    /// The author alone.
    SelfOnly,
}

/// Who may comment on a post.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentLevel {
    Nobody,
    Friends,
    Everybody,
}

#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Normal,
    /// Soft-deleted: unreachable from feeds, still addressable by id.
    Deleted,
}

/// How a post links to another post, if it does.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetweetKind {
    Retweet,
    Comment,
}

#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetweetLink {
    pub post_id: PostId,
    pub kind: RetweetKind,
}

#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub url: String,
    pub mime: String,
}

/// Optional geotag attached at publish time.
#[derive(Encode, Decode, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Everything the author decides about a post; the rest (id, timestamps,
/// counters) is assigned by the publish path.
#[derive(Debug, Clone, bon::Builder)]
pub struct PostDraft {
    #[builder(into)]
    pub content: String,
    #[builder(default)]
    pub medias: Vec<MediaItem>,
    pub location: Option<GeoPoint>,
    #[builder(default = Visibility::Public)]
    pub visibility: Visibility,
    #[builder(default = CommentLevel::Everybody)]
    pub comment_level: CommentLevel,
    pub retweet: Option<RetweetLink>,
}
