use bincode::{Decode, Encode};
use chirp_core::post::{
    CommentLevel, GeoPoint, MediaItem, PostStatus, RetweetLink, Visibility,
};
use chirp_core::{PostId, RankScore, Timestamp, UserId};

#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

def_table! {
    /// Tracks database/schema version
    db_version: () => u64
}

// POSTS
def_table!(posts: PostId => PostRecord);
def_table! {
    /// One-to-one with `posts`: counters and denormalized filter fields.
    ///
    /// Created in the same transaction as the post; only the toggle and
    /// engagement paths mutate it afterwards.
    post_indexes: PostId => PostIndexRecord
}
def_table! {
    /// Ranked-feed ordering: reverse scans yield rank desc, then newest first.
    posts_by_rank: (RankScore, Timestamp, PostId) => ()
}
def_table!(posts_by_author: (UserId, Timestamp, PostId) => ());
def_table!(post_comments: (PostId, Timestamp, PostId) => ());

// TOGGLE MEMBERSHIP
def_table! {
    /// Which users voted on which posts; the key is the whole fact, so a
    /// pair can never be present twice.
    post_votes: (UserId, PostId) => VoteRecord
}
def_table!(post_retweets: (UserId, PostId) => RetweetRecord);

// SOCIAL GRAPH
def_table! {
    /// Directed follow edges. "Friendship" is both directions `Normal`.
    friend_edges: (UserId, UserId) => FriendEdgeRecord
}
def_table!(blocks: (UserId, UserId) => BlockRecord);

#[derive(Debug, Encode, Decode, Clone)]
pub struct PostRecord {
    pub author: UserId,
    pub content: String,
    pub medias: Vec<MediaItem>,
    pub location: Option<GeoPoint>,
    pub visibility: Visibility,
    pub comment_level: CommentLevel,
    pub retweet: Option<RetweetLink>,
    pub status: PostStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct PostIndexRecord {
    pub overall: RankScore,
    /// Tie-breaker assigned once at creation, for sampling-style queries.
    pub random_sort: u32,
    pub vote_count: u64,
    pub retweet_count: u64,
    pub comment_count: u64,
    pub read_count: u64,
    // Denormalized from the post, so feed predicates never join `posts`.
    pub author: UserId,
    pub visibility: Visibility,
    pub status: PostStatus,
    pub retweet: Option<RetweetLink>,
    pub created_at: Timestamp,
}

impl PostIndexRecord {
    pub fn fresh(post: &PostRecord, random_sort: u32) -> Self {
        Self {
            overall: RankScore::ZERO,
            random_sort,
            vote_count: 0,
            retweet_count: 0,
            comment_count: 0,
            read_count: 0,
            author: post.author,
            visibility: post.visibility,
            status: post.status,
            retweet: post.retweet,
            created_at: post.created_at,
        }
    }

    /// Stand-in for an index row that has not materialized yet.
    pub fn zeroed(post: &PostRecord) -> Self {
        Self::fresh(post, 0)
    }
}

#[derive(Debug, Encode, Decode, Clone, Copy, Default)]
pub struct VoteRecord;
#[derive(Debug, Encode, Decode, Clone, Copy, Default)]
pub struct RetweetRecord;

#[derive(Debug, Encode, Decode, Clone, Copy, PartialEq, Eq)]
pub enum FriendStatus {
    Pending,
    Normal,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct FriendEdgeRecord {
    pub status: FriendStatus,
    pub ts: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct BlockRecord {
    pub ts: Timestamp,
}
