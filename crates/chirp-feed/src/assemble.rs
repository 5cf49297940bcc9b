use chirp_core::post::{CommentLevel, GeoPoint, MediaItem, PostStatus, RetweetLink};
use chirp_core::{PostId, RankScore, Timestamp, UserId};
use chirp_db::{FeedPostRecord, PostIndexRecord};
use itertools::Itertools as _;
use serde::Serialize;
use tracing::{debug, warn};

use crate::directory::{UserDirectory, UserProfile};
use crate::{FeedResult, FeedService, LOG_TARGET};

/// A post hydrated for display: author fields, counters and the viewer's
/// own toggle state merged in.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub created_at: Timestamp,
    pub content: String,
    pub medias: Vec<MediaItem>,
    pub location: Option<GeoPoint>,
    pub comment_level: CommentLevel,
    pub retweet: Option<RetweetLink>,
    pub vote_count: u64,
    pub vote_flag: bool,
    pub retweet_count: u64,
    pub retweet_flag: bool,
    pub comment_count: u64,
    pub read_count: u64,
    pub score: RankScore,
}

/// Displayed counts never include the viewer's own toggle; their own state
/// is the flag next to the number, not part of it.
fn excluding_self(count: u64, toggled: bool) -> u64 {
    if toggled { count.saturating_sub(1) } else { count }
}

impl<D> FeedService<D>
where
    D: UserDirectory,
{
    /// Hydrate a page of raw posts in four batch passes: author profiles,
    /// index rows, and the viewer's two membership sets. No per-row lookups.
    ///
    /// Rows with missing related data are papered over with placeholders; a
    /// row that cannot be rendered at all is dropped, never the whole page.
    pub(crate) async fn assemble(
        &self,
        viewer: UserId,
        posts: Vec<FeedPostRecord>,
    ) -> FeedResult<Vec<FeedItem>> {
        let post_ids: Vec<PostId> = posts.iter().map(|p| p.post_id).collect();
        let author_ids: Vec<UserId> = posts.iter().map(|p| p.post.author).unique().collect();

        let authors = self.users.batch_get(&author_ids).await;
        let indexes = self.db.get_post_indexes(&post_ids).await?;
        let votes = self.db.vote_set(viewer, &post_ids).await?;
        let retweets = self.db.retweet_set(viewer, &post_ids).await?;

        let mut items = Vec::with_capacity(posts.len());
        for FeedPostRecord { post_id, post } in posts {
            if post.status != PostStatus::Normal {
                debug!(target: LOG_TARGET, %post_id, "Dropping non-normal post from page");
                continue;
            }

            let author = authors
                .get(&post.author)
                .cloned()
                .unwrap_or_else(|| UserProfile::placeholder(post.author));
            let index = indexes.get(&post_id).cloned().unwrap_or_else(|| {
                warn!(target: LOG_TARGET, %post_id, "Post without an index row, rendering zeroed");
                PostIndexRecord::zeroed(&post)
            });

            let vote_flag = votes.contains(&post_id);
            let retweet_flag = retweets.contains(&post_id);

            items.push(FeedItem {
                post_id,
                author_id: post.author,
                author_name: author.name,
                author_avatar: author.avatar,
                created_at: post.created_at,
                content: post.content,
                medias: post.medias,
                location: post.location,
                comment_level: post.comment_level,
                retweet: post.retweet,
                vote_count: excluding_self(index.vote_count, vote_flag),
                vote_flag,
                retweet_count: excluding_self(index.retweet_count, retweet_flag),
                retweet_flag,
                comment_count: index.comment_count,
                read_count: index.read_count,
                score: index.overall,
            });
        }

        Ok(items)
    }
}
