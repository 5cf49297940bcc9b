use std::collections::BTreeSet;

use chirp_core::post::{PostStatus, Visibility};
use chirp_core::{PostId, RankScore, Timestamp, UserId};
use tracing::warn;

use crate::{
    blocks, friend_edges, post_comments, post_indexes, posts, posts_by_author, posts_by_rank,
    Database, DbResult, PostRecord, LOG_TARGET,
};

/// A raw post as a feed query hands it to hydration: identifier plus the
/// stored record, counters not yet joined in.
#[derive(Debug, Clone)]
pub struct FeedPostRecord {
    pub post_id: PostId,
    pub post: PostRecord,
}

/// Per-class visibility decision. Blocks are not this function's business;
/// the ranked feed applies them separately, on top.
pub fn post_visible_to(
    viewer: UserId,
    friends: &BTreeSet<UserId>,
    author: UserId,
    visibility: Visibility,
) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Friends => author == viewer || friends.contains(&author),
        Visibility::SelfOnly => author == viewer,
    }
}

impl Database {
    const RANK_SPAN: std::ops::RangeInclusive<(RankScore, Timestamp, PostId)> =
        (RankScore::ZERO, Timestamp::ZERO, PostId::ZERO)
            ..=(RankScore::MAX, Timestamp::MAX, PostId::MAX);

    /// The main feed: every post the viewer may see, best-ranked first,
    /// newest first within a rank.
    pub async fn paginate_ranked_feed(
        &self,
        viewer: UserId,
        skip: u64,
        limit: usize,
    ) -> DbResult<(Vec<FeedPostRecord>, u64)> {
        self.read_with(|tx| {
            let posts_table = tx.open_table(&posts::TABLE)?;
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let posts_by_rank_table = tx.open_table(&posts_by_rank::TABLE)?;
            let friend_edges_table = tx.open_table(&friend_edges::TABLE)?;
            let blocks_table = tx.open_table(&blocks::TABLE)?;

            let friends = Self::mutual_friend_ids_tx(viewer, &friend_edges_table, &blocks_table)?;

            Self::paginate_partition_rev(
                &posts_by_rank_table,
                Self::RANK_SPAN,
                skip,
                limit,
                |&(_, _, post_id)| {
                    let Some(index) = Self::get_post_index_tx(post_id, &post_indexes_table)?
                    else {
                        warn!(target: LOG_TARGET, %post_id, "Rank entry without an index row");
                        return Ok(false);
                    };
                    Ok(index.status == PostStatus::Normal
                        && post_visible_to(viewer, &friends, index.author, index.visibility)
                        && !Self::is_blocked_either_tx(viewer, index.author, &blocks_table)?)
                },
                |(_, _, post_id)| Self::get_feed_post_tx(post_id, &posts_table),
            )
        })
        .await
    }

    /// Posts by the viewer's mutual friends only: no strangers, and the
    /// viewer's own posts excluded by construction.
    pub async fn paginate_friend_feed(
        &self,
        viewer: UserId,
        skip: u64,
        limit: usize,
    ) -> DbResult<(Vec<FeedPostRecord>, u64)> {
        self.read_with(|tx| {
            let posts_table = tx.open_table(&posts::TABLE)?;
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let posts_by_rank_table = tx.open_table(&posts_by_rank::TABLE)?;
            let friend_edges_table = tx.open_table(&friend_edges::TABLE)?;
            let blocks_table = tx.open_table(&blocks::TABLE)?;

            let friends = Self::mutual_friend_ids_tx(viewer, &friend_edges_table, &blocks_table)?;

            Self::paginate_partition_rev(
                &posts_by_rank_table,
                Self::RANK_SPAN,
                skip,
                limit,
                |&(_, _, post_id)| {
                    let Some(index) = Self::get_post_index_tx(post_id, &post_indexes_table)?
                    else {
                        warn!(target: LOG_TARGET, %post_id, "Rank entry without an index row");
                        return Ok(false);
                    };
                    Ok(index.status == PostStatus::Normal
                        && matches!(index.visibility, Visibility::Public | Visibility::Friends)
                        && friends.contains(&index.author))
                },
                |(_, _, post_id)| Self::get_feed_post_tx(post_id, &posts_table),
            )
        })
        .await
    }

    /// The viewer's own posts, newest first; rank does not matter here.
    pub async fn paginate_mine_feed(
        &self,
        viewer: UserId,
        skip: u64,
        limit: usize,
    ) -> DbResult<(Vec<FeedPostRecord>, u64)> {
        self.read_with(|tx| {
            let posts_table = tx.open_table(&posts::TABLE)?;
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let posts_by_author_table = tx.open_table(&posts_by_author::TABLE)?;

            Self::paginate_partition_rev(
                &posts_by_author_table,
                (viewer, Timestamp::ZERO, PostId::ZERO)..=(viewer, Timestamp::MAX, PostId::MAX),
                skip,
                limit,
                |&(_, _, post_id)| {
                    Ok(Self::get_post_index_tx(post_id, &post_indexes_table)?
                        .is_some_and(|index| index.status == PostStatus::Normal))
                },
                |(_, _, post_id)| Self::get_feed_post_tx(post_id, &posts_table),
            )
        })
        .await
    }

    /// Comments under a post, newest first.
    ///
    /// TODO: friend-visible comments are hidden even from viewers who can
    /// see the parent post; widening this needs a product decision on
    /// comment-level permissions.
    pub async fn paginate_comments(
        &self,
        parent_id: PostId,
        skip: u64,
        limit: usize,
    ) -> DbResult<(Vec<FeedPostRecord>, u64)> {
        self.read_with(|tx| {
            let posts_table = tx.open_table(&posts::TABLE)?;
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let post_comments_table = tx.open_table(&post_comments::TABLE)?;

            Self::paginate_partition_rev(
                &post_comments_table,
                (parent_id, Timestamp::ZERO, PostId::ZERO)
                    ..=(parent_id, Timestamp::MAX, PostId::MAX),
                skip,
                limit,
                |&(_, _, post_id)| {
                    Ok(Self::get_post_index_tx(post_id, &post_indexes_table)?
                        .is_some_and(|index| {
                            index.status == PostStatus::Normal
                                && index.visibility == Visibility::Public
                        }))
                },
                |(_, _, post_id)| Self::get_feed_post_tx(post_id, &posts_table),
            )
        })
        .await
    }

    fn get_feed_post_tx(
        post_id: PostId,
        posts_table: &impl posts::ReadableTable,
    ) -> DbResult<Option<FeedPostRecord>> {
        let Some(post) = Self::get_post_tx(post_id, posts_table)? else {
            warn!(target: LOG_TARGET, %post_id, "Feed entry without a post row");
            return Ok(None);
        };
        Ok(Some(FeedPostRecord { post_id, post }))
    }
}
