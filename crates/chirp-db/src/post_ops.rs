use std::collections::HashMap;

use chirp_core::post::{PostDraft, PostStatus, RetweetKind, RetweetLink};
use chirp_core::{PostId, RankScore, Timestamp, UserId};
use rand::Rng as _;
use snafu::OptionExt as _;
use tracing::{debug, info, warn};

use crate::{
    post_comments, post_indexes, posts, posts_by_author, posts_by_rank, Database, DbResult,
    OverflowSnafu, PostIndexRecord, PostRecord, LOG_TARGET,
};

impl Database {
    const RANDOM_SORT_SPAN: u32 = 1_000_000;

    /// Publish a post: the content row, its index row and every ordering
    /// entry land in one transaction, so no reader ever sees a post without
    /// its counters.
    pub async fn create_post(
        &self,
        author: UserId,
        draft: PostDraft,
        created_at: Timestamp,
    ) -> DbResult<PostId> {
        let post_id = PostId::random();
        let random_sort = rand::rng().random_range(0..Self::RANDOM_SORT_SPAN);

        let record = PostRecord {
            author,
            content: draft.content,
            medias: draft.medias,
            location: draft.location,
            visibility: draft.visibility,
            comment_level: draft.comment_level,
            retweet: draft.retweet,
            status: PostStatus::Normal,
            created_at,
        };

        self.write_with(|tx| {
            let mut posts_table = tx.open_table(&posts::TABLE)?;
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let mut posts_by_rank_table = tx.open_table(&posts_by_rank::TABLE)?;
            let mut posts_by_author_table = tx.open_table(&posts_by_author::TABLE)?;
            let mut post_comments_table = tx.open_table(&post_comments::TABLE)?;

            let index = PostIndexRecord::fresh(&record, random_sort);

            posts_table.insert(&post_id, &record)?;
            post_indexes_table.insert(&post_id, &index)?;
            posts_by_rank_table.insert(&(index.overall, created_at, post_id), &())?;
            posts_by_author_table.insert(&(author, created_at, post_id), &())?;

            if let Some(RetweetLink {
                post_id: parent_id,
                kind: RetweetKind::Comment,
            }) = record.retweet
            {
                post_comments_table.insert(&(parent_id, created_at, post_id), &())?;

                let parent_index = post_indexes_table.get(&parent_id)?.map(|g| g.value());
                if let Some(mut parent) = parent_index {
                    parent.comment_count =
                        parent.comment_count.checked_add(1).context(OverflowSnafu)?;
                    post_indexes_table.insert(&parent_id, &parent)?;
                } else {
                    warn!(target: LOG_TARGET, %parent_id, "Comment on a post without an index row");
                }
            }

            debug!(target: LOG_TARGET, %post_id, %author, "New post");

            Ok(post_id)
        })
        .await
    }

    /// Flip the post out of every feed while keeping it addressable by id.
    ///
    /// Idempotent; `None` when no such post was ever created.
    pub async fn soft_delete_post(&self, post_id: PostId) -> DbResult<Option<()>> {
        self.write_with(|tx| {
            let mut posts_table = tx.open_table(&posts::TABLE)?;
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let mut posts_by_rank_table = tx.open_table(&posts_by_rank::TABLE)?;
            let mut posts_by_author_table = tx.open_table(&posts_by_author::TABLE)?;
            let mut post_comments_table = tx.open_table(&post_comments::TABLE)?;

            let Some(mut post) = posts_table.get(&post_id)?.map(|g| g.value()) else {
                return Ok(None);
            };
            if post.status == PostStatus::Deleted {
                return Ok(Some(()));
            }

            let index = post_indexes_table.get(&post_id)?.map(|g| g.value());
            let overall = index.as_ref().map(|i| i.overall).unwrap_or(RankScore::ZERO);

            posts_by_rank_table.remove(&(overall, post.created_at, post_id))?;
            posts_by_author_table.remove(&(post.author, post.created_at, post_id))?;

            if let Some(RetweetLink {
                post_id: parent_id,
                kind: RetweetKind::Comment,
            }) = post.retweet
            {
                post_comments_table.remove(&(parent_id, post.created_at, post_id))?;

                let parent_index = post_indexes_table.get(&parent_id)?.map(|g| g.value());
                if let Some(mut parent) = parent_index {
                    debug_assert!(0 < parent.comment_count, "comment_count underflow");
                    parent.comment_count = parent.comment_count.saturating_sub(1);
                    post_indexes_table.insert(&parent_id, &parent)?;
                }
            }

            match index {
                Some(mut index) => {
                    index.status = PostStatus::Deleted;
                    post_indexes_table.insert(&post_id, &index)?;
                }
                None => {
                    warn!(target: LOG_TARGET, %post_id, "Deleting a post without an index row");
                }
            }

            post.status = PostStatus::Deleted;
            posts_table.insert(&post_id, &post)?;

            info!(target: LOG_TARGET, %post_id, "Post soft-deleted");

            Ok(Some(()))
        })
        .await
    }

    pub fn get_post_tx(
        post_id: PostId,
        posts_table: &impl posts::ReadableTable,
    ) -> DbResult<Option<PostRecord>> {
        Ok(posts_table.get(&post_id)?.map(|g| g.value()))
    }

    pub fn get_post_index_tx(
        post_id: PostId,
        post_indexes_table: &impl post_indexes::ReadableTable,
    ) -> DbResult<Option<PostIndexRecord>> {
        Ok(post_indexes_table.get(&post_id)?.map(|g| g.value()))
    }

    pub async fn get_post(&self, post_id: PostId) -> DbResult<Option<PostRecord>> {
        self.read_with(|tx| {
            let posts_table = tx.open_table(&posts::TABLE)?;

            Self::get_post_tx(post_id, &posts_table)
        })
        .await
    }

    pub async fn get_post_index(&self, post_id: PostId) -> DbResult<Option<PostIndexRecord>> {
        self.read_with(|tx| {
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            Self::get_post_index_tx(post_id, &post_indexes_table)
        })
        .await
    }

    /// One multi-key lookup for a page worth of index rows; absent ids are
    /// simply absent from the map, the caller decides how to default them.
    pub async fn get_post_indexes(
        &self,
        post_ids: &[PostId],
    ) -> DbResult<HashMap<PostId, PostIndexRecord>> {
        self.read_with(|tx| {
            let post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            let mut ret = HashMap::new();
            for post_id in post_ids {
                if let Some(index) = Self::get_post_index_tx(*post_id, &post_indexes_table)? {
                    ret.insert(*post_id, index);
                }
            }
            Ok(ret)
        })
        .await
    }
}
