use std::collections::{HashMap, HashSet};

use chirp_core::{PostId, RankScore, UserId};
use snafu::OptionExt as _;
use tracing::{debug, warn};

use crate::{
    post_indexes, post_retweets, post_votes, posts_by_rank, Database, DbResult, OverflowSnafu,
    LOG_TARGET,
};

/// Which engagement action a toggle request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Vote,
    Retweet,
}

impl Database {
    /// Flip the (user, post) membership and keep the counter in step, all
    /// inside the caller's write transaction. The membership key is the
    /// whole fact and the writer is exclusive, so a pair can never be
    /// counted twice no matter how requests interleave.
    ///
    /// `None` when the post has no index row, i.e. the post does not exist.
    fn toggle_membership_tx<R>(
        uid: UserId,
        post_id: PostId,
        kind: ToggleKind,
        membership_table: &mut redb_bincode::Table<(UserId, PostId), R>,
        post_indexes_table: &mut post_indexes::Table,
    ) -> DbResult<Option<bool>>
    where
        R: bincode::Encode + bincode::Decode<()> + Default,
    {
        let Some(mut index) = Self::get_post_index_tx(post_id, post_indexes_table)? else {
            return Ok(None);
        };

        let present = membership_table.get(&(uid, post_id))?.is_some();

        let count = match kind {
            ToggleKind::Vote => &mut index.vote_count,
            ToggleKind::Retweet => &mut index.retweet_count,
        };

        if present {
            membership_table.remove(&(uid, post_id))?;
            debug_assert!(0 < *count, "toggle membership without a counter to match");
            *count = count.saturating_sub(1);
        } else {
            membership_table.insert(&(uid, post_id), &R::default())?;
            *count = count.checked_add(1).context(OverflowSnafu)?;
        }

        post_indexes_table.insert(&post_id, &index)?;

        debug!(target: LOG_TARGET, %uid, %post_id, ?kind, state = !present, "Toggle");

        Ok(Some(!present))
    }

    /// Returns the new membership state, or `None` for an unknown post.
    pub async fn toggle_vote(&self, uid: UserId, post_id: PostId) -> DbResult<Option<bool>> {
        self.write_with(|tx| {
            let mut post_votes_table = tx.open_table(&post_votes::TABLE)?;
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            Self::toggle_membership_tx(
                uid,
                post_id,
                ToggleKind::Vote,
                &mut post_votes_table,
                &mut post_indexes_table,
            )
        })
        .await
    }

    pub async fn toggle_retweet(&self, uid: UserId, post_id: PostId) -> DbResult<Option<bool>> {
        self.write_with(|tx| {
            let mut post_retweets_table = tx.open_table(&post_retweets::TABLE)?;
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            Self::toggle_membership_tx(
                uid,
                post_id,
                ToggleKind::Retweet,
                &mut post_retweets_table,
                &mut post_indexes_table,
            )
        })
        .await
    }

    /// Which of `post_ids` the user has voted on. One read transaction, one
    /// point lookup per id.
    pub async fn vote_set(&self, uid: UserId, post_ids: &[PostId]) -> DbResult<HashSet<PostId>> {
        self.read_with(|tx| {
            let post_votes_table = tx.open_table(&post_votes::TABLE)?;

            let mut ret = HashSet::new();
            for post_id in post_ids {
                if post_votes_table.get(&(uid, *post_id))?.is_some() {
                    ret.insert(*post_id);
                }
            }
            Ok(ret)
        })
        .await
    }

    pub async fn retweet_set(&self, uid: UserId, post_ids: &[PostId]) -> DbResult<HashSet<PostId>> {
        self.read_with(|tx| {
            let post_retweets_table = tx.open_table(&post_retweets::TABLE)?;

            let mut ret = HashSet::new();
            for post_id in post_ids {
                if post_retweets_table.get(&(uid, *post_id))?.is_some() {
                    ret.insert(*post_id);
                }
            }
            Ok(ret)
        })
        .await
    }

    /// Engagement-recording path: bump the read counter.
    pub async fn record_read(&self, post_id: PostId) -> DbResult<Option<()>> {
        self.write_with(|tx| {
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            let Some(mut index) = Self::get_post_index_tx(post_id, &post_indexes_table)? else {
                return Ok(None);
            };
            index.read_count = index.read_count.checked_add(1).context(OverflowSnafu)?;
            post_indexes_table.insert(&post_id, &index)?;

            Ok(Some(()))
        })
        .await
    }

    /// Rank-job write path: move the post to its new overall score, swapping
    /// its ranked-ordering key in the same transaction.
    pub async fn set_rank_score(
        &self,
        post_id: PostId,
        overall: RankScore,
    ) -> DbResult<Option<()>> {
        self.write_with(|tx| {
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            let mut posts_by_rank_table = tx.open_table(&posts_by_rank::TABLE)?;

            let Some(mut index) = Self::get_post_index_tx(post_id, &post_indexes_table)? else {
                return Ok(None);
            };

            posts_by_rank_table.remove(&(index.overall, index.created_at, post_id))?;
            posts_by_rank_table.insert(&(overall, index.created_at, post_id), &())?;

            index.overall = overall;
            post_indexes_table.insert(&post_id, &index)?;

            debug!(target: LOG_TARGET, %post_id, %overall, "Rank score updated");

            Ok(Some(()))
        })
        .await
    }

    /// Recompute vote/retweet counters from membership-set cardinality and
    /// repair any drift. Returns how many index rows needed fixing.
    ///
    /// The counters are mutated in the same transaction as their membership
    /// rows, so under normal operation this finds nothing; it exists for
    /// periodic repair and for tests to assert the books balance.
    pub async fn reconcile_counters(&self) -> DbResult<u64> {
        self.write_with(|tx| {
            let post_votes_table = tx.open_table(&post_votes::TABLE)?;
            let post_retweets_table = tx.open_table(&post_retweets::TABLE)?;
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;

            let mut votes: HashMap<PostId, u64> = HashMap::new();
            for entry in post_votes_table.range(..)? {
                let (k, _) = entry?;
                *votes.entry(k.value().1).or_default() += 1;
            }

            let mut retweets: HashMap<PostId, u64> = HashMap::new();
            for entry in post_retweets_table.range(..)? {
                let (k, _) = entry?;
                *retweets.entry(k.value().1).or_default() += 1;
            }

            let mut repairs = vec![];
            for entry in post_indexes_table.range(..)? {
                let (k, v) = entry?;
                let post_id = k.value();
                let mut index = v.value();

                let vote_count = votes.get(&post_id).copied().unwrap_or(0);
                let retweet_count = retweets.get(&post_id).copied().unwrap_or(0);

                if index.vote_count != vote_count || index.retweet_count != retweet_count {
                    warn!(
                        target: LOG_TARGET,
                        %post_id,
                        stored_votes = index.vote_count,
                        actual_votes = vote_count,
                        stored_retweets = index.retweet_count,
                        actual_retweets = retweet_count,
                        "Repairing drifted counters"
                    );
                    index.vote_count = vote_count;
                    index.retweet_count = retweet_count;
                    repairs.push((post_id, index));
                }
            }

            let repaired = repairs.len() as u64;
            for (post_id, index) in &repairs {
                post_indexes_table.insert(post_id, index)?;
            }

            Ok(repaired)
        })
        .await
    }
}
