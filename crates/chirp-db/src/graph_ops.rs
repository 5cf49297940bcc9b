use std::collections::BTreeSet;

use chirp_core::{Timestamp, UserId};
use tracing::debug;

use crate::{
    blocks, friend_edges, BlockRecord, Database, DbResult, FriendEdgeRecord, FriendStatus,
    LOG_TARGET,
};

impl Database {
    /// Everyone `uid` is mutually friended with: both directed edges
    /// `Normal`, and no block in either direction spoiling the pair.
    ///
    /// Resolved fresh on every call; feed queries run it once per request
    /// inside their own read transaction.
    pub fn mutual_friend_ids_tx(
        uid: UserId,
        friend_edges_table: &impl friend_edges::ReadableTable,
        blocks_table: &impl blocks::ReadableTable,
    ) -> DbResult<BTreeSet<UserId>> {
        let mut friends = BTreeSet::new();

        for entry in friend_edges_table.range((uid, UserId::ZERO)..=(uid, UserId::MAX))? {
            let (k, v) = entry?;
            let (_, other) = k.value();

            if v.value().status != FriendStatus::Normal {
                continue;
            }
            let Some(back) = friend_edges_table.get(&(other, uid))?.map(|g| g.value()) else {
                continue;
            };
            if back.status != FriendStatus::Normal {
                continue;
            }
            if Self::is_blocked_either_tx(uid, other, blocks_table)? {
                continue;
            }

            friends.insert(other);
        }

        Ok(friends)
    }

    /// Single-pair variant backing the comment gate.
    pub fn is_mutual_friend_tx(
        a: UserId,
        b: UserId,
        friend_edges_table: &impl friend_edges::ReadableTable,
    ) -> DbResult<bool> {
        for key in [(a, b), (b, a)] {
            match friend_edges_table.get(&key)?.map(|g| g.value()) {
                Some(edge) if edge.status == FriendStatus::Normal => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    pub fn is_blocked_either_tx(
        a: UserId,
        b: UserId,
        blocks_table: &impl blocks::ReadableTable,
    ) -> DbResult<bool> {
        Ok(blocks_table.get(&(a, b))?.is_some() || blocks_table.get(&(b, a))?.is_some())
    }

    pub async fn mutual_friend_ids(&self, uid: UserId) -> DbResult<BTreeSet<UserId>> {
        self.read_with(|tx| {
            let friend_edges_table = tx.open_table(&friend_edges::TABLE)?;
            let blocks_table = tx.open_table(&blocks::TABLE)?;

            Self::mutual_friend_ids_tx(uid, &friend_edges_table, &blocks_table)
        })
        .await
    }

    pub async fn is_mutual_friend(&self, a: UserId, b: UserId) -> DbResult<bool> {
        self.read_with(|tx| {
            let friend_edges_table = tx.open_table(&friend_edges::TABLE)?;

            Self::is_mutual_friend_tx(a, b, &friend_edges_table)
        })
        .await
    }

    pub async fn set_friend_edge(
        &self,
        uid: UserId,
        other: UserId,
        status: FriendStatus,
        ts: Timestamp,
    ) -> DbResult<()> {
        self.write_with(|tx| {
            let mut friend_edges_table = tx.open_table(&friend_edges::TABLE)?;

            friend_edges_table.insert(&(uid, other), &FriendEdgeRecord { status, ts })?;
            debug!(target: LOG_TARGET, %uid, %other, ?status, "Friend edge update");
            Ok(())
        })
        .await
    }

    pub async fn remove_friend_edge(&self, uid: UserId, other: UserId) -> DbResult<()> {
        self.write_with(|tx| {
            let mut friend_edges_table = tx.open_table(&friend_edges::TABLE)?;

            friend_edges_table.remove(&(uid, other))?;
            debug!(target: LOG_TARGET, %uid, %other, "Friend edge removed");
            Ok(())
        })
        .await
    }

    /// Returns whether a new block was recorded. Blocking yourself or
    /// re-blocking is a no-op.
    pub async fn add_block(&self, uid: UserId, other: UserId, ts: Timestamp) -> DbResult<bool> {
        if uid == other {
            return Ok(false);
        }
        self.write_with(|tx| {
            let mut blocks_table = tx.open_table(&blocks::TABLE)?;

            if blocks_table.get(&(uid, other))?.is_some() {
                return Ok(false);
            }
            blocks_table.insert(&(uid, other), &BlockRecord { ts })?;
            debug!(target: LOG_TARGET, %uid, %other, "Block added");
            Ok(true)
        })
        .await
    }

    pub async fn remove_block(&self, uid: UserId, other: UserId) -> DbResult<()> {
        self.write_with(|tx| {
            let mut blocks_table = tx.open_table(&blocks::TABLE)?;

            blocks_table.remove(&(uid, other))?;
            Ok(())
        })
        .await
    }

    pub async fn list_blocked(&self, uid: UserId) -> DbResult<Vec<(UserId, Timestamp)>> {
        self.read_with(|tx| {
            let blocks_table = tx.open_table(&blocks::TABLE)?;

            Ok(blocks_table
                .range((uid, UserId::ZERO)..=(uid, UserId::MAX))?
                .map(|res| res.map(|(k, v)| (k.value().1, v.value().ts)))
                .collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}
