mod engagement_ops;
pub mod feed;
mod graph_ops;
mod paginate;
mod post_ops;
mod tables;

use std::path::PathBuf;

use redb_bincode::{ReadTransaction, WriteTransaction};
use snafu::{Location, ResultExt as _, Snafu};
use tokio::task::JoinError;
use tracing::{debug, info, instrument};

pub use self::feed::FeedPostRecord;
pub use self::tables::*;

const LOG_TARGET: &str = "chirp::db";

#[derive(Debug, Snafu)]
pub enum DbError {
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
    DbVersionTooHigh {
        db_ver: u64,
        code_ver: u64,
        #[snafu(implicit)]
        location: Location,
    },
    Join {
        source: JoinError,
        #[snafu(implicit)]
        location: Location,
    },
    Overflow,
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Failures worth one internal retry: the transaction machinery ran into
    /// contention or a commit hiccup, not a logic error. A clean re-read of
    /// current state is the correct response.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Transaction { .. } | DbError::Commit { .. })
    }
}

#[derive(Debug)]
pub struct Database {
    inner: redb_bincode::Database,
}

impl Database {
    #[instrument(skip_all)]
    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Database> {
        let path = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening database");
        let inner = tokio::task::spawn_blocking(move || redb_bincode::Database::create(path))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;

        Self::write_with_inner(&inner, |tx| {
            Self::init_tables_tx(tx)?;
            Self::handle_db_ver_migrations(tx)?;
            Ok(())
        })
        .await?;

        Ok(Self { inner })
    }

    pub async fn write_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ WriteTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = inner.begin_write().context(TransactionSnafu)?;
            let res = f(&dbtx)?;

            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        Self::write_with_inner(&self.inner, f).await
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = self.inner.begin_read().context(TransactionSnafu)?;

            f(&dbtx)
        })
    }

    pub(crate) fn init_tables_tx(tx: &WriteTransaction) -> DbResult<()> {
        tx.open_table(&db_version::TABLE)?;

        tx.open_table(&posts::TABLE)?;
        tx.open_table(&post_indexes::TABLE)?;
        tx.open_table(&posts_by_rank::TABLE)?;
        tx.open_table(&posts_by_author::TABLE)?;
        tx.open_table(&post_comments::TABLE)?;

        tx.open_table(&post_votes::TABLE)?;
        tx.open_table(&post_retweets::TABLE)?;

        tx.open_table(&friend_edges::TABLE)?;
        tx.open_table(&blocks::TABLE)?;
        Ok(())
    }

    pub(crate) fn handle_db_ver_migrations(tx: &WriteTransaction) -> DbResult<()> {
        const DB_VER: u64 = 0;

        let mut table_db_ver = tx.open_table(&db_version::TABLE)?;

        let Some(cur_db_ver) = table_db_ver.get(&())?.map(|g| g.value()) else {
            info!(target: LOG_TARGET, "Initializing new database");
            table_db_ver.insert(&(), &DB_VER)?;

            return Ok(());
        };

        if DB_VER < cur_db_ver {
            return DbVersionTooHighSnafu {
                db_ver: cur_db_ver,
                code_ver: DB_VER,
            }
            .fail();
        }

        debug!(target: LOG_TARGET, db_ver = cur_db_ver, "Db version");

        Ok(())
    }
}
