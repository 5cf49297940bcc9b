mod assemble;
mod directory;
mod error;

use std::sync::Arc;

use backon::Retryable as _;
use chirp_core::page::{PageRequest, PageResponse};
use chirp_core::post::{CommentLevel, PostDraft, RetweetKind, RetweetLink};
use chirp_core::{PostId, Timestamp, UserId};
use chirp_db::{Database, DbError, FeedPostRecord};
use snafu::OptionExt as _;
use tracing::debug;

pub use crate::assemble::FeedItem;
pub use crate::directory::{StaticDirectory, UserDirectory, UserProfile};
use crate::error::{InvalidArgumentSnafu, NotFoundSnafu, PermissionDeniedSnafu};
pub use crate::error::{FeedError, FeedResult};

const LOG_TARGET: &str = "chirp::feed";

/// The feed core as callers see it: queries, toggles and the comment gate,
/// composed from the database and the external profile directory.
///
/// One instance serves all viewers; every request re-reads current state,
/// nothing is cached in-process. Pages offer no cross-request consistency:
/// a concurrent toggle may shift a post between two windows of the same
/// listing, which is fine for a ranked social feed.
pub struct FeedService<D> {
    db: Arc<Database>,
    users: D,
}

impl<D> FeedService<D>
where
    D: UserDirectory,
{
    pub fn new(db: Arc<Database>, users: D) -> Self {
        Self { db, users }
    }

    /// Direct access to storage, for embedders that also run the graph and
    /// engagement write paths.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn users(&self) -> &D {
        &self.users
    }

    pub async fn ranked_feed(
        &self,
        viewer: UserId,
        page: PageRequest,
    ) -> FeedResult<PageResponse<FeedItem>> {
        check_page(&page)?;
        let (posts, total) = self
            .db
            .paginate_ranked_feed(viewer, page.skip(), page.limit as usize)
            .await?;
        let items = self.assemble(viewer, posts).await?;
        Ok(PageResponse::new(page, items, total))
    }

    pub async fn friend_feed(
        &self,
        viewer: UserId,
        page: PageRequest,
    ) -> FeedResult<PageResponse<FeedItem>> {
        check_page(&page)?;
        let (posts, total) = self
            .db
            .paginate_friend_feed(viewer, page.skip(), page.limit as usize)
            .await?;
        let items = self.assemble(viewer, posts).await?;
        Ok(PageResponse::new(page, items, total))
    }

    pub async fn mine_feed(
        &self,
        viewer: UserId,
        page: PageRequest,
    ) -> FeedResult<PageResponse<FeedItem>> {
        check_page(&page)?;
        let (posts, total) = self
            .db
            .paginate_mine_feed(viewer, page.skip(), page.limit as usize)
            .await?;
        let items = self.assemble(viewer, posts).await?;
        Ok(PageResponse::new(page, items, total))
    }

    pub async fn comments_of(
        &self,
        viewer: UserId,
        post_id: PostId,
        page: PageRequest,
    ) -> FeedResult<PageResponse<FeedItem>> {
        check_page(&page)?;
        let (posts, total) = self
            .db
            .paginate_comments(post_id, page.skip(), page.limit as usize)
            .await?;
        let items = self.assemble(viewer, posts).await?;
        Ok(PageResponse::new(page, items, total))
    }

    /// A single post hydrated for display, e.g. the head of a comment
    /// thread. `None` when unknown or deleted.
    pub async fn post_item(
        &self,
        viewer: UserId,
        post_id: PostId,
    ) -> FeedResult<Option<FeedItem>> {
        let Some(post) = self.db.get_post(post_id).await? else {
            return Ok(None);
        };
        let items = self
            .assemble(viewer, vec![FeedPostRecord { post_id, post }])
            .await?;
        Ok(items.into_iter().next())
    }

    /// Flip the viewer's vote; returns the state it ended up in.
    pub async fn toggle_vote(&self, viewer: UserId, post_id: PostId) -> FeedResult<bool> {
        (|| async { self.db.toggle_vote(viewer, post_id).await })
            .retry(backon::ConstantBuilder::default().with_max_times(1))
            .when(DbError::is_transient)
            .notify(
                |err: &DbError, _| debug!(target: LOG_TARGET, %err, "Retrying vote toggle"),
            )
            .await?
            .context(NotFoundSnafu { post_id })
    }

    pub async fn toggle_retweet(&self, viewer: UserId, post_id: PostId) -> FeedResult<bool> {
        (|| async { self.db.toggle_retweet(viewer, post_id).await })
            .retry(backon::ConstantBuilder::default().with_max_times(1))
            .when(DbError::is_transient)
            .notify(
                |err: &DbError, _| debug!(target: LOG_TARGET, %err, "Retrying retweet toggle"),
            )
            .await?
            .context(NotFoundSnafu { post_id })
    }

    /// The comment gate: may `viewer` comment under this post?
    pub async fn check_comment_permission(
        &self,
        viewer: UserId,
        post_id: PostId,
    ) -> FeedResult<()> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .context(NotFoundSnafu { post_id })?;

        match post.comment_level {
            CommentLevel::Everybody => Ok(()),
            CommentLevel::Nobody => PermissionDeniedSnafu {
                reason: "comments are disabled on this post",
            }
            .fail(),
            CommentLevel::Friends => {
                if viewer == post.author || self.db.is_mutual_friend(viewer, post.author).await? {
                    Ok(())
                } else {
                    PermissionDeniedSnafu {
                        reason: "only the author's friends may comment",
                    }
                    .fail()
                }
            }
        }
    }

    /// Publish a post. Comment drafts pass the comment gate of their parent
    /// first.
    pub async fn publish(&self, author: UserId, draft: PostDraft) -> FeedResult<PostId> {
        if let Some(RetweetLink {
            post_id: parent_id,
            kind: RetweetKind::Comment,
        }) = draft.retweet
        {
            self.check_comment_permission(author, parent_id).await?;
        }

        Ok(self.db.create_post(author, draft, Timestamp::now()).await?)
    }

    pub async fn delete_post(&self, viewer: UserId, post_id: PostId) -> FeedResult<()> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .context(NotFoundSnafu { post_id })?;

        if post.author != viewer {
            return PermissionDeniedSnafu {
                reason: "only the author may delete a post",
            }
            .fail();
        }

        self.db.soft_delete_post(post_id).await?;
        Ok(())
    }

    pub async fn block_user(&self, viewer: UserId, other: UserId) -> FeedResult<()> {
        self.db.add_block(viewer, other, Timestamp::now()).await?;
        Ok(())
    }

    pub async fn unblock_user(&self, viewer: UserId, other: UserId) -> FeedResult<()> {
        self.db.remove_block(viewer, other).await?;
        Ok(())
    }

    pub async fn blocked_users(&self, viewer: UserId) -> FeedResult<Vec<(UserId, Timestamp)>> {
        Ok(self.db.list_blocked(viewer).await?)
    }
}

fn check_page(page: &PageRequest) -> FeedResult<()> {
    if !page.is_valid() {
        return InvalidArgumentSnafu {
            reason: "page is 1-based and limit must be between 1 and the page cap",
        }
        .fail();
    }
    Ok(())
}
