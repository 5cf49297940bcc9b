use std::sync::Arc;

use chirp_core::page::PageRequest;
use chirp_core::post::{CommentLevel, PostDraft, RetweetKind, RetweetLink, Visibility};
use chirp_core::{PostId, Timestamp, UserId};
use chirp_db::{post_indexes, Database, FriendStatus};
use chirp_feed::{FeedError, FeedService, StaticDirectory, UserProfile};
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync + 'static>>;

async fn service() -> TestResult<(TempDir, FeedService<StaticDirectory>)> {
    let dir = tempfile::tempdir()?;
    let db = Database::open(dir.path().join("db.redb")).await?;
    let svc = FeedService::new(Arc::new(db), StaticDirectory::default());

    Ok((dir, svc))
}

fn ts(n: u64) -> Timestamp {
    Timestamp::from(n)
}

fn page() -> PageRequest {
    PageRequest::new(1, 20)
}

async fn befriend(svc: &FeedService<StaticDirectory>, a: UserId, b: UserId) -> TestResult {
    svc.db().set_friend_edge(a, b, FriendStatus::Normal, ts(1)).await?;
    svc.db().set_friend_edge(b, a, FriendStatus::Normal, ts(1)).await?;
    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn displayed_counts_exclude_the_viewer() -> TestResult {
    let (_dir, svc) = service().await?;
    let viewer = UserId::random();
    let author = UserId::random();

    let post_id = svc
        .publish(author, PostDraft::builder().content("hello").build())
        .await?;

    // Someone else voted before the viewer.
    assert!(svc.toggle_vote(UserId::random(), post_id).await?);
    assert!(svc.toggle_vote(viewer, post_id).await?);

    let resp = svc.ranked_feed(viewer, page()).await?;
    let item = &resp.items[0];
    assert!(item.vote_flag);
    assert_eq!(item.vote_count, 1); // two stored, minus the viewer's own

    // The author never voted: full count, no flag.
    let resp = svc.ranked_feed(author, page()).await?;
    let item = &resp.items[0];
    assert!(!item.vote_flag);
    assert_eq!(item.vote_count, 2);

    // Untoggling brings the viewer back in line with everyone else.
    assert!(!svc.toggle_vote(viewer, post_id).await?);
    let resp = svc.ranked_feed(viewer, page()).await?;
    let item = &resp.items[0];
    assert!(!item.vote_flag);
    assert_eq!(item.vote_count, 1);

    // Toggling the never-published is NotFound.
    assert!(matches!(
        svc.toggle_vote(viewer, PostId::random()).await,
        Err(FeedError::NotFound { .. })
    ));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn hydration_tolerates_missing_related_rows() -> TestResult {
    let (_dir, svc) = service().await?;
    let viewer = UserId::random();
    let known = UserId::random();
    let ghost = UserId::random();

    svc.users().insert(UserProfile::new(known, "known"));

    let known_post = svc
        .publish(known, PostDraft::builder().content("known author").build())
        .await?;
    let ghost_post = svc
        .publish(ghost, PostDraft::builder().content("ghost author").build())
        .await?;

    let resp = svc.ranked_feed(viewer, page()).await?;
    assert_eq!(resp.items.len(), 2);

    let by_id = |id: PostId| {
        resp.items
            .iter()
            .find(|i| i.post_id == id)
            .expect("Item present")
    };
    assert_eq!(by_id(known_post).author_name, "known");
    assert_eq!(by_id(ghost_post).author_name, "unknown");

    // Losing the index row degrades a direct fetch to zero counters, it
    // does not fail it.
    svc.toggle_vote(viewer, known_post).await?;
    svc.db()
        .write_with(|tx| {
            let mut post_indexes_table = tx.open_table(&post_indexes::TABLE)?;
            post_indexes_table.remove(&known_post)?;
            Ok(())
        })
        .await?;

    let item = svc
        .post_item(viewer, known_post)
        .await?
        .expect("Still renderable");
    assert_eq!(item.vote_count, 0);
    assert!(item.vote_flag);
    assert_eq!(item.comment_count, 0);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn comment_gate() -> TestResult {
    let (_dir, svc) = service().await?;
    let author = UserId::random();
    let friend = UserId::random();
    let stranger = UserId::random();

    befriend(&svc, author, friend).await?;

    let sealed = svc
        .publish(
            author,
            PostDraft::builder()
                .content("no comments")
                .comment_level(CommentLevel::Nobody)
                .build(),
        )
        .await?;
    let friends_only = svc
        .publish(
            author,
            PostDraft::builder()
                .content("friends may speak")
                .comment_level(CommentLevel::Friends)
                .build(),
        )
        .await?;

    assert!(matches!(
        svc.check_comment_permission(friend, sealed).await,
        Err(FeedError::PermissionDenied { .. })
    ));

    assert!(svc.check_comment_permission(author, friends_only).await.is_ok());
    assert!(svc.check_comment_permission(friend, friends_only).await.is_ok());
    assert!(matches!(
        svc.check_comment_permission(stranger, friends_only).await,
        Err(FeedError::PermissionDenied { .. })
    ));

    assert!(matches!(
        svc.check_comment_permission(friend, PostId::random()).await,
        Err(FeedError::NotFound { .. })
    ));

    // The gate also guards publishing a comment draft.
    let comment = |parent| {
        PostDraft::builder()
            .content("me too")
            .retweet(RetweetLink {
                post_id: parent,
                kind: RetweetKind::Comment,
            })
            .build()
    };
    assert!(matches!(
        svc.publish(stranger, comment(friends_only)).await,
        Err(FeedError::PermissionDenied { .. })
    ));
    let comment_id = svc.publish(friend, comment(friends_only)).await?;

    let resp = svc.comments_of(stranger, friends_only, page()).await?;
    assert_eq!(resp.total, 1);
    assert_eq!(resp.items[0].post_id, comment_id);

    let parent_item = svc
        .post_item(stranger, friends_only)
        .await?
        .expect("Present");
    assert_eq!(parent_item.comment_count, 1);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn feeds_reject_malformed_pages() -> TestResult {
    let (_dir, svc) = service().await?;
    let viewer = UserId::random();

    for bad in [
        PageRequest::new(0, 10),
        PageRequest::new(1, 0),
        PageRequest::new(1, PageRequest::MAX_LIMIT + 1),
    ] {
        assert!(matches!(
            svc.ranked_feed(viewer, bad).await,
            Err(FeedError::InvalidArgument { .. })
        ));
        assert!(matches!(
            svc.mine_feed(viewer, bad).await,
            Err(FeedError::InvalidArgument { .. })
        ));
    }

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn only_the_author_deletes() -> TestResult {
    let (_dir, svc) = service().await?;
    let author = UserId::random();
    let other = UserId::random();

    let post_id = svc
        .publish(author, PostDraft::builder().content("mine to keep").build())
        .await?;

    assert!(matches!(
        svc.delete_post(other, post_id).await,
        Err(FeedError::PermissionDenied { .. })
    ));

    svc.delete_post(author, post_id).await?;
    let resp = svc.ranked_feed(other, page()).await?;
    assert_eq!(resp.total, 0);
    assert!(svc.post_item(other, post_id).await?.is_none());

    assert!(matches!(
        svc.delete_post(author, PostId::random()).await,
        Err(FeedError::NotFound { .. })
    ));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn feeds_flow_end_to_end() -> TestResult {
    let (_dir, svc) = service().await?;
    let a = UserId::random();
    let b = UserId::random();
    let c = UserId::random();

    befriend(&svc, a, b).await?;

    svc.publish(a, PostDraft::builder().content("a public").build())
        .await?;
    svc.publish(
        b,
        PostDraft::builder()
            .content("b for friends")
            .visibility(Visibility::Friends)
            .build(),
    )
    .await?;
    svc.publish(c, PostDraft::builder().content("c public").build())
        .await?;

    let resp = svc.friend_feed(a, page()).await?;
    assert_eq!(resp.total, 1);
    assert_eq!(resp.items[0].content, "b for friends");

    let resp = svc.mine_feed(a, page()).await?;
    assert_eq!(resp.total, 1);
    assert_eq!(resp.items[0].content, "a public");

    let resp = svc.ranked_feed(c, page()).await?;
    assert_eq!(resp.total, 2); // both public posts, not the friends-only one

    // Blocking rewrites what ranked feeds show in both directions.
    svc.block_user(c, a).await?;
    let resp = svc.ranked_feed(c, page()).await?;
    assert_eq!(resp.total, 1);
    let resp = svc.ranked_feed(a, page()).await?;
    assert!(resp.items.iter().all(|i| i.content != "c public"));

    assert_eq!(svc.blocked_users(c).await?.len(), 1);
    svc.unblock_user(c, a).await?;
    assert!(svc.blocked_users(c).await?.is_empty());
    let resp = svc.ranked_feed(c, page()).await?;
    assert_eq!(resp.total, 2);

    Ok(())
}
