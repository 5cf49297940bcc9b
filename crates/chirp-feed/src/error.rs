use chirp_core::PostId;
use chirp_db::DbError;
use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FeedError {
    #[snafu(display("post {post_id} not found"))]
    NotFound {
        post_id: PostId,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("permission denied: {reason}"))]
    PermissionDenied { reason: &'static str },
    #[snafu(display("invalid argument: {reason}"))]
    InvalidArgument { reason: &'static str },
    #[snafu(transparent)]
    Database {
        source: DbError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
