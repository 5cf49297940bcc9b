use crate::{define_array_type, impl_base32_str};

define_array_type!(
    /// Identity of an account, as handed to us by the session layer.
    ///
    /// Opaque: this crate never derives anything from the bytes, it only
    /// compares and orders them. Credentials live elsewhere.
    struct UserId, 16
);
impl_base32_str!(UserId);

define_array_type!(
    /// Identity of a single post.
    ///
    /// Assigned once at publish time and never reused; a soft-deleted post
    /// keeps its id so already-rendered references stay resolvable.
    struct PostId, 16
);
impl_base32_str!(PostId);

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn id_str_roundtrip() {
        let id = UserId::random();
        assert_eq!(UserId::from_str(&id.to_string()).expect("Valid"), id);

        assert!(PostId::from_str("not-base32!").is_err());
    }

    #[test]
    fn id_range_bounds() {
        let id = PostId::random();
        assert!(PostId::ZERO <= id);
        assert!(id <= PostId::MAX);
    }
}
