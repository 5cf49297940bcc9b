pub mod id;
pub mod page;
pub mod post;

pub use id::{PostId, UserId};

/// Define a fixed-size, array-backed opaque identifier type.
///
/// Identifiers for different entity kinds get distinct types, so passing
/// a [`id::UserId`] where a [`id::PostId`] is expected does not compile.
#[macro_export]
macro_rules! define_array_type {
    (
        $(#[$outer:meta])*
        struct $t:tt, $n:literal
    ) => {
        $(#[$outer])*
        #[derive(::bincode::Encode, ::bincode::Decode)]
        #[derive(::serde::Serialize, ::serde::Deserialize)]
        #[derive(Copy, Clone, Hash, Debug, PartialOrd, Ord, PartialEq, Eq)]
        pub struct $t([u8; $n]);

        impl $t {
            pub const ZERO: Self = Self([0; $n]);
            pub const MAX: Self = Self([0xff; $n]);

            pub fn as_slice(&self) -> &[u8] {
                self.0.as_slice()
            }

            pub fn random() -> Self {
                use ::rand::Rng as _;
                Self(::rand::rng().random())
            }
        }

        impl From<[u8; $n]> for $t {
            fn from(bytes: [u8; $n]) -> Self {
                Self(bytes)
            }
        }
    };
}

#[macro_export]
macro_rules! impl_base32_str {
    (
        $t:tt
    ) => {
        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                data_encoding::BASE32_NOPAD.encode_write(self.as_slice(), f)
            }
        }

        impl std::str::FromStr for $t {
            type Err = data_encoding::DecodeError;

            fn from_str(s: &str) -> Result<$t, Self::Err> {
                let v = data_encoding::BASE32_NOPAD.decode(s.as_bytes())?;
                let a = v.try_into().map_err(|_| data_encoding::DecodeError {
                    position: 0,
                    kind: data_encoding::DecodeKind::Length,
                })?;
                Ok(Self(a))
            }
        }
    };
}

/// Milliseconds since the unix epoch.
#[derive(::bincode::Encode, ::bincode::Decode)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn now() -> Self {
        Self(
            u64::try_from(
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .expect("Time went backwards")
                    .as_millis(),
            )
            .expect("Doesn't fit u64"),
        )
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Overall rank of a post, assigned by the scoring job.
///
/// Higher sorts earlier in ranked feeds. Engagement counters feed into it,
/// but the score itself is only ever written through
/// the dedicated rank update path, never by feed reads.
#[derive(::bincode::Encode, ::bincode::Decode)]
#[derive(::serde::Serialize, ::serde::Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RankScore(u64);

impl RankScore {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);
}

impl From<u64> for RankScore {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RankScore> for u64 {
    fn from(value: RankScore) -> Self {
        value.0
    }
}

impl std::fmt::Display for RankScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
