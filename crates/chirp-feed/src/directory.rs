use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chirp_core::UserId;
use serde::Serialize;

/// The author fields a feed page displays.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar: None,
        }
    }

    /// What a page shows when an author's profile is missing. Pages render
    /// with a stand-in name, they do not fail over an upstream gap.
    pub fn placeholder(id: UserId) -> Self {
        Self::new(id, "unknown")
    }
}

/// Profile storage belongs to another service; feeds only ever ask it one
/// batched question per page.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Profiles for `ids`; unknown ids are simply absent from the map.
    async fn batch_get(&self, ids: &[UserId]) -> HashMap<UserId, UserProfile>;
}

/// In-memory directory for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl StaticDirectory {
    pub fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .expect("Locking failed")
            .insert(profile.id, profile);
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn batch_get(&self, ids: &[UserId]) -> HashMap<UserId, UserProfile> {
        let profiles = self.profiles.read().expect("Locking failed");
        ids.iter()
            .filter_map(|id| profiles.get(id).map(|p| (*id, p.clone())))
            .collect()
    }
}
