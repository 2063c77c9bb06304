//! Channel profile repository.

use ytgen_models::ChannelProfile;

use crate::backend::Collection;
use crate::error::{StoreError, StoreResult};

/// Typed repository for channel profiles, keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct ProfileRepository {
    profiles: Collection<ChannelProfile>,
}

impl ProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the profile for a user, if one exists.
    pub async fn get(&self, user_id: &str) -> Option<ChannelProfile> {
        self.profiles.get(user_id).await
    }

    /// Get the profile, erroring when absent.
    pub async fn require(&self, user_id: &str) -> StoreResult<ChannelProfile> {
        self.get(user_id)
            .await
            .ok_or_else(|| StoreError::not_found(format!("profile for user {user_id}")))
    }

    /// Create or replace the profile for a user.
    pub async fn upsert(&self, profile: ChannelProfile) -> StoreResult<()> {
        self.profiles
            .insert(profile.user_id.clone(), profile)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = ProfileRepository::new();
        assert!(repo.get("alice").await.is_none());

        let mut profile = ChannelProfile::new("alice", "Alice Codes", "tutorials", "rust");
        repo.upsert(profile.clone()).await.unwrap();
        assert_eq!(repo.get("alice").await.unwrap().channel_name, "Alice Codes");

        profile.tone = Some("casual".to_string());
        repo.upsert(profile).await.unwrap();
        assert_eq!(repo.get("alice").await.unwrap().tone.as_deref(), Some("casual"));
    }
}
