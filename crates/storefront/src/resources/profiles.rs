//! Customer profile of the signed-in user.

use tracing::instrument;

use super::DataContext;
use crate::cache::{CacheKey, Invalidation};
use crate::error::StorefrontError;
use crate::models::{Profile, ProfileUpdate};

/// Profile accessor and upsert.
#[derive(Clone)]
pub struct ProfilesResource {
    ctx: DataContext,
}

impl ProfilesResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    /// The signed-in user's profile. `None` for guests and for users who
    /// never saved one.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Option<Profile>, StorefrontError> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(None);
        };
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Profile(user), store.get_profile(user))
            .await?)
    }

    /// Create or update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest, or the
    /// remote error.
    #[instrument(skip(self, update))]
    pub async fn save(&self, update: ProfileUpdate) -> Result<Profile, StorefrontError> {
        let user = self.ctx.require_user()?;
        let row = update.into_row(user);
        let invalidations = [
            Invalidation::Key(CacheKey::Profile(user)),
            Invalidation::Key(CacheKey::Users),
        ];
        Ok(self
            .ctx
            .cache()
            .mutate(&invalidations, self.ctx.store().upsert_profile(&row))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use secrecy::SecretString;
    use voltline_core::UserId;

    use super::*;
    use crate::auth::{AuthUser, Session, SessionSlot, UserMetadata};
    use crate::backend::InMemoryStore;
    use crate::cache::QueryCache;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_save_then_read_back() {
        let store = InMemoryStore::new();
        let session = SessionSlot::new();
        let profiles = ProfilesResource::new(DataContext::new(
            Arc::new(store.clone()),
            QueryCache::new(&CacheConfig {
                ttl: Duration::from_secs(300),
                capacity: 100,
            }),
            session.clone(),
        ));

        assert!(profiles.current().await.unwrap().is_none());
        assert!(matches!(
            profiles.save(ProfileUpdate::default()).await,
            Err(StorefrontError::Unauthenticated)
        ));

        let user = UserId::random();
        session.set(Session {
            user: AuthUser {
                id: user,
                email: None,
                metadata: UserMetadata::default(),
            },
            access_token: SecretString::from("t"),
            refresh_token: None,
            expires_at: None,
        });
        assert!(profiles.current().await.unwrap().is_none());

        profiles
            .save(ProfileUpdate {
                name: Some("Jeanne Martin".into()),
                company: Some("Dupont SARL".into()),
                phone: Some(" ".into()),
            })
            .await
            .unwrap();

        let profile = profiles.current().await.unwrap().unwrap();
        assert_eq!(profile.id, user);
        assert_eq!(profile.company.as_deref(), Some("Dupont SARL"));
        assert_eq!(profile.phone, None);
        assert!(profile.created_at.is_some());
    }
}
