//! Roles and admin gating.
//!
//! `is_admin` only gates what is shown and which routes redirect; it grants
//! nothing on the backend, where row-level security decides.

use tracing::{info, instrument};

use voltline_core::{AppRole, UserId};

use super::DataContext;
use crate::backend::BackendError;
use crate::cache::{CacheKey, Invalidation, Resource};
use crate::error::StorefrontError;
use crate::models::{NewUserRole, RoleUpdate, UserRole, UserWithRole};

/// Role accessor and admin role writes.
#[derive(Clone)]
pub struct RolesResource {
    ctx: DataContext,
}

impl RolesResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    async fn role_of(&self, user: UserId) -> Result<AppRole, StorefrontError> {
        let store = self.ctx.store();
        let row: Option<UserRole> = self
            .ctx
            .cache()
            .fetch(CacheKey::UserRole(user), store.get_user_role(user))
            .await?;
        Ok(row.map_or_else(AppRole::default, |row| row.role))
    }

    /// Role of the signed-in user. Guests and users without a role row are
    /// [`AppRole::User`].
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn current_role(&self) -> Result<AppRole, StorefrontError> {
        match self.ctx.current_user() {
            Some(user) => self.role_of(user).await,
            None => Ok(AppRole::User),
        }
    }

    /// Whether the signed-in user is an admin.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    pub async fn is_admin(&self) -> Result<bool, StorefrontError> {
        Ok(self.current_role().await? == AppRole::Admin)
    }

    /// The signed-in admin's id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest and
    /// [`StorefrontError::Forbidden`] for a non-admin.
    pub async fn require_admin(&self) -> Result<UserId, StorefrontError> {
        let user = self.ctx.require_user()?;
        if self.role_of(user).await? == AppRole::Admin {
            Ok(user)
        } else {
            Err(StorefrontError::Forbidden("admin role required"))
        }
    }

    /// Every profile with its effective role.
    ///
    /// # Errors
    ///
    /// Returns error if either remote read fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserWithRole>, StorefrontError> {
        let store = self.ctx.store();
        let fetch = async {
            let profiles = store.list_profiles().await?;
            let roles = store.list_user_roles().await?;
            Ok::<_, BackendError>(UserWithRole::join(profiles, &roles))
        };
        Ok(self.ctx.cache().fetch(CacheKey::Users, fetch).await?)
    }

    /// Give `user` a role, updating the row when one exists.
    ///
    /// # Errors
    ///
    /// Returns error if the remote write fails.
    #[instrument(skip(self), fields(user_id = %user, role = %role))]
    pub async fn set_role(&self, user: UserId, role: AppRole) -> Result<UserRole, StorefrontError> {
        let store = self.ctx.store();
        let write = async {
            match store.get_user_role(user).await? {
                Some(_) => store.update_user_role(user, &RoleUpdate { role }).await,
                None => {
                    store
                        .insert_user_role(&NewUserRole {
                            user_id: user,
                            role,
                        })
                        .await
                }
            }
        };
        let invalidations = [
            Invalidation::Key(CacheKey::Users),
            Invalidation::Resource(Resource::UserRole),
        ];
        let row = self.ctx.cache().mutate(&invalidations, write).await?;
        info!("Role updated");
        Ok(row)
    }
}
