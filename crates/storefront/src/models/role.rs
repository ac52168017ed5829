//! User roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::{AppRole, UserId, UserRoleId};

use super::Profile;

/// A `user_roles` row. Absence of a row means [`AppRole::User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: UserRoleId,
    pub user_id: UserId,
    pub role: AppRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for inserting a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewUserRole {
    pub user_id: UserId,
    pub role: AppRole,
}

/// Partial update of a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleUpdate {
    pub role: AppRole,
}

/// A profile with its effective role, for the admin users list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithRole {
    pub profile: Profile,
    pub role: AppRole,
}

impl UserWithRole {
    /// Pair every profile with its role row, defaulting to `user`.
    #[must_use]
    pub fn join(profiles: Vec<Profile>, roles: &[UserRole]) -> Vec<Self> {
        profiles
            .into_iter()
            .map(|profile| {
                let role = roles
                    .iter()
                    .find(|row| row.user_id == profile.id)
                    .map_or_else(AppRole::default, |row| row.role);
                Self { profile, role }
            })
            .collect()
    }
}
