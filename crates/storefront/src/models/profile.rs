//! Customer profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::UserId;

/// A `profiles` row, keyed by the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields a customer can edit on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Upsert row for `user`. Blank fields are stored as null.
    #[must_use]
    pub fn into_row(self, user: UserId) -> Profile {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Profile {
            id: user,
            name: clean(self.name),
            company: clean(self.company),
            phone: clean(self.phone),
            created_at: None,
            updated_at: None,
        }
    }
}
