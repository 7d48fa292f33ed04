use std::collections::HashSet;
use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Maintenance,
    SafetyOfficer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Maintenance => "maintenance",
            Role::SafetyOfficer => "safety_officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles held by a single user, as maintained by the admin UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleMembership {
    pub user_id: String,
    pub roles: HashSet<Role>,
}

impl RoleMembership {
    pub fn new(user_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn intersects(&self, audience: &HashSet<Role>) -> bool {
        !self.roles.is_disjoint(audience)
    }
}
