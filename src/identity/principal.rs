use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The three fixed roles. Behaviour hangs off the permission table, never off
/// the role value itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Management,
    Commercial,
    Support,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Management, Role::Commercial, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Management => "management",
            Role::Commercial => "commercial",
            Role::Support => "support",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "management" => Ok(Role::Management),
            "commercial" => Ok(Role::Commercial),
            "support" => Ok(Role::Support),
            _ => Err(AppError::validation("invalid_role", "Invalid role. Must be one of: commercial, management, support.")),
        }
    }
}

/// Who is acting. Captured once at login; the role is not re-read per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive_and_closed() {
        assert_eq!("Management".parse::<Role>().unwrap(), Role::Management);
        assert_eq!(" support ".parse::<Role>().unwrap(), Role::Support);
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.code_str(), "invalid_role");
    }

    #[test]
    fn role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Commercial).unwrap(), "\"commercial\"");
        for r in Role::ALL { assert_eq!(r.to_string().parse::<Role>().unwrap(), r); }
    }
}
