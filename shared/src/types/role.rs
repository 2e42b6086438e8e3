//! Account role chosen before sign-up

use serde::{Deserialize, Serialize};

/// Role a user signs up as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Drives vehicles for owners
    Driver,
    /// Owns vehicles or a transport business
    Owner,
}

impl Role {
    /// Value stored in durable storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Owner => "owner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "driver" => Ok(Role::Driver),
            "owner" => Ok(Role::Owner),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_storage_value() {
        for role in [Role::Driver, Role::Owner] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_is_case_sensitive() {
        assert!("Driver".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
