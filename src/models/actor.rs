use serde::{Deserialize, Serialize};
use std::fmt;

/// Role classes that issue lifecycle use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Property owner; resolves approvals, never sets status directly
    Owner,
    /// Service vendor; claims, releases, and progresses assigned work
    Vendor,
    /// Franchise administrator
    Admin,
    /// The platform itself (redistribution, external signals)
    System,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Vendor => write!(f, "vendor"),
            Self::Admin => write!(f, "admin"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            _ => Err(format!("Invalid actor role: {s}")),
        }
    }
}

/// An authenticated actor identity as seen by the engine.
///
/// Authentication itself is out of scope; the transport layer hands the engine
/// an already-resolved role and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub id: i64,
}

impl Actor {
    pub fn owner(id: i64) -> Self {
        Self {
            role: ActorRole::Owner,
            id,
        }
    }

    pub fn vendor(id: i64) -> Self {
        Self {
            role: ActorRole::Vendor,
            id,
        }
    }

    pub fn admin(id: i64) -> Self {
        Self {
            role: ActorRole::Admin,
            id,
        }
    }

    pub fn system() -> Self {
        Self {
            role: ActorRole::System,
            id: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, ActorRole::Admin)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(ActorRole::Vendor.to_string(), "vendor");
        assert_eq!("admin".parse::<ActorRole>().unwrap(), ActorRole::Admin);
        assert!("superuser".parse::<ActorRole>().is_err());
    }

    #[test]
    fn test_actor_constructors() {
        let actor = Actor::vendor(7);
        assert_eq!(actor.role, ActorRole::Vendor);
        assert_eq!(actor.id, 7);
        assert_eq!(Actor::system().id, 0);
        assert!(Actor::admin(1).is_admin());
        assert!(!actor.is_admin());
    }
}
