//! Enum types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type discriminator used to route mutation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Property,
    Booking,
    Review,
    User,
}

/// Kind of mutation applied to a System of Record entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

impl MutationKind {
    /// Created and updated both count as a save.
    pub fn is_save(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Property => "Property",
            EntityType::Booking => "Booking",
            EntityType::Review => "Review",
            EntityType::User => "User",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "property" => Ok(EntityType::Property),
            "booking" => Ok(EntityType::Booking),
            "review" => Ok(EntityType::Review),
            "user" => Ok(EntityType::User),
            _ => Err(format!("Invalid EntityType: {}", s)),
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            MutationKind::Created => "Created",
            MutationKind::Updated => "Updated",
            MutationKind::Deleted => "Deleted",
        };
        write!(f, "{}", value)
    }
}
