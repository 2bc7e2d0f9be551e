//! Caller identity and role-based capabilities

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

use super::borrow::Borrower;

/// Account roles issued by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Librarian => "Librarian",
            Role::Member => "Member",
        }
    }

    /// Single source of truth for who may do what
    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::ReadCatalog => true,
            Capability::ManageCatalog | Capability::ViewAllHistory => {
                matches!(self, Role::Admin | Role::Librarian)
            }
            Capability::Borrow => self == Role::Member,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "member" => Ok(Role::Member),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List and look up books, see own history
    ReadCatalog,
    /// Create, update, delete books
    ManageCatalog,
    /// Borrow and return books
    Borrow,
    /// See every borrower's history
    ViewAllHistory,
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Capability::ReadCatalog => "read the catalog",
            Capability::ManageCatalog => "manage books",
            Capability::Borrow => "borrow or return books",
            Capability::ViewAllHistory => "view all borrow history",
        }
    }
}

/// Authenticated caller as reported by the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub mobile: String,
}

impl Caller {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role {} is not allowed to {}",
                self.role,
                capability.describe()
            )))
        }
    }

    pub fn borrower(&self) -> Borrower {
        Borrower {
            username: self.username.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
        }
    }
}
