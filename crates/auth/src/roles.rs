use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockyard_core::DomainError;

/// Role held by a user account. Each user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProductManager,
    Accountant,
    Worker,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::ProductManager, Role::Accountant, Role::Worker];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProductManager => "product_manager",
            Role::Accountant => "accountant",
            Role::Worker => "worker",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "product_manager" => Ok(Role::ProductManager),
            "accountant" => Ok(Role::Accountant),
            "worker" => Ok(Role::Worker),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
