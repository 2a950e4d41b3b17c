use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.write").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");

pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
pub const PRODUCTS_WRITE: Permission = Permission::from_static("products.write");
pub const PRODUCTS_DELETE: Permission = Permission::from_static("products.delete");

pub const SUPPLIERS_READ: Permission = Permission::from_static("suppliers.read");
pub const SUPPLIERS_WRITE: Permission = Permission::from_static("suppliers.write");
pub const SUPPLIERS_DELETE: Permission = Permission::from_static("suppliers.delete");

pub const CUSTOMERS_READ: Permission = Permission::from_static("customers.read");
pub const CUSTOMERS_WRITE: Permission = Permission::from_static("customers.write");
pub const CUSTOMERS_DELETE: Permission = Permission::from_static("customers.delete");

pub const DELIVERIES_READ: Permission = Permission::from_static("deliveries.read");
pub const DELIVERIES_WRITE: Permission = Permission::from_static("deliveries.write");
pub const DELIVERIES_DELETE: Permission = Permission::from_static("deliveries.delete");

pub const ORDERS_READ: Permission = Permission::from_static("orders.read");
pub const ORDERS_WRITE: Permission = Permission::from_static("orders.write");
pub const ORDERS_DELETE: Permission = Permission::from_static("orders.delete");

pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");
pub const DASHBOARD_READ: Permission = Permission::from_static("dashboard.read");
pub const REPORTS_READ: Permission = Permission::from_static("reports.read");

/// Permissions granted to `role`.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![WILDCARD],
        Role::ProductManager => vec![
            PRODUCTS_READ,
            PRODUCTS_WRITE,
            SUPPLIERS_READ,
            SUPPLIERS_WRITE,
            CUSTOMERS_READ,
            CUSTOMERS_WRITE,
            DELIVERIES_READ,
            DELIVERIES_WRITE,
            ORDERS_READ,
            ORDERS_WRITE,
            DASHBOARD_READ,
            REPORTS_READ,
        ],
        Role::Accountant => vec![
            PRODUCTS_READ,
            SUPPLIERS_READ,
            DELIVERIES_READ,
            ORDERS_READ,
            DASHBOARD_READ,
            REPORTS_READ,
        ],
        Role::Worker => vec![
            PRODUCTS_READ,
            SUPPLIERS_READ,
            DELIVERIES_READ,
            ORDERS_READ,
            ORDERS_WRITE,
            DASHBOARD_READ,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants(role: Role, p: &Permission) -> bool {
        permissions_for(role).iter().any(|g| g.is_wildcard() || g == p)
    }

    #[test]
    fn only_admin_deletes() {
        for p in [&PRODUCTS_DELETE, &SUPPLIERS_DELETE, &CUSTOMERS_DELETE, &DELIVERIES_DELETE, &ORDERS_DELETE] {
            assert!(grants(Role::Admin, p));
            assert!(!grants(Role::ProductManager, p));
            assert!(!grants(Role::Accountant, p));
            assert!(!grants(Role::Worker, p));
        }
    }

    #[test]
    fn workers_write_orders_but_not_deliveries() {
        assert!(grants(Role::Worker, &ORDERS_WRITE));
        assert!(!grants(Role::Worker, &DELIVERIES_WRITE));
        assert!(!grants(Role::Worker, &REPORTS_READ));
    }

    #[test]
    fn customers_are_hidden_from_accountants_and_workers() {
        assert!(!grants(Role::Accountant, &CUSTOMERS_READ));
        assert!(!grants(Role::Worker, &CUSTOMERS_READ));
        assert!(grants(Role::ProductManager, &CUSTOMERS_READ));
    }

    #[test]
    fn every_role_sees_the_dashboard() {
        for role in Role::ALL {
            assert!(grants(role, &DASHBOARD_READ));
        }
    }
}
