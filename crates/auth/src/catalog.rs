//! Static role → action catalog.
//!
//! Built once on first use and immutable afterwards. Lookups are total: a role
//! without an entry (including [`Role::Unrecognized`]) resolves to the empty set.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::permissions::{Permission, actions};
use crate::roles::Role;

static CATALOG: LazyLock<PermissionCatalog> = LazyLock::new(PermissionCatalog::builtin);
static NO_PERMISSIONS: LazyLock<HashSet<Permission>> = LazyLock::new(HashSet::new);

/// Mapping from each known role to the actions it may perform.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    entries: HashMap<Role, HashSet<Permission>>,
}

impl PermissionCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static PermissionCatalog {
        &*CATALOG
    }

    fn builtin() -> Self {
        let admin = [
            actions::MANAGE_USERS,
            actions::MANAGE_WAREHOUSES,
            actions::MANAGE_PRODUCTS,
            actions::MANAGE_RECEIPTS,
            actions::MANAGE_DELIVERIES,
            actions::MANAGE_TRANSFERS,
            actions::MANAGE_ADJUSTMENTS,
            actions::VIEW_REPORTS,
            actions::MANAGE_ALERTS,
        ];
        let manager = [
            actions::MANAGE_PRODUCTS,
            actions::MANAGE_RECEIPTS,
            actions::MANAGE_DELIVERIES,
            actions::MANAGE_TRANSFERS,
            actions::MANAGE_ADJUSTMENTS,
            actions::VIEW_REPORTS,
            actions::MANAGE_ALERTS,
        ];
        let staff = [
            actions::VIEW_PRODUCTS,
            actions::PERFORM_PICKING,
            actions::PERFORM_PACKING,
            actions::VIEW_TASKS,
        ];

        let mut entries = HashMap::new();
        entries.insert(Role::Admin, admin.into_iter().collect());
        entries.insert(Role::Manager, manager.into_iter().collect());
        entries.insert(Role::Staff, staff.into_iter().collect());
        // Fallback role: present in the catalog, grants nothing.
        entries.insert(Role::Warehouse, HashSet::new());

        Self { entries }
    }

    pub fn permissions_for(&self, role: &Role) -> &HashSet<Permission> {
        self.entries.get(role).unwrap_or(&*NO_PERMISSIONS)
    }

    pub fn allows(&self, role: &Role, action: &str) -> bool {
        self.permissions_for(role).contains(action)
    }

    /// Known roles whose entry contains `action`, in catalog order.
    pub fn roles_granting(&self, action: &str) -> Vec<Role> {
        Role::KNOWN
            .iter()
            .filter(|role| self.allows(role, action))
            .cloned()
            .collect()
    }

    /// Every action granted to at least one role, sorted.
    pub fn all_permissions(&self) -> Vec<Permission> {
        let mut all: Vec<Permission> = self
            .entries
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        all.sort();
        all
    }
}

/// Actions `role` may perform; empty for roles outside the catalog.
pub fn permissions_for(role: &Role) -> &'static HashSet<Permission> {
    PermissionCatalog::global().permissions_for(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(role: &Role) -> Vec<String> {
        let mut v: Vec<String> = permissions_for(role)
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        v.sort();
        v
    }

    fn sorted(list: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn admin_entry_matches_catalog() {
        assert_eq!(
            names(&Role::Admin),
            sorted(&[
                "manage_users",
                "manage_warehouses",
                "manage_products",
                "manage_receipts",
                "manage_deliveries",
                "manage_transfers",
                "manage_adjustments",
                "view_reports",
                "manage_alerts",
            ])
        );
    }

    #[test]
    fn manager_entry_matches_catalog() {
        assert_eq!(
            names(&Role::Manager),
            sorted(&[
                "manage_products",
                "manage_receipts",
                "manage_deliveries",
                "manage_transfers",
                "manage_adjustments",
                "view_reports",
                "manage_alerts",
            ])
        );
    }

    #[test]
    fn staff_entry_matches_catalog() {
        assert_eq!(
            names(&Role::Staff),
            sorted(&["view_products", "perform_picking", "perform_packing", "view_tasks"])
        );
    }

    #[test]
    fn warehouse_has_an_empty_entry() {
        assert!(permissions_for(&Role::Warehouse).is_empty());
    }

    #[test]
    fn roles_granting_lists_known_roles() {
        let catalog = PermissionCatalog::global();
        assert_eq!(catalog.roles_granting("view_reports"), vec![Role::Admin, Role::Manager]);
        assert_eq!(catalog.roles_granting("view_tasks"), vec![Role::Staff]);
        assert!(catalog.roles_granting("launch_rockets").is_empty());
    }

    #[test]
    fn all_permissions_is_the_union() {
        assert_eq!(PermissionCatalog::global().all_permissions().len(), 13);
    }

    proptest! {
        /// Property: any role name outside the known set grants nothing.
        #[test]
        fn unrecognized_roles_have_no_permissions(name in "[a-z_]{1,16}") {
            let role = Role::parse(&name);
            prop_assume!(!role.is_recognized());
            prop_assert!(permissions_for(&role).is_empty());
        }
    }
}
