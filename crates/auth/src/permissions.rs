use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// Action identifier gated by role (e.g. `"manage_products"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading verb of the action (`manage`, `view`, `perform`).
    pub fn category(&self) -> &str {
        self.as_str().split('_').next().unwrap_or_default()
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every action the catalog knows about.
pub mod actions {
    use super::Permission;

    pub const MANAGE_USERS: Permission = Permission::from_static("manage_users");
    pub const MANAGE_WAREHOUSES: Permission = Permission::from_static("manage_warehouses");
    pub const MANAGE_PRODUCTS: Permission = Permission::from_static("manage_products");
    pub const MANAGE_RECEIPTS: Permission = Permission::from_static("manage_receipts");
    pub const MANAGE_DELIVERIES: Permission = Permission::from_static("manage_deliveries");
    pub const MANAGE_TRANSFERS: Permission = Permission::from_static("manage_transfers");
    pub const MANAGE_ADJUSTMENTS: Permission = Permission::from_static("manage_adjustments");
    pub const VIEW_REPORTS: Permission = Permission::from_static("view_reports");
    pub const MANAGE_ALERTS: Permission = Permission::from_static("manage_alerts");
    pub const VIEW_PRODUCTS: Permission = Permission::from_static("view_products");
    pub const PERFORM_PICKING: Permission = Permission::from_static("perform_picking");
    pub const PERFORM_PACKING: Permission = Permission::from_static("perform_packing");
    pub const VIEW_TASKS: Permission = Permission::from_static("view_tasks");
}
